//! Foreign runtime boundary
//!
//! The handful of type-system calls the bridge needs from the runtime. The
//! runtime owns the type hierarchy; the bridge only asks questions about it.

use crate::tag::TypeTag;
use std::ffi::{c_void, CStr};
use std::ptr::NonNull;

/// Type-system queries served by the foreign runtime
pub trait ForeignRuntime {
    /// Human-readable name of a type, if the runtime knows it.
    ///
    /// May legitimately fail for transient types.
    fn type_name(&self, tag: TypeTag) -> Option<String>;

    /// Look up a registered type by name
    fn type_from_name(&self, name: &str) -> Option<TypeTag>;

    /// Parent of a type in the runtime's single-inheritance hierarchy
    fn type_parent(&self, tag: TypeTag) -> Option<TypeTag>;

    /// Address of a named capability table exported by the runtime's
    /// registration object.
    ///
    /// The layout of the table is fixed per name; see [`crate::capsule`].
    fn capability_table(&self, name: &CStr) -> Option<NonNull<c_void>>;

    /// Type of the runtime's wrapper for arbitrary host values, if any
    fn any_value_type(&self) -> Option<TypeTag> {
        None
    }
}
