//! Object capability table
//!
//! The runtime exports a table of C function pointers through its
//! registration object. One slot of that table wraps a raw object address
//! into a live object reference; this module is the only place that reads
//! the table or calls through it.

use crate::runtime::ForeignRuntime;
use crate::tag::RawHandle;
use crate::value::ObjectRef;
use crate::{Error, Result};
use std::ffi::{c_void, CStr};

/// Name of the object capability table
pub const OBJECT_API: &CStr = c"gobject._object_api";

type Slot = Option<unsafe extern "C" fn() -> *mut c_void>;

/// Layout of the object capability table.
///
/// Only `new_object` is used; the preceding slots fix its offset.
#[repr(C)]
pub struct ObjectFunctions {
    pub register_class: Slot,
    pub register_wrapper: Slot,
    pub lookup_class: Slot,
    pub new_object: Option<unsafe extern "C" fn(*mut c_void) -> *mut c_void>,
}

/// Wrap a raw object address as a live object reference.
///
/// Returns `Ok(None)` for a null address.
///
/// # Safety
///
/// `address` must currently hold a live object whose type derives from the
/// object fundamental, and the runtime's [`OBJECT_API`] table (if present)
/// must have the [`ObjectFunctions`] layout. Violating either is a contract
/// breach by the runtime or the caller that this layer cannot detect.
pub unsafe fn reify_object(
    runtime: &dyn ForeignRuntime,
    address: RawHandle,
) -> Result<Option<ObjectRef>> {
    if address.is_null() {
        return Ok(None);
    }

    let table = runtime
        .capability_table(OBJECT_API)
        .ok_or_else(|| Error::CapabilityMissing(OBJECT_API.to_string_lossy().into_owned()))?;

    let functions = &*(table.as_ptr() as *const ObjectFunctions);
    let new_object = functions
        .new_object
        .ok_or_else(|| Error::CapabilityMissing("new_object".into()))?;

    Ok(ObjectRef::from_raw(new_object(address.as_ptr())))
}
