//! Native values produced by the marshaler

use crate::tag::{RawHandle, TypeTag};
use crate::{Error, Result};
use std::ffi::c_void;
use std::ptr::NonNull;

/// Live reference to a runtime object.
///
/// Shares the object's reference count with the runtime; dropping an
/// `ObjectRef` does not release anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef(NonNull<c_void>);

impl ObjectRef {
    pub fn from_raw(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }

    pub fn address(self) -> usize {
        self.0.as_ptr() as usize
    }
}

/// Marshaled value
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Object(ObjectRef),
    /// The declared type itself, for type-identifier values
    Type(TypeTag),
    /// Handle passed through without interpretation
    Raw(RawHandle),
    None,
    /// The type is deliberately not decoded by this layer
    Unsupported(TypeTag),
}

impl NativeValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            NativeValue::Bool(_) => "bool",
            NativeValue::Int(_) => "int",
            NativeValue::UInt(_) => "uint",
            NativeValue::Float(_) => "float",
            NativeValue::String(_) => "string",
            NativeValue::Object(_) => "object",
            NativeValue::Type(_) => "type",
            NativeValue::Raw(_) => "raw",
            NativeValue::None => "none",
            NativeValue::Unsupported(_) => "unsupported",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, NativeValue::None)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NativeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<ObjectRef> {
        match self {
            NativeValue::Object(obj) => Some(*obj),
            _ => None,
        }
    }

    /// Take the string out, or explain what was found instead
    pub fn into_string(self) -> Result<String> {
        match self {
            NativeValue::String(s) => Ok(s),
            NativeValue::Unsupported(tag) => Err(Error::UnsupportedType(tag)),
            other => Err(Error::UnexpectedValue {
                expected: "string",
                found: other.kind_name(),
            }),
        }
    }

    pub fn into_object(self) -> Result<ObjectRef> {
        match self {
            NativeValue::Object(obj) => Ok(obj),
            NativeValue::Unsupported(tag) => Err(Error::UnsupportedType(tag)),
            other => Err(Error::UnexpectedValue {
                expected: "object",
                found: other.kind_name(),
            }),
        }
    }
}
