//! Value marshaler
//!
//! Turns a `(RawHandle, TypeTag)` pair into a [`NativeValue`] using the
//! entry the [`TypeRegistry`] resolves for the tag.

use crate::capsule;
use crate::registry::{Converter, MarshalStrategy, TypeEntry, TypeKind, TypeRegistry};
use crate::runtime::ForeignRuntime;
use crate::tag::{RawHandle, TypeTag};
use crate::value::NativeValue;
use std::ffi::{c_long, c_ulong, CStr};
use std::sync::Arc;
use tracing::warn;

/// Converts raw runtime handles into native values
pub struct Marshaler {
    registry: TypeRegistry,
}

impl Marshaler {
    pub fn new(runtime: Arc<dyn ForeignRuntime>) -> Self {
        Self { registry: TypeRegistry::new(runtime) }
    }

    pub fn with_registry(registry: TypeRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Marshal a handle according to its type.
    ///
    /// Absent and unsupported types produce their sentinel without the
    /// handle ever being read.
    ///
    /// # Safety
    ///
    /// `handle` must be valid for `tag`: an immediate of the right width for
    /// integer-like types, and otherwise either null or the address of a live
    /// value of that type (a NUL-terminated string for string types, a live
    /// object for object types).
    pub unsafe fn marshal(&self, handle: RawHandle, tag: TypeTag) -> NativeValue {
        let entry = self.registry.resolve(tag);

        match entry.strategy {
            MarshalStrategy::Absent => return NativeValue::None,
            MarshalStrategy::Unsupported => return NativeValue::Unsupported(tag),
            _ => {}
        }

        match entry.kind {
            TypeKind::Object => self.reify(handle, &entry),
            TypeKind::TypeIdentifier => NativeValue::Type(tag),
            TypeKind::String => read_string(handle),
            TypeKind::Plain => match entry.strategy {
                MarshalStrategy::IntegerLike => reinterpret(handle, entry.converter),
                _ => dereference(handle, entry.converter),
            },
        }
    }

    /// Marshal with an optional declared type; undeclared handles pass
    /// through as [`NativeValue::Raw`].
    ///
    /// # Safety
    ///
    /// Same contract as [`Marshaler::marshal`] when `tag` is `Some`.
    pub unsafe fn marshal_declared(&self, handle: RawHandle, tag: Option<TypeTag>) -> NativeValue {
        match tag {
            Some(tag) => self.marshal(handle, tag),
            None => NativeValue::Raw(handle),
        }
    }

    unsafe fn reify(&self, handle: RawHandle, entry: &TypeEntry) -> NativeValue {
        match capsule::reify_object(self.registry.runtime().as_ref(), handle) {
            Ok(Some(object)) => NativeValue::Object(object),
            Ok(None) => NativeValue::None,
            Err(e) => {
                warn!("Cannot reify object of {}: {}", entry.tag, e);
                NativeValue::Unsupported(entry.tag)
            }
        }
    }
}

unsafe fn read_string(handle: RawHandle) -> NativeValue {
    if handle.is_null() {
        return NativeValue::None;
    }

    let s = CStr::from_ptr(handle.as_ptr() as *const std::ffi::c_char);
    NativeValue::String(s.to_string_lossy().into_owned())
}

/// The handle word itself, truncated to the converter width
fn reinterpret(handle: RawHandle, converter: Converter) -> NativeValue {
    let word = handle.word();

    match converter {
        Converter::Bool => NativeValue::Bool(word as u8 != 0),
        Converter::Char => NativeValue::Int(word as i8 as i64),
        Converter::UChar => NativeValue::UInt(word as u8 as u64),
        Converter::Int32 => NativeValue::Int(word as i32 as i64),
        Converter::UInt32 => NativeValue::UInt(word as u32 as u64),
        Converter::Long => NativeValue::Int(word as c_long as i64),
        Converter::ULong => NativeValue::UInt(word as c_ulong as u64),
        Converter::Int64 => NativeValue::Int(word as u64 as i64),
        Converter::UInt64 => NativeValue::UInt(word as u64),
        Converter::Float32 => NativeValue::Float(f32::from_bits(word as u32) as f64),
        Converter::Float64 => NativeValue::Float(f64::from_bits(word as u64)),
        Converter::CString | Converter::Pointer => NativeValue::Raw(handle),
        Converter::None => NativeValue::None,
    }
}

/// Read exactly the converter width at the handle's address
unsafe fn dereference(handle: RawHandle, converter: Converter) -> NativeValue {
    if handle.is_null() {
        return NativeValue::None;
    }

    let ptr = handle.as_ptr();

    match converter {
        Converter::Bool => NativeValue::Bool(read::<u8>(ptr) != 0),
        Converter::Char => NativeValue::Int(read::<i8>(ptr) as i64),
        Converter::UChar => NativeValue::UInt(read::<u8>(ptr) as u64),
        Converter::Int32 => NativeValue::Int(read::<i32>(ptr) as i64),
        Converter::UInt32 => NativeValue::UInt(read::<u32>(ptr) as u64),
        Converter::Long => NativeValue::Int(read::<c_long>(ptr) as i64),
        Converter::ULong => NativeValue::UInt(read::<c_ulong>(ptr) as u64),
        Converter::Int64 => NativeValue::Int(read::<i64>(ptr)),
        Converter::UInt64 => NativeValue::UInt(read::<u64>(ptr)),
        Converter::Float32 => NativeValue::Float(read::<f32>(ptr) as f64),
        Converter::Float64 => NativeValue::Float(read::<f64>(ptr)),
        Converter::CString => read_string(RawHandle::new(read::<usize>(ptr))),
        Converter::Pointer => NativeValue::Raw(RawHandle::new(read::<usize>(ptr))),
        Converter::None => NativeValue::None,
    }
}

unsafe fn read<T: Copy>(ptr: *mut std::ffi::c_void) -> T {
    std::ptr::read_unaligned(ptr as *const T)
}
