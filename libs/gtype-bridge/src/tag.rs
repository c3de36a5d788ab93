//! Runtime type identifiers and raw handles

use std::ffi::c_void;
use std::fmt;

/// Opaque identifier for a runtime type.
///
/// Produced by the runtime and never interpreted beyond equality and
/// hashing, except for the fundamental identifiers in [`fundamental`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeTag(usize);

impl TypeTag {
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> usize {
        self.0
    }

    /// Whether this tag is one of the runtime's fundamental types
    pub fn is_fundamental(self) -> bool {
        self.0 <= fundamental::MAX.0
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type#{:#x}", self.0)
    }
}

/// Fundamental type identifiers.
///
/// Fundamentals are numbered `n << 2`; everything above `MAX` is a
/// dynamically registered type whose identity is only known at runtime.
pub mod fundamental {
    use super::TypeTag;

    const fn f(n: usize) -> TypeTag {
        TypeTag::new(n << 2)
    }

    pub const INVALID: TypeTag = f(0);
    pub const NONE: TypeTag = f(1);
    pub const INTERFACE: TypeTag = f(2);
    pub const CHAR: TypeTag = f(3);
    pub const UCHAR: TypeTag = f(4);
    pub const BOOLEAN: TypeTag = f(5);
    pub const INT: TypeTag = f(6);
    pub const UINT: TypeTag = f(7);
    pub const LONG: TypeTag = f(8);
    pub const ULONG: TypeTag = f(9);
    pub const INT64: TypeTag = f(10);
    pub const UINT64: TypeTag = f(11);
    pub const ENUM: TypeTag = f(12);
    pub const FLAGS: TypeTag = f(13);
    pub const FLOAT: TypeTag = f(14);
    pub const DOUBLE: TypeTag = f(15);
    pub const STRING: TypeTag = f(16);
    pub const POINTER: TypeTag = f(17);
    pub const BOXED: TypeTag = f(18);
    pub const PARAM: TypeTag = f(19);
    pub const OBJECT: TypeTag = f(20);
    pub const VARIANT: TypeTag = f(21);

    /// Highest reserved fundamental identifier
    pub const MAX: TypeTag = f(255);
}

/// Untyped machine word handed out by the runtime.
///
/// Either an immediate value (integers, booleans) or an address, depending
/// on the [`TypeTag`] it travels with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(usize);

impl RawHandle {
    pub const NULL: RawHandle = RawHandle(0);

    pub const fn new(word: usize) -> Self {
        Self(word)
    }

    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr as usize)
    }

    pub const fn word(self) -> usize {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0 as *mut c_void
    }
}
