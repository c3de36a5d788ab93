//! # gtype-bridge
//!
//! Marshaling layer between a GObject-style runtime and native Rust values.
//!
//! The runtime hands out opaque machine words ([`RawHandle`]) whose meaning
//! depends on a runtime type identifier ([`TypeTag`]). This crate resolves
//! those identifiers to a marshaling strategy, reifies handles into
//! [`NativeValue`]s, and walks the runtime's two collection protocols
//! (sequential and keyed) as one lazy iterator.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  ForeignIter (iter.rs)                              │
//! │  map-iterator / iterator probing, cursor triad      │
//! └──────────────────────┬──────────────────────────────┘
//!                        │ (handle, tag)
//! ┌──────────────────────┴──────────────────────────────┐
//! │  Marshaler (marshal.rs)  ──►  capsule.rs (unsafe)   │
//! └──────────────────────┬──────────────────────────────┘
//!                        │ resolve(tag)
//! ┌──────────────────────┴──────────────────────────────┐
//! │  TypeRegistry (registry.rs)  ──►  ForeignRuntime    │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gtype_bridge::{adapt, Marshaler};
//!
//! let marshaler = Marshaler::new(runtime);
//! for element in adapt(&marshaler, &collection) {
//!     println!("{:?}", element.value());
//! }
//! ```

pub mod capsule;
pub mod iter;
pub mod marshal;
pub mod registry;
pub mod runtime;
pub mod tag;
pub mod value;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use iter::{adapt, Cursor, Element, ForeignCollection, ForeignIter, MapCursor};
pub use marshal::Marshaler;
pub use registry::{Converter, MarshalStrategy, TypeEntry, TypeKind, TypeRegistry};
pub use runtime::ForeignRuntime;
pub use tag::{fundamental, RawHandle, TypeTag};
pub use value::{NativeValue, ObjectRef};

/// Bridge errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Capability missing: {0}")]
    CapabilityMissing(String),
    #[error("Unsupported type: {0}")]
    UnsupportedType(TypeTag),
    #[error("Unexpected value: expected {expected}, got {found}")]
    UnexpectedValue {
        expected: &'static str,
        found: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
