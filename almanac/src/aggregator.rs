//! Aggregator boundary
//!
//! The contact aggregator lives in the foreign runtime. It merges personas
//! from several backends into individuals and tells us, once, when the
//! merge has settled. Everything it hands back is either a collection the
//! bridge can iterate or an object reference that one of these traits can
//! view.

use crate::error::Result;
use gtype_bridge::{ForeignCollection, ObjectRef, RawHandle, TypeTag};
use std::path::PathBuf;
use tokio::sync::oneshot;

/// Avatar as exposed by an individual
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Avatar {
    /// Image already on disk
    File(PathBuf),
    /// Image loaded into memory
    Bytes(Vec<u8>),
}

/// One-shot notification that the aggregator has reached quiescence.
///
/// Dropping it without calling [`notify`](Self::notify) tells the engine
/// the aggregator went away.
#[derive(Debug)]
pub struct QuiescentSignal(oneshot::Sender<()>);

impl QuiescentSignal {
    pub(crate) fn new(sender: oneshot::Sender<()>) -> Self {
        Self(sender)
    }

    pub fn notify(self) {
        // The engine may have given up waiting; nothing to report then.
        let _ = self.0.send(());
    }
}

/// The foreign contact aggregator
pub trait Aggregator {
    /// Start loading backends. Must not block; `on_quiescent` fires (or is
    /// dropped) later.
    fn prepare(&self, on_quiescent: QuiescentSignal) -> Result<()>;

    /// Map of individual id to individual object
    fn individuals(&self) -> Option<Box<dyn ForeignCollection + '_>>;

    /// View an object from [`individuals`](Self::individuals) as an individual
    fn individual(&self, object: ObjectRef) -> Option<Box<dyn Individual + '_>>;

    /// View an object from [`Individual::phone_numbers`] as field details
    fn field_details(&self, object: ObjectRef) -> Option<Box<dyn FieldDetails + '_>>;
}

/// A merged person
pub trait Individual {
    fn id(&self) -> Option<String>;
    fn display_name(&self) -> Option<String>;
    fn avatar(&self) -> Option<Avatar>;
    /// Set of field-details objects, one per phone number
    fn phone_numbers(&self) -> Option<Box<dyn ForeignCollection + '_>>;
}

/// A field value with its parameters (`type`, etc.)
///
/// # Safety
///
/// [`value`](Self::value) must be valid for [`value_type`](Self::value_type)
/// in the sense of [`gtype_bridge::Marshaler::marshal`] for as long as the
/// details are borrowed.
pub unsafe trait FieldDetails {
    fn value(&self) -> RawHandle;
    fn value_type(&self) -> TypeTag;
    /// Multi-map of parameter name to parameter value
    fn parameters(&self) -> Option<Box<dyn ForeignCollection + '_>>;
}
