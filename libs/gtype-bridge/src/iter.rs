//! Generic iterator adapter
//!
//! Runtime collections come in two shapes: sequential collections that hand
//! out an element cursor, and keyed collections that hand out a map cursor
//! with separate key/value reads. Both drive the same triad: `has_next`,
//! `next`, then read. [`adapt`] picks the protocol once and exposes either
//! as a plain Rust [`Iterator`].

use crate::marshal::Marshaler;
use crate::tag::{RawHandle, TypeTag};
use crate::value::NativeValue;
use std::iter::FusedIterator;
use tracing::trace;

/// Cursor over a sequential collection
pub trait Cursor {
    fn has_next(&mut self) -> bool;
    /// Advance; `false` when there was nothing to advance to
    fn next(&mut self) -> bool;
    fn get(&self) -> RawHandle;
}

/// Cursor over a keyed collection
pub trait MapCursor {
    fn has_next(&mut self) -> bool;
    fn next(&mut self) -> bool;
    fn get_key(&self) -> RawHandle;
    fn get_value(&self) -> RawHandle;
}

/// A runtime collection, queried for its iteration capabilities.
///
/// Every capability is optional; a collection exposing neither cursor is
/// simply not iterable here.
///
/// # Safety
///
/// Handles read from the cursors must be valid for the declared element,
/// key and value types (see [`Marshaler::marshal`]) for as long as the
/// collection is borrowed.
pub unsafe trait ForeignCollection {
    fn map_iterator(&self) -> Option<Box<dyn MapCursor + '_>> {
        None
    }

    fn iterator(&self) -> Option<Box<dyn Cursor + '_>> {
        None
    }

    fn size(&self) -> Option<usize> {
        None
    }

    fn element_type(&self) -> Option<TypeTag> {
        None
    }

    fn key_type(&self) -> Option<TypeTag> {
        None
    }

    fn value_type(&self) -> Option<TypeTag> {
        None
    }
}

/// One produced element
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Item { index: usize, value: NativeValue },
    Entry { key: NativeValue, value: NativeValue },
}

impl Element {
    pub fn value(&self) -> &NativeValue {
        match self {
            Element::Item { value, .. } | Element::Entry { value, .. } => value,
        }
    }

    pub fn into_value(self) -> NativeValue {
        match self {
            Element::Item { value, .. } | Element::Entry { value, .. } => value,
        }
    }

    pub fn key(&self) -> Option<&NativeValue> {
        match self {
            Element::Entry { key, .. } => Some(key),
            Element::Item { .. } => None,
        }
    }
}

enum Protocol<'a> {
    Sequential {
        cursor: Box<dyn Cursor + 'a>,
        element_type: Option<TypeTag>,
        index: usize,
    },
    Keyed {
        cursor: Box<dyn MapCursor + 'a>,
        key_type: Option<TypeTag>,
        value_type: Option<TypeTag>,
    },
    Exhausted,
}

/// Single-pass iterator over a runtime collection.
///
/// The underlying cursor is stateful; iterate again by adapting the
/// collection again.
pub struct ForeignIter<'a> {
    marshaler: &'a Marshaler,
    protocol: Protocol<'a>,
    remaining: Option<usize>,
}

/// Adapt a runtime collection into an iterator of marshaled elements
pub fn adapt<'a>(
    marshaler: &'a Marshaler,
    collection: &'a dyn ForeignCollection,
) -> ForeignIter<'a> {
    let protocol = if let Some(cursor) = collection.map_iterator() {
        Protocol::Keyed {
            cursor,
            key_type: collection.key_type(),
            value_type: collection.value_type(),
        }
    } else if let Some(cursor) = collection.iterator() {
        Protocol::Sequential {
            cursor,
            element_type: collection.element_type(),
            index: 0,
        }
    } else {
        trace!("Collection exposes no iterator capability");
        Protocol::Exhausted
    };

    ForeignIter {
        marshaler,
        protocol,
        remaining: collection.size(),
    }
}

impl ForeignIter<'_> {
    pub fn is_keyed(&self) -> bool {
        matches!(self.protocol, Protocol::Keyed { .. })
    }
}

impl Iterator for ForeignIter<'_> {
    type Item = Element;

    fn next(&mut self) -> Option<Element> {
        if self.remaining == Some(0) {
            self.protocol = Protocol::Exhausted;
        }

        let element = match &mut self.protocol {
            Protocol::Exhausted => return None,
            Protocol::Sequential { cursor, element_type, index } => {
                if cursor.has_next() && cursor.next() {
                    let handle = cursor.get();
                    // SAFETY: ForeignCollection guarantees handles match the declared type.
                    let value = unsafe { self.marshaler.marshal_declared(handle, *element_type) };
                    let element = Element::Item { index: *index, value };
                    *index += 1;
                    Some(element)
                } else {
                    None
                }
            }
            Protocol::Keyed { cursor, key_type, value_type } => {
                if cursor.has_next() && cursor.next() {
                    let (key, value) = (cursor.get_key(), cursor.get_value());
                    // SAFETY: as above, for key and value types.
                    let (key, value) = unsafe {
                        (
                            self.marshaler.marshal_declared(key, *key_type),
                            self.marshaler.marshal_declared(value, *value_type),
                        )
                    };
                    Some(Element::Entry { key, value })
                } else {
                    None
                }
            }
        };

        match element {
            Some(element) => {
                if let Some(remaining) = self.remaining.as_mut() {
                    *remaining -= 1;
                }
                Some(element)
            }
            None => {
                self.protocol = Protocol::Exhausted;
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.protocol {
            Protocol::Exhausted => (0, Some(0)),
            _ => (0, self.remaining),
        }
    }
}

impl FusedIterator for ForeignIter<'_> {}
