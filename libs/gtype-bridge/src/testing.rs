//! In-memory runtime and collection fakes
//!
//! Enough of a runtime to exercise the registry, marshaler and adapter
//! without a real object system: a small named type hierarchy, an object
//! table whose `new_object` slot returns the address it is given, and
//! vector-backed collections.

use crate::capsule::{ObjectFunctions, OBJECT_API};
use crate::iter::{Cursor, ForeignCollection, MapCursor};
use crate::runtime::ForeignRuntime;
use crate::tag::{RawHandle, TypeTag};
use std::collections::HashMap;
use std::ffi::{c_void, CStr, CString};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

const FIRST_DYNAMIC_TAG: usize = 0x10_0000;

unsafe extern "C" fn identity_object(address: *mut c_void) -> *mut c_void {
    address
}

/// Runtime fake with a registrable type hierarchy
pub struct FakeRuntime {
    names: HashMap<TypeTag, String>,
    by_name: HashMap<String, TypeTag>,
    parents: HashMap<TypeTag, TypeTag>,
    next_tag: usize,
    any_value: Option<TypeTag>,
    object_api: Option<Box<ObjectFunctions>>,
    name_lookups: AtomicUsize,
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self {
            names: HashMap::new(),
            by_name: HashMap::new(),
            parents: HashMap::new(),
            next_tag: FIRST_DYNAMIC_TAG,
            any_value: None,
            object_api: Some(Box::new(ObjectFunctions {
                register_class: None,
                register_wrapper: None,
                lookup_class: None,
                new_object: Some(identity_object),
            })),
            name_lookups: AtomicUsize::new(0),
        }
    }

    /// Drop the object capability table
    pub fn without_object_api(mut self) -> Self {
        self.object_api = None;
        self
    }

    /// Register a named type and return its fresh tag
    pub fn register(&mut self, name: &str, parent: Option<TypeTag>) -> TypeTag {
        let tag = TypeTag::new(self.next_tag);
        self.next_tag += 4;

        self.names.insert(tag, name.to_string());
        self.by_name.insert(name.to_string(), tag);
        if let Some(parent) = parent {
            self.parents.insert(tag, parent);
        }
        tag
    }

    pub fn set_parent(&mut self, tag: TypeTag, parent: TypeTag) {
        self.parents.insert(tag, parent);
    }

    pub fn set_any_value_type(&mut self, tag: TypeTag) {
        self.any_value = Some(tag);
    }

    /// Number of `type_name` calls served so far
    pub fn name_lookups(&self) -> usize {
        self.name_lookups.load(Ordering::Relaxed)
    }
}

impl ForeignRuntime for FakeRuntime {
    fn type_name(&self, tag: TypeTag) -> Option<String> {
        self.name_lookups.fetch_add(1, Ordering::Relaxed);
        self.names.get(&tag).cloned()
    }

    fn type_from_name(&self, name: &str) -> Option<TypeTag> {
        self.by_name.get(name).copied()
    }

    fn type_parent(&self, tag: TypeTag) -> Option<TypeTag> {
        self.parents.get(&tag).copied()
    }

    fn capability_table(&self, name: &CStr) -> Option<NonNull<c_void>> {
        if name != OBJECT_API {
            return None;
        }
        self.object_api
            .as_deref()
            .map(|table| NonNull::from(table).cast::<c_void>())
    }

    fn any_value_type(&self) -> Option<TypeTag> {
        self.any_value
    }
}

/// Keeps C strings alive and hands out their addresses as handle words
#[derive(Default)]
pub struct StringPool {
    strings: Vec<CString>,
}

impl StringPool {
    pub fn handle(&mut self, s: &str) -> usize {
        let owned = CString::new(s).expect("test strings contain no NUL");
        let word = owned.as_ptr() as usize;
        self.strings.push(owned);
        word
    }
}

enum Shape {
    Sequential(Vec<usize>),
    Keyed(Vec<(usize, usize)>),
    Opaque,
}

/// Vector-backed collection
pub struct FakeCollection {
    shape: Shape,
    sequential_view: bool,
    size: Option<usize>,
    element_type: Option<TypeTag>,
    key_type: Option<TypeTag>,
    value_type: Option<TypeTag>,
}

impl FakeCollection {
    fn with_shape(shape: Shape) -> Self {
        Self {
            shape,
            sequential_view: false,
            size: None,
            element_type: None,
            key_type: None,
            value_type: None,
        }
    }

    pub fn sequential(items: Vec<usize>) -> Self {
        Self::with_shape(Shape::Sequential(items))
    }

    pub fn keyed(pairs: Vec<(usize, usize)>) -> Self {
        Self::with_shape(Shape::Keyed(pairs))
    }

    /// Collection exposing neither cursor
    pub fn opaque() -> Self {
        Self::with_shape(Shape::Opaque)
    }

    /// Also expose a sequential cursor over the keys of a keyed collection
    pub fn with_sequential_view(mut self) -> Self {
        self.sequential_view = true;
        self
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_element_type(mut self, tag: TypeTag) -> Self {
        self.element_type = Some(tag);
        self
    }

    pub fn with_key_type(mut self, tag: TypeTag) -> Self {
        self.key_type = Some(tag);
        self
    }

    pub fn with_value_type(mut self, tag: TypeTag) -> Self {
        self.value_type = Some(tag);
        self
    }
}

// SAFETY: tests pair each handle with a type it is valid for.
unsafe impl ForeignCollection for FakeCollection {
    fn map_iterator(&self) -> Option<Box<dyn MapCursor + '_>> {
        match &self.shape {
            Shape::Keyed(pairs) => Some(Box::new(PairCursor { pairs, pos: None })),
            _ => None,
        }
    }

    fn iterator(&self) -> Option<Box<dyn Cursor + '_>> {
        match &self.shape {
            Shape::Sequential(items) => Some(Box::new(ItemCursor {
                items: items.clone(),
                pos: None,
            })),
            Shape::Keyed(pairs) if self.sequential_view => Some(Box::new(ItemCursor {
                items: pairs.iter().map(|(k, _)| *k).collect(),
                pos: None,
            })),
            _ => None,
        }
    }

    fn size(&self) -> Option<usize> {
        self.size.or(match &self.shape {
            Shape::Sequential(items) => Some(items.len()),
            Shape::Keyed(pairs) => Some(pairs.len()),
            Shape::Opaque => None,
        })
    }

    fn element_type(&self) -> Option<TypeTag> {
        self.element_type
    }

    fn key_type(&self) -> Option<TypeTag> {
        self.key_type
    }

    fn value_type(&self) -> Option<TypeTag> {
        self.value_type
    }
}

struct ItemCursor {
    items: Vec<usize>,
    pos: Option<usize>,
}

impl ItemCursor {
    fn upcoming(&self) -> usize {
        self.pos.map_or(0, |p| p + 1)
    }
}

impl Cursor for ItemCursor {
    fn has_next(&mut self) -> bool {
        self.upcoming() < self.items.len()
    }

    fn next(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.pos = Some(self.upcoming());
        true
    }

    fn get(&self) -> RawHandle {
        RawHandle::new(self.pos.map_or(0, |p| self.items[p]))
    }
}

struct PairCursor<'a> {
    pairs: &'a [(usize, usize)],
    pos: Option<usize>,
}

impl PairCursor<'_> {
    fn upcoming(&self) -> usize {
        self.pos.map_or(0, |p| p + 1)
    }
}

impl MapCursor for PairCursor<'_> {
    fn has_next(&mut self) -> bool {
        self.upcoming() < self.pairs.len()
    }

    fn next(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.pos = Some(self.upcoming());
        true
    }

    fn get_key(&self) -> RawHandle {
        RawHandle::new(self.pos.map_or(0, |p| self.pairs[p].0))
    }

    fn get_value(&self) -> RawHandle {
        RawHandle::new(self.pos.map_or(0, |p| self.pairs[p].1))
    }
}
