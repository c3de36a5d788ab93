//! Type registry
//!
//! Maps a [`TypeTag`] to the strategy used to turn a raw handle of that
//! type into a native value. Fundamental types are seeded up front; any
//! other type is resolved once through its parent chain and memoized under
//! its own tag. Entries are never replaced.

use crate::runtime::ForeignRuntime;
use crate::tag::{fundamental as ft, TypeTag};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Upper bound on parent-chain walks
pub const MAX_TYPE_DEPTH: usize = 64;

/// Name under which the runtime registers its type-identifier type
pub const TYPE_IDENTIFIER_NAME: &str = "GType";

/// Name under which the runtime registers NUL-terminated string vectors
pub const STRING_VECTOR_NAME: &str = "GStrv";

/// How a raw handle of a given type is reified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarshalStrategy {
    /// The handle word is the value
    IntegerLike,
    /// The handle word is the address of the value
    AddressLike,
    /// Marshals to no value
    Absent,
    /// Deliberately not decoded
    Unsupported,
}

/// Native representation a handle is read as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Converter {
    Bool,
    Char,
    UChar,
    Int32,
    UInt32,
    Long,
    ULong,
    Int64,
    UInt64,
    Float32,
    Float64,
    CString,
    Pointer,
    None,
}

impl Converter {
    /// Bytes read when the handle is an address
    pub fn width(self) -> usize {
        use std::ffi::{c_long, c_ulong};
        use std::mem::size_of;

        match self {
            Converter::Bool | Converter::Char | Converter::UChar => 1,
            Converter::Int32 | Converter::UInt32 => 4,
            Converter::Long => size_of::<c_long>(),
            Converter::ULong => size_of::<c_ulong>(),
            Converter::Int64 | Converter::UInt64 => 8,
            Converter::Float32 => 4,
            Converter::Float64 => 8,
            Converter::CString | Converter::Pointer => size_of::<usize>(),
            Converter::None => 0,
        }
    }
}

/// Value category, inherited along the parent chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Object,
    TypeIdentifier,
    String,
    Plain,
}

/// Resolved registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeEntry {
    pub tag: TypeTag,
    pub converter: Converter,
    pub strategy: MarshalStrategy,
    pub kind: TypeKind,
}

impl TypeEntry {
    const fn builtin(
        tag: TypeTag,
        converter: Converter,
        strategy: MarshalStrategy,
        kind: TypeKind,
    ) -> Self {
        Self { tag, converter, strategy, kind }
    }

    /// Entry for tags that cannot be resolved at all
    pub fn unsupported(tag: TypeTag) -> Self {
        Self {
            tag,
            converter: Converter::None,
            strategy: MarshalStrategy::Unsupported,
            kind: TypeKind::Plain,
        }
    }

    /// Entry for a registered type derived from `parent`.
    ///
    /// Derived values are always carried as generic pointers or objects.
    fn derived(tag: TypeTag, parent: &TypeEntry) -> Self {
        Self {
            tag,
            converter: Converter::Pointer,
            strategy: parent.strategy,
            kind: parent.kind,
        }
    }
}

use Converter as C;
use MarshalStrategy::{AddressLike, Absent, IntegerLike, Unsupported};
use TypeKind::{Object, Plain, String as Str};

const BUILTINS: &[TypeEntry] = &[
    TypeEntry::builtin(ft::BOOLEAN, C::Bool, IntegerLike, Plain),
    TypeEntry::builtin(ft::CHAR, C::Char, IntegerLike, Plain),
    TypeEntry::builtin(ft::UCHAR, C::UChar, IntegerLike, Plain),
    TypeEntry::builtin(ft::INT, C::Int32, IntegerLike, Plain),
    TypeEntry::builtin(ft::UINT, C::UInt32, IntegerLike, Plain),
    TypeEntry::builtin(ft::FLAGS, C::UInt32, IntegerLike, Plain),
    TypeEntry::builtin(ft::LONG, C::Long, AddressLike, Plain),
    TypeEntry::builtin(ft::ULONG, C::ULong, AddressLike, Plain),
    TypeEntry::builtin(ft::INT64, C::Int64, AddressLike, Plain),
    TypeEntry::builtin(ft::UINT64, C::UInt64, AddressLike, Plain),
    TypeEntry::builtin(ft::ENUM, C::UInt64, AddressLike, Plain),
    TypeEntry::builtin(ft::FLOAT, C::Float32, AddressLike, Plain),
    TypeEntry::builtin(ft::DOUBLE, C::Float64, AddressLike, Plain),
    TypeEntry::builtin(ft::STRING, C::CString, AddressLike, Str),
    TypeEntry::builtin(ft::POINTER, C::Pointer, AddressLike, Plain),
    TypeEntry::builtin(ft::OBJECT, C::Pointer, AddressLike, Object),
    TypeEntry::builtin(ft::NONE, C::None, Absent, Plain),
    TypeEntry::builtin(ft::INVALID, C::None, Absent, Plain),
    TypeEntry::builtin(ft::PARAM, C::None, Unsupported, Plain),
    TypeEntry::builtin(ft::VARIANT, C::None, Unsupported, Plain),
    TypeEntry::builtin(ft::BOXED, C::None, Unsupported, Plain),
    TypeEntry::builtin(ft::INTERFACE, C::None, Unsupported, Plain),
];

/// Append-only memoization table of type entries
pub struct TypeRegistry {
    runtime: Arc<dyn ForeignRuntime>,
    entries: DashMap<TypeTag, TypeEntry>,
}

impl TypeRegistry {
    /// Create a registry seeded with the built-in table.
    ///
    /// Built-ins that only exist as registered names (the type-identifier
    /// type, string vectors, the any-value wrapper) are looked up once here.
    pub fn new(runtime: Arc<dyn ForeignRuntime>) -> Self {
        let entries = DashMap::new();

        for entry in BUILTINS {
            entries.insert(entry.tag, *entry);
        }

        if let Some(tag) = runtime.type_from_name(TYPE_IDENTIFIER_NAME) {
            entries.insert(
                tag,
                TypeEntry::builtin(tag, C::Pointer, IntegerLike, TypeKind::TypeIdentifier),
            );
        }

        if let Some(tag) = runtime.type_from_name(STRING_VECTOR_NAME) {
            entries.insert(tag, TypeEntry::builtin(tag, C::None, Unsupported, Plain));
        }

        if let Some(tag) = runtime.any_value_type() {
            entries.insert(tag, TypeEntry::builtin(tag, C::Pointer, AddressLike, Plain));
        }

        debug!("Type registry seeded with {} entries", entries.len());

        Self { runtime, entries }
    }

    pub fn runtime(&self) -> &Arc<dyn ForeignRuntime> {
        &self.runtime
    }

    /// Resolve a tag to its entry. Never fails; worst case is unsupported.
    pub fn resolve(&self, tag: TypeTag) -> TypeEntry {
        self.resolve_at(tag, 0)
    }

    /// Shorthand for the `(strategy, converter)` pair
    pub fn strategy_of(&self, tag: TypeTag) -> (MarshalStrategy, Converter) {
        let entry = self.resolve(tag);
        (entry.strategy, entry.converter)
    }

    /// Whether a tag has been resolved (or seeded) already
    pub fn is_cached(&self, tag: TypeTag) -> bool {
        self.entries.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn resolve_at(&self, tag: TypeTag, depth: usize) -> TypeEntry {
        if let Some(entry) = self.entries.get(&tag) {
            return *entry;
        }

        // Transient types may have no name yet; don't memoize those.
        let Some(name) = self.runtime.type_name(tag) else {
            trace!("No name for {}, treating as unsupported", tag);
            return TypeEntry::unsupported(tag);
        };

        let registered = self.runtime.type_from_name(&name).unwrap_or(tag);

        let entry = match self.runtime.type_parent(registered) {
            Some(parent) if parent != tag && depth < MAX_TYPE_DEPTH => {
                let parent_entry = self.resolve_at(parent, depth + 1);
                TypeEntry::derived(tag, &parent_entry)
            }
            _ => TypeEntry::unsupported(tag),
        };

        debug!(
            "Resolved {} ({}) as {:?}/{:?}",
            name, tag, entry.strategy, entry.kind
        );

        // First writer wins so a resolved entry never changes.
        *self.entries.entry(tag).or_insert(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRuntime;

    fn registry_with(runtime: FakeRuntime) -> (Arc<FakeRuntime>, TypeRegistry) {
        let runtime = Arc::new(runtime);
        let registry = TypeRegistry::new(runtime.clone());
        (runtime, registry)
    }

    #[test]
    fn test_builtin_strategies() {
        let (_, registry) = registry_with(FakeRuntime::new());

        for tag in [ft::BOOLEAN, ft::CHAR, ft::UCHAR, ft::INT, ft::UINT, ft::FLAGS] {
            assert_eq!(registry.resolve(tag).strategy, MarshalStrategy::IntegerLike);
        }
        for tag in [
            ft::LONG, ft::ULONG, ft::INT64, ft::UINT64, ft::ENUM,
            ft::FLOAT, ft::DOUBLE, ft::STRING, ft::POINTER, ft::OBJECT,
        ] {
            assert_eq!(registry.resolve(tag).strategy, MarshalStrategy::AddressLike);
        }
        for tag in [ft::NONE, ft::INVALID] {
            assert_eq!(registry.resolve(tag).strategy, MarshalStrategy::Absent);
        }
        for tag in [ft::PARAM, ft::VARIANT, ft::BOXED, ft::INTERFACE] {
            assert_eq!(registry.resolve(tag).strategy, MarshalStrategy::Unsupported);
        }

        assert_eq!(registry.resolve(ft::STRING).kind, TypeKind::String);
        assert_eq!(registry.resolve(ft::OBJECT).kind, TypeKind::Object);
    }

    #[test]
    fn test_named_builtins_seeded() {
        let mut runtime = FakeRuntime::new();
        let gtype = runtime.register(TYPE_IDENTIFIER_NAME, None);
        let strv = runtime.register(STRING_VECTOR_NAME, Some(ft::BOXED));
        let any = runtime.register("AnyValue", Some(ft::BOXED));
        runtime.set_any_value_type(any);
        let (_, registry) = registry_with(runtime);

        assert_eq!(registry.resolve(gtype).kind, TypeKind::TypeIdentifier);
        assert_eq!(registry.resolve(strv).strategy, MarshalStrategy::Unsupported);
        assert_eq!(registry.resolve(any).strategy, MarshalStrategy::AddressLike);
    }

    #[test]
    fn test_derived_type_inherits_parent() {
        let mut runtime = FakeRuntime::new();
        let persona = runtime.register("FolksPersona", Some(ft::OBJECT));
        let individual = runtime.register("FolksIndividual", Some(persona));
        let (_, registry) = registry_with(runtime);

        let entry = registry.resolve(individual);
        assert_eq!(entry.tag, individual);
        assert_eq!(entry.strategy, MarshalStrategy::AddressLike);
        assert_eq!(entry.converter, Converter::Pointer);
        assert_eq!(entry.kind, TypeKind::Object);
        assert!(registry.is_cached(persona));
    }

    #[test]
    fn test_strategy_and_converter_pair() {
        let mut runtime = FakeRuntime::new();
        let detail = runtime.register("FolksPhoneFieldDetails", Some(ft::OBJECT));
        let (_, registry) = registry_with(runtime);

        use MarshalStrategy as S;
        assert_eq!(registry.strategy_of(ft::INT), (S::IntegerLike, Converter::Int32));
        assert_eq!(registry.strategy_of(ft::DOUBLE), (S::AddressLike, Converter::Float64));
        assert_eq!(registry.strategy_of(ft::STRING), (S::AddressLike, Converter::CString));
        assert_eq!(registry.strategy_of(detail), (S::AddressLike, Converter::Pointer));
        assert_eq!(registry.strategy_of(ft::NONE), (S::Absent, Converter::None));
        assert_eq!(registry.strategy_of(ft::VARIANT), (S::Unsupported, Converter::None));
    }

    #[test]
    fn test_derived_resolution_is_memoized() {
        let mut runtime = FakeRuntime::new();
        let iface = runtime.register("GeeIterable", Some(ft::INTERFACE));
        let (runtime, registry) = registry_with(runtime);

        let first = registry.resolve(iface);
        let lookups = runtime.name_lookups();
        let second = registry.resolve(iface);

        assert_eq!(first, second);
        assert_eq!(first.strategy, MarshalStrategy::Unsupported);
        assert_eq!(runtime.name_lookups(), lookups);
    }

    #[test]
    fn test_nameless_tag_not_cached() {
        let (runtime, registry) = registry_with(FakeRuntime::new());
        let transient = TypeTag::new(0xdead_0000);

        assert_eq!(registry.resolve(transient).strategy, MarshalStrategy::Unsupported);
        assert!(!registry.is_cached(transient));

        registry.resolve(transient);
        assert_eq!(runtime.name_lookups(), 2);
    }

    #[test]
    fn test_parentless_named_type_unsupported() {
        let mut runtime = FakeRuntime::new();
        let orphan = runtime.register("Orphan", None);
        let (_, registry) = registry_with(runtime);

        assert_eq!(registry.resolve(orphan).strategy, MarshalStrategy::Unsupported);
        assert!(registry.is_cached(orphan));
    }

    #[test]
    fn test_cyclic_hierarchy_terminates() {
        let mut runtime = FakeRuntime::new();
        let a = runtime.register("A", None);
        let b = runtime.register("B", Some(a));
        runtime.set_parent(a, b);
        let (_, registry) = registry_with(runtime);

        assert_eq!(registry.resolve(a).strategy, MarshalStrategy::Unsupported);
    }
}
