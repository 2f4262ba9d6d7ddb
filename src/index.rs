//! The trait index: the externally visible trait-name-keyed mapping, kept
//! consistent with the type lattice and the running composite signature.
//!
//! Exactly one logical owner (the engine's working-memory update path for a
//! given fact) mutates an index at a time. No internal locking is performed
//! and no operation offers atomicity beyond its own scope.

use std::collections::HashMap;
use std::collections::hash_map;
use std::fmt;
use std::hash::BuildHasherDefault;
use std::sync::Arc;

use seahash::SeaHasher;
use tracing::{debug, trace};

use crate::lattice::{LatticeEntry, TraitMember, TypeLattice};
use crate::signature::TypeSignature;

pub type NameHasher = BuildHasherDefault<SeaHasher>;

/// The contract every donned trait value must satisfy.
///
/// The trait replaces runtime type inspection on lattice occupants: the
/// capabilities the engine needs (a stable signature, an externally visible
/// name, an optional shed lifecycle hook) are first-class methods resolved at
/// compose time.
pub trait Donnable {
    /// The value's full type signature, stable for the value's lifetime.
    fn signature(&self) -> &TypeSignature;
    /// The externally visible trait name this value is donned under.
    fn trait_name(&self) -> &str;
    /// Lifecycle hook invoked when the trait is shed. Values needing teardown
    /// use interior mutability; the default does nothing.
    fn shed(&self) {}
}

// The static contribution is set once. The sentinel "no static type" state is
// distinct from "not yet set".
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StaticCode {
    Unset,
    NoStatic,
    Declared(TypeSignature),
}

// Invalidate-on-write, recompute-on-read. A tagged variant rather than an
// overloaded empty collection, so "no traits" and "not yet computed" stay
// distinguishable.
#[derive(Debug)]
pub(crate) enum Cache<V> {
    Unknown,
    Computed(Vec<LatticeEntry<V>>),
}

/// Per-fact-instance mapping from trait name to trait value, layered on top
/// of an exclusively owned [`TypeLattice`].
///
/// Every `put` ORs the trait's signature into the running composite and
/// registers the trait in the lattice; every removal un-registers and
/// recomputes the composite from scratch; the cached most-specific result is
/// invalidated on every structural change and lazily recomputed.
pub struct TraitIndex<V> {
    pub(crate) lattice: TypeLattice<V>,
    pub(crate) by_name: HashMap<String, Arc<V>, NameHasher>,
    pub(crate) running: TypeSignature,
    pub(crate) static_code: StaticCode,
    pub(crate) static_names: HashMap<String, TypeSignature, NameHasher>,
    pub(crate) most_specific: Cache<V>,
}

impl<V: Donnable> TraitIndex<V> {
    /// Creates an index for a freshly traited fact, seeding the lattice with
    /// the "top" placeholder carrying the fact's own concrete signature.
    pub fn new(core_signature: TypeSignature) -> Self {
        let mut lattice = TypeLattice::new();
        lattice.add_member(TraitMember::Core(core_signature.clone()), core_signature);
        Self {
            lattice,
            by_name: HashMap::default(),
            running: TypeSignature::new(),
            static_code: StaticCode::Unset,
            static_names: HashMap::default(),
            most_specific: Cache::Unknown,
        }
    }
    pub(crate) fn empty() -> Self {
        Self {
            lattice: TypeLattice::new(),
            by_name: HashMap::default(),
            running: TypeSignature::new(),
            static_code: StaticCode::Unset,
            static_names: HashMap::default(),
            most_specific: Cache::Unknown,
        }
    }

    /// Dons a trait: registers the value in the lattice, binds the name, ORs
    /// the value's signature into the running composite and designates the
    /// new composite as bottom. Returns the stored value.
    ///
    /// A name rebind does not retract the previously registered signature
    /// from the composite; only explicit removal prunes the lattice.
    pub fn put(&mut self, name: &str, value: V) -> Arc<V> {
        let value = Arc::new(value);
        self.put_shared(name, Arc::clone(&value));
        value
    }
    /// Semantically identical to [`TraitIndex::put`]; exists to signal
    /// call-site intent when the caller has already vetted the don.
    pub fn put_safe(&mut self, name: &str, value: V) -> Arc<V> {
        self.put(name, value)
    }
    /// [`TraitIndex::put`] for a value that is already shared.
    pub fn put_shared(&mut self, name: &str, value: Arc<V>) -> Arc<V> {
        let code = value.signature().clone();
        trace!(trait_name = name, code = %code, "don");
        self.lattice.add_member(TraitMember::Donned(Arc::clone(&value)), code.clone());
        self.by_name.insert(name.to_owned(), Arc::clone(&value));
        self.running |= &code;
        self.lattice.set_bottom(self.running.clone());
        self.most_specific = Cache::Unknown;
        value
    }
    /// Registers every value in the lattice, merges all bindings, then
    /// recomputes the composite from the full resulting set.
    pub fn put_all<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (String, Arc<V>)>,
    {
        let mut merged = 0usize;
        for (name, value) in entries {
            self.lattice
                .add_member(TraitMember::Donned(Arc::clone(&value)), value.signature().clone());
            self.by_name.insert(name, value);
            merged += 1;
        }
        self.reset_running();
        // an empty merge on a never-traited fact establishes no bottom
        if merged > 0 || self.lattice.bottom().is_some() {
            self.lattice.set_bottom(self.running.clone());
        }
        self.most_specific = Cache::Unknown;
        debug!(merged, "bulk don");
    }

    /// Sheds a single trait by name: the binding is removed, the value's shed
    /// hook runs, its exact lattice entry is deleted, and the composite is
    /// recomputed from the remaining values.
    pub fn remove(&mut self, name: &str) -> Option<Arc<V>> {
        let value = self.by_name.remove(name)?;
        value.shed();
        self.lattice.remove_member(value.signature());
        self.most_specific = Cache::Unknown;
        self.reset_running();
        Some(value)
    }

    /// Sheds a trait together with every currently donned trait that is one
    /// of its subtypes. The name resolves through the live bindings first and
    /// falls back to statically declared traits; a name resolving to nothing
    /// yields an empty result, not an error. Returns exactly the concrete
    /// members removed; virtual members are bookkeeping and are skipped.
    pub fn remove_cascade(&mut self, name: &str) -> Vec<Arc<V>> {
        let code = match self.by_name.get(name) {
            Some(value) => value.signature().clone(),
            None => match self.static_names.get(name) {
                Some(code) => code.clone(),
                None => return Vec::new(),
            },
        };
        self.remove_cascade_code(&code)
    }
    /// [`TraitIndex::remove_cascade`] addressed by signature.
    pub fn remove_cascade_code(&mut self, code: &TypeSignature) -> Vec<Arc<V>> {
        let descendants = self.lattice.lower_descendants(code);
        let mut removed = Vec::with_capacity(descendants.len());
        for entry in descendants {
            if let TraitMember::Donned(value) = entry.member() {
                value.shed();
                self.lattice.remove_member(value.signature());
                self.by_name.remove(value.trait_name());
                removed.push(Arc::clone(value));
            }
        }
        debug!(code = %code, removed = removed.len(), "cascade shed");
        self.most_specific = Cache::Unknown;
        self.reset_running();
        removed
    }

    // The composite is rebuilt from scratch: bit subtraction is not
    // well-defined when several donned traits share ancestor bits.
    fn reset_running(&mut self) {
        let mut code = TypeSignature::new();
        if let StaticCode::Declared(static_code) = &self.static_code {
            code |= static_code;
        }
        for value in self.by_name.values() {
            code |= value.signature();
        }
        self.running = code;
    }

    /// The most specific traits consistent with the current composite.
    ///
    /// `None` until a bottom has been established (fact never donned). A
    /// concrete entry at the bottom signature is the singleton answer; a
    /// virtual or missing entry means the composite is a novel combination,
    /// answered by its immediate parents in the lattice.
    pub fn most_specific_traits(&mut self) -> Option<Vec<LatticeEntry<V>>> {
        let bottom = self.lattice.bottom()?.clone();
        if let Cache::Computed(cached) = &self.most_specific {
            return Some(cached.clone());
        }
        let computed = match self.lattice.get_member(&bottom) {
            Some(entry) if !entry.is_virtual() => vec![entry.clone()],
            _ => self.lattice.immediate_parents(&bottom),
        };
        self.most_specific = Cache::Computed(computed.clone());
        Some(computed)
    }

    /// The running composite signature: the union of every currently present
    /// trait's signature plus any declared static signature.
    pub fn current_type_code(&self) -> &TypeSignature {
        &self.running
    }
    pub fn static_type_code(&self) -> Option<&TypeSignature> {
        match &self.static_code {
            StaticCode::Declared(code) => Some(code),
            _ => None,
        }
    }
    /// Sets the compile-time-declared contribution once. `None` stores the
    /// "no static type" sentinel; a declared signature is permanently OR'd
    /// into the running composite.
    pub fn set_static_type_code(&mut self, code: Option<TypeSignature>) {
        match code {
            Some(code) => {
                self.running |= &code;
                self.static_code = StaticCode::Declared(code);
            }
            None => self.static_code = StaticCode::NoStatic,
        }
    }
    /// Side-registers a compile-time-known name→signature mapping, consulted
    /// only by cascade fallback resolution.
    pub fn add_static_trait(&mut self, name: &str, code: TypeSignature) {
        self.static_names.insert(name.to_owned(), code);
    }

    pub fn lattice(&self) -> &TypeLattice<V> {
        &self.lattice
    }

    // Container-style accessors over the name index.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
    pub fn contains_key(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }
    /// Identity containment: `true` when this exact shared value is bound.
    pub fn contains_value(&self, value: &Arc<V>) -> bool {
        self.by_name.values().any(|v| Arc::ptr_eq(v, value))
    }
    pub fn get(&self, name: &str) -> Option<&Arc<V>> {
        self.by_name.get(name)
    }
    pub fn keys(&self) -> hash_map::Keys<'_, String, Arc<V>> {
        self.by_name.keys()
    }
    pub fn values(&self) -> hash_map::Values<'_, String, Arc<V>> {
        self.by_name.values()
    }
    pub fn iter(&self) -> hash_map::Iter<'_, String, Arc<V>> {
        self.by_name.iter()
    }
    /// Empties the name index only. The lattice, the running composite, the
    /// bottom and the cache are all left untouched.
    pub fn clear(&mut self) {
        self.by_name.clear();
    }
}

impl<V: Donnable> fmt::Display for TraitIndex<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut names: Vec<&String> = self.by_name.keys().collect();
        names.sort_unstable();
        let mut s = String::new();
        for name in names {
            s += &format!("{} : {}; ", name, self.by_name[name.as_str()].signature());
        }
        s.pop();
        s.pop();
        write!(f, "TraitIndex{{{}}}", s)
    }
}

impl<V: Donnable> fmt::Debug for TraitIndex<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TraitIndex")
            .field("bindings", &self.by_name.len())
            .field("running", &self.running)
            .field("bottom", &self.lattice.bottom())
            .finish()
    }
}
