//! The per-instance type lattice: every (signature, member) pair registered
//! for one fact, ordered by bit-vector containment.
//!
//! Entries are stored under their exact signature. Two structurally equal
//! trait values must remain distinguishable as separate lattice occupants, so
//! every entry carries a monotonically assigned instance id and compares by
//! that id rather than by the member's own equality.

use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasherDefault, Hash, Hasher};
use std::sync::Arc;

use seahash::SeaHasher;

use crate::index::Donnable;
use crate::signature::TypeSignature;

pub type SignatureHasher = BuildHasherDefault<SeaHasher>;

/// A lattice occupant. Placeholders are virtual: they carry no externally
/// visible trait name and exist only so that exact-signature queries succeed.
#[derive(Debug)]
pub enum TraitMember<V> {
    /// The "top" placeholder seeded at index creation, standing in for the
    /// fact's own concrete class before any trait is donned.
    Core(TypeSignature),
    /// A synthesized bottom filler: the current composite is a combination
    /// with no single matching registered trait.
    Synthetic(TypeSignature),
    /// A concrete donned trait.
    Donned(Arc<V>),
}

impl<V: Donnable> TraitMember<V> {
    pub fn signature(&self) -> &TypeSignature {
        match self {
            TraitMember::Core(code) => code,
            TraitMember::Synthetic(code) => code,
            TraitMember::Donned(value) => value.signature(),
        }
    }
    pub fn is_virtual(&self) -> bool {
        !matches!(self, TraitMember::Donned(_))
    }
    /// The externally visible trait name, absent for virtual members.
    pub fn trait_name(&self) -> Option<&str> {
        match self {
            TraitMember::Donned(value) => Some(value.trait_name()),
            _ => None,
        }
    }
    pub fn value(&self) -> Option<&Arc<V>> {
        match self {
            TraitMember::Donned(value) => Some(value),
            _ => None,
        }
    }
}

impl<V> Clone for TraitMember<V> {
    fn clone(&self) -> Self {
        match self {
            TraitMember::Core(code) => TraitMember::Core(code.clone()),
            TraitMember::Synthetic(code) => TraitMember::Synthetic(code.clone()),
            TraitMember::Donned(value) => TraitMember::Donned(Arc::clone(value)),
        }
    }
}

/// A registered (signature, member) pair together with its identity token.
#[derive(Debug)]
pub struct LatticeEntry<V> {
    id: u64,
    code: TypeSignature,
    member: TraitMember<V>,
}

impl<V> LatticeEntry<V> {
    pub(crate) fn new(id: u64, code: TypeSignature, member: TraitMember<V>) -> Self {
        Self { id, code, member }
    }
    pub fn id(&self) -> u64 {
        self.id
    }
    pub fn code(&self) -> &TypeSignature {
        &self.code
    }
    pub fn member(&self) -> &TraitMember<V> {
        &self.member
    }
}
impl<V: Donnable> LatticeEntry<V> {
    pub fn is_virtual(&self) -> bool {
        self.member.is_virtual()
    }
}
impl<V> Clone for LatticeEntry<V> {
    fn clone(&self) -> Self {
        Self { id: self.id, code: self.code.clone(), member: self.member.clone() }
    }
}
// Identity semantics: equal ids, not equal members.
impl<V> PartialEq for LatticeEntry<V> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<V> Eq for LatticeEntry<V> {}
impl<V> Hash for LatticeEntry<V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// All (signature, member) pairs seen for one fact instance, with one
/// designated bottom: the most specific composite currently known.
#[derive(Debug)]
pub struct TypeLattice<V> {
    entries: HashMap<TypeSignature, LatticeEntry<V>, SignatureHasher>,
    bottom: Option<TypeSignature>,
    next_id: u64,
}

impl<V: Donnable> TypeLattice<V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::default(),
            bottom: None,
            next_id: 0,
        }
    }
    pub(crate) fn mint_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
    /// Inserts a member at its exact signature, overwriting any entry already
    /// occupying that signature. Bottom tracking is the caller's concern.
    pub fn add_member(&mut self, member: TraitMember<V>, code: TypeSignature) {
        let id = self.mint_id();
        self.entries.insert(code.clone(), LatticeEntry::new(id, code, member));
    }
    /// Deletes the entry at that exact signature, if present.
    pub fn remove_member(&mut self, code: &TypeSignature) -> Option<LatticeEntry<V>> {
        self.entries.remove(code)
    }
    /// Exact-signature membership, not a subtype test.
    pub fn has_key(&self, code: &TypeSignature) -> bool {
        self.entries.contains_key(code)
    }
    pub fn get_member(&self, code: &TypeSignature) -> Option<&LatticeEntry<V>> {
        self.entries.get(code)
    }
    /// Designates `code` as the bottom. When no entry occupies that exact
    /// signature yet, a [`TraitMember::Synthetic`] filler is stored there so
    /// that subsequent exact-key queries succeed; the guard also avoids
    /// re-deriving fillers when several traits combine to the same composite.
    pub fn set_bottom(&mut self, code: TypeSignature) {
        if !self.has_key(&code) {
            self.add_member(TraitMember::Synthetic(code.clone()), code.clone());
        }
        self.bottom = Some(code);
    }
    pub fn bottom(&self) -> Option<&TypeSignature> {
        self.bottom.as_ref()
    }
    pub(crate) fn restore_bottom(&mut self, bottom: Option<TypeSignature>) {
        self.bottom = bottom;
    }
    /// The registered entries whose signatures are *minimal* proper
    /// supertypes of `code`, i.e. the maximal proper bit-subsets. Diamond
    /// configurations yield every equally minimal parent.
    pub fn immediate_parents(&self, code: &TypeSignature) -> Vec<LatticeEntry<V>> {
        let candidates: Vec<&LatticeEntry<V>> = self
            .entries
            .values()
            .filter(|e| e.code() != code && code.is_subtype_of(e.code()))
            .collect();
        candidates
            .iter()
            .filter(|c| {
                !candidates.iter().any(|d| {
                    d.code() != c.code() && d.code().is_subtype_of(c.code())
                })
            })
            .map(|c| (**c).clone())
            .collect()
    }
    /// Every registered entry whose signature contains all bits of `code`,
    /// the entry at `code` itself included (subtyping is reflexive). This is
    /// what must cascade when an ancestor trait is shed.
    pub fn lower_descendants(&self, code: &TypeSignature) -> Vec<LatticeEntry<V>> {
        self.entries
            .values()
            .filter(|e| e.code().is_subtype_of(code))
            .cloned()
            .collect()
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    /// Entries in ascending signature order, for deterministic serialization.
    pub fn entries_sorted(&self) -> Vec<&LatticeEntry<V>> {
        let mut entries: Vec<&LatticeEntry<V>> = self.entries.values().collect();
        entries.sort_unstable_by(|a, b| a.code().cmp(b.code()));
        entries
    }
}

impl<V: Donnable> Default for TypeLattice<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Donnable> fmt::Display for TypeLattice<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut s = String::new();
        for entry in self.entries_sorted() {
            s += &format!(
                "{} : {}; ",
                entry.code(),
                entry.member().trait_name().unwrap_or("<virtual>")
            );
        }
        s.pop();
        s.pop();
        write!(f, "TypeLattice{{{}}}", s)
    }
}
