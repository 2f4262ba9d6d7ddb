//! Bulk donning: many traits merged in one operation, with the composite
//! recomputed from the full resulting set rather than OR'd incrementally.

use std::sync::Arc;

use donned::index::{Donnable, TraitIndex};
use donned::lattice::LatticeEntry;
use donned::signature::TypeSignature;

struct Tag {
    name: String,
    code: TypeSignature,
}
impl Tag {
    fn new(name: &str, bits: &[u32]) -> Self {
        Self { name: name.into(), code: TypeSignature::of(bits) }
    }
}
impl Donnable for Tag {
    fn signature(&self) -> &TypeSignature { &self.code }
    fn trait_name(&self) -> &str { &self.name }
}

fn binding(name: &str, bits: &[u32]) -> (String, Arc<Tag>) {
    (name.to_owned(), Arc::new(Tag::new(name, bits)))
}

fn names(entries: &[LatticeEntry<Tag>]) -> Vec<String> {
    let mut names: Vec<String> = entries
        .iter()
        .filter_map(|e| e.member().trait_name().map(str::to_owned))
        .collect();
    names.sort_unstable();
    names
}

#[test]
fn bulk_don_merges_every_binding_and_recomputes_the_composite() {
    let mut index = TraitIndex::new(TypeSignature::new());
    index.put_all(vec![
        binding("Pet", &[1]),
        binding("Dog", &[1, 2]),
        binding("Robot", &[4]),
    ]);

    assert_eq!(index.len(), 3);
    assert!(index.contains_key("Pet"));
    assert!(index.contains_key("Dog"));
    assert!(index.contains_key("Robot"));
    assert!(index.lattice().has_key(&TypeSignature::of(&[1])));
    assert!(index.lattice().has_key(&TypeSignature::of(&[1, 2])));
    assert!(index.lattice().has_key(&TypeSignature::of(&[4])));
    assert_eq!(index.current_type_code(), &TypeSignature::of(&[1, 2, 4]));

    // the composite {1, 2, 4} matches no single trait, so the most specific
    // answer is its immediate parents: Dog and Robot (Pet is subsumed by Dog)
    let specific = index.most_specific_traits().unwrap();
    assert_eq!(names(&specific), vec!["Dog", "Robot"]);
}

// An empty bulk don on a fact that has never worn a trait is a no-op: no
// bottom is established and the fact stays untraited.
#[test]
fn empty_bulk_don_leaves_an_untraited_fact_untraited() {
    let mut index: TraitIndex<Tag> = TraitIndex::new(TypeSignature::new());
    index.put_all(Vec::new());

    assert!(index.is_empty());
    assert!(index.lattice().bottom().is_none());
    assert!(index.most_specific_traits().is_none());
    assert!(index.current_type_code().is_empty());
}

#[test]
fn empty_bulk_don_preserves_an_already_traited_fact() {
    let mut index = TraitIndex::new(TypeSignature::new());
    index.put("Pet", Tag::new("Pet", &[1]));

    index.put_all(Vec::new());
    assert_eq!(index.current_type_code(), &TypeSignature::of(&[1]));
    assert_eq!(names(&index.most_specific_traits().unwrap()), vec!["Pet"]);
}

#[test]
fn bulk_don_extends_an_existing_index() {
    let mut index = TraitIndex::new(TypeSignature::new());
    index.put("Pet", Tag::new("Pet", &[1]));
    assert_eq!(names(&index.most_specific_traits().unwrap()), vec!["Pet"]);

    index.put_all(vec![binding("Dog", &[1, 2]), binding("Chipped", &[5])]);
    assert_eq!(index.current_type_code(), &TypeSignature::of(&[1, 2, 5]));
    assert_eq!(names(&index.most_specific_traits().unwrap()), vec!["Chipped", "Dog"]);
}
