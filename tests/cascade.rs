use std::sync::atomic::{AtomicUsize, Ordering};

use donned::index::{Donnable, TraitIndex};
use donned::signature::TypeSignature;

struct Tag {
    name: String,
    code: TypeSignature,
    sheds: AtomicUsize,
}
impl Tag {
    fn new(name: &str, bits: &[u32]) -> Self {
        Self {
            name: name.into(),
            code: TypeSignature::of(bits),
            sheds: AtomicUsize::new(0),
        }
    }
    fn shed_count(&self) -> usize {
        self.sheds.load(Ordering::SeqCst)
    }
}
impl Donnable for Tag {
    fn signature(&self) -> &TypeSignature { &self.code }
    fn trait_name(&self) -> &str { &self.name }
    fn shed(&self) {
        self.sheds.fetch_add(1, Ordering::SeqCst);
    }
}

fn removed_names(removed: &[std::sync::Arc<Tag>]) -> Vec<&str> {
    let mut names: Vec<&str> = removed.iter().map(|v| v.trait_name()).collect();
    names.sort();
    names
}

#[test]
fn cascade_removes_exactly_the_subtypes() {
    let mut index = TraitIndex::new(TypeSignature::new());
    index.put("Pet", Tag::new("Pet", &[1]));
    index.put("Dog", Tag::new("Dog", &[1, 2]));
    index.put("Cat", Tag::new("Cat", &[1, 3]));
    index.put("Robot", Tag::new("Robot", &[4]));

    let removed = index.remove_cascade("Pet");
    assert_eq!(removed_names(&removed), vec!["Cat", "Dog", "Pet"]);
    assert!(index.contains_key("Robot"));
    assert_eq!(index.len(), 1);
    assert_eq!(index.current_type_code(), &TypeSignature::of(&[4]));
}

#[test]
fn cascade_invokes_the_shed_hook_once_per_member() {
    let mut index = TraitIndex::new(TypeSignature::new());
    let pet = index.put("Pet", Tag::new("Pet", &[1]));
    let dog = index.put("Dog", Tag::new("Dog", &[1, 2]));
    let robot = index.put("Robot", Tag::new("Robot", &[4]));

    index.remove_cascade("Pet");
    assert_eq!(pet.shed_count(), 1);
    assert_eq!(dog.shed_count(), 1);
    assert_eq!(robot.shed_count(), 0);
}

#[test]
fn cascading_an_already_removed_name_is_empty_not_an_error() {
    let mut index = TraitIndex::new(TypeSignature::new());
    index.put("Pet", Tag::new("Pet", &[1]));
    assert_eq!(index.remove_cascade("Pet").len(), 1);
    assert!(index.remove_cascade("Pet").is_empty());
    assert!(index.remove_cascade("NeverDonned").is_empty());
}

#[test]
fn cascade_falls_back_to_statically_declared_names() {
    let mut index = TraitIndex::new(TypeSignature::new());
    index.add_static_trait("Ghost", TypeSignature::of(&[1]));
    index.put("Dog", Tag::new("Dog", &[1, 2]));
    // Ghost was never donned, but its declared signature still cascades
    let removed = index.remove_cascade("Ghost");
    assert_eq!(removed_names(&removed), vec!["Dog"]);
    assert!(index.is_empty());
}

#[test]
fn virtual_members_are_skipped_and_survive_the_cascade() {
    let mut index = TraitIndex::new(TypeSignature::new());
    index.put("A", Tag::new("A", &[0]));
    index.put("B", Tag::new("B", &[1]));
    // the composite {0, 1} is occupied by a synthesized placeholder
    let bottom = TypeSignature::of(&[0, 1]);
    assert!(index.lattice().has_key(&bottom));

    let removed = index.remove_cascade("A");
    assert_eq!(removed_names(&removed), vec!["A"]);
    // the placeholder is bookkeeping only: skipped, not removed
    assert!(index.lattice().has_key(&bottom));
    assert!(index.contains_key("B"));
    assert_eq!(index.current_type_code(), &TypeSignature::of(&[1]));
}
