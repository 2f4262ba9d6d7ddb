//! Donned – a dynamic trait/type lattice for rule-engine facts.
//!
//! A plain data fact can acquire ("don") and lose ("shed") additional trait
//! types at runtime, a form of dynamic, bitmask-encoded multiple inheritance:
//! * A [`signature::TypeSignature`] is a bit vector over the process-wide
//!   type universe; bit *i* set means "is-a type *i*", ancestors included,
//!   so subtyping is plain bit-vector containment.
//! * A [`lattice::TypeLattice`] holds every (signature, member) pair ever
//!   registered for one fact instance and answers subtype/supertype queries:
//!   immediate parents of a novel composite, lower descendants that must
//!   cascade when an ancestor is shed, and one designated *bottom* (the most
//!   specific composite currently known).
//! * A [`index::TraitIndex`] is the externally visible trait-name-keyed
//!   mapping layered on top, keeping three pieces of state consistent under
//!   arbitrary insertion/removal order: the name index, the lattice, and the
//!   running composite signature consumed by downstream rule matching.
//!
//! ## Modules
//! * [`signature`] – The growable bit-vector type signature.
//! * [`lattice`] – Lattice entries, virtual placeholders and containment queries.
//! * [`index`] – The [`index::Donnable`] contract and the per-fact trait index.
//! * [`codec`] – Byte-stable snapshot serialization for persistence/marshalling.
//! * [`error`] – The crate error type.
//!
//! ## Trait values
//! Anything implementing [`index::Donnable`] can be donned: the contract is a
//! stable signature, an externally visible trait name, and an optional shed
//! lifecycle hook. Virtual lattice placeholders are synthesized internally
//! and never cross the API as donned values.
//!
//! ## Concurrency
//! Neither the index nor the lattice performs internal locking. Exactly one
//! logical owner mutates a given fact's trait state at a time; an embedding
//! engine that updates facts concurrently must serialize those mutations per
//! fact instance itself.
//!
//! ## Quick Start
//! ```
//! use donned::signature::TypeSignature;
//! use donned::index::{Donnable, TraitIndex};
//!
//! struct Tag { name: String, code: TypeSignature }
//! impl Donnable for Tag {
//!     fn signature(&self) -> &TypeSignature { &self.code }
//!     fn trait_name(&self) -> &str { &self.name }
//! }
//!
//! let mut index = TraitIndex::new(TypeSignature::new());
//! index.put("Pet", Tag { name: "Pet".into(), code: TypeSignature::of(&[1]) });
//! index.put("Dog", Tag { name: "Dog".into(), code: TypeSignature::of(&[1, 2]) });
//! assert_eq!(index.current_type_code(), &TypeSignature::of(&[1, 2]));
//! // shedding Pet cascades to its subtype Dog
//! let removed = index.remove_cascade("Pet");
//! assert_eq!(removed.len(), 2);
//! assert!(index.is_empty());
//! ```

pub mod codec;
pub mod error;
pub mod index;
pub mod lattice;
pub mod signature;
