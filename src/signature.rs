//! Type signatures: growable bit vectors over the process-wide type universe.
//!
//! Bit *i* set means "is-a type *i*", ancestors included, so a signature
//! already carries its full transitive closure. Subtyping is therefore plain
//! bit-vector containment and never consults names or registration order.
//! This crate never allocates bit positions itself; signatures arrive from an
//! external type-registration facility with their positions already resolved.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::{Read, Write};
use std::ops;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use roaring::RoaringBitmap;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

/// Upper bound on a single serialized signature. Length prefixes come from
/// untrusted streams; a prefix above this limit is corruption, not data.
pub const MAX_SERIALIZED_BYTES: usize = 16 * 1024 * 1024;

/// A bit vector encoding a type's full ancestor set.
///
/// Signatures are immutable once stored in a lattice. A *running* composite
/// only ever grows by union; shrinking it is done by recomputing from scratch,
/// never by clearing individual bits (see [`crate::index::TraitIndex`]).
#[derive(Clone, Debug, Default)]
pub struct TypeSignature {
    bits: RoaringBitmap,
}

impl TypeSignature {
    pub fn new() -> Self {
        Self { bits: RoaringBitmap::new() }
    }
    /// Builds a signature from literal bit positions.
    pub fn of(bits: &[u32]) -> Self {
        Self { bits: bits.iter().copied().collect() }
    }
    pub fn insert(&mut self, bit: u32) {
        self.bits.insert(bit);
    }
    pub fn contains(&self, bit: u32) -> bool {
        self.bits.contains(bit)
    }
    /// `self ⊒ other`: every bit set in `other` is also set in `self`.
    /// Reflexive and transitive.
    pub fn is_subtype_of(&self, other: &TypeSignature) -> bool {
        other.bits.is_subset(&self.bits)
    }
    pub fn is_supertype_of(&self, other: &TypeSignature) -> bool {
        other.is_subtype_of(self)
    }
    pub fn union_with(&mut self, other: &TypeSignature) {
        self.bits |= &other.bits;
    }
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }
    pub fn len(&self) -> u64 {
        self.bits.len()
    }
    /// Set bit positions in ascending order.
    pub fn bits(&self) -> impl Iterator<Item = u32> + '_ {
        self.bits.iter()
    }
    /// Writes the signature as a length-prefixed roaring serialization.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u32::<LittleEndian>(self.bits.serialized_size() as u32)?;
        self.bits.serialize_into(&mut *writer)
    }
    /// Mirrors [`TypeSignature::write_to`]. The prefixed byte count is
    /// consumed in full so the surrounding stream stays aligned. A prefix
    /// beyond [`MAX_SERIALIZED_BYTES`] is rejected before any allocation.
    pub fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let size = reader.read_u32::<LittleEndian>()? as usize;
        if size > MAX_SERIALIZED_BYTES {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("signature length {} exceeds the {} byte limit", size, MAX_SERIALIZED_BYTES),
            ));
        }
        let mut buffer = vec![0u8; size];
        reader.read_exact(&mut buffer)?;
        let bits = RoaringBitmap::deserialize_from(&buffer[..])?;
        Ok(Self { bits })
    }
}

impl PartialEq for TypeSignature {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}
impl Eq for TypeSignature {}
impl Hash for TypeSignature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for bit in self.bits.iter() {
            bit.hash(state);
        }
        self.bits.len().hash(state);
    }
}
// An arbitrary total order (lexicographic over set bits) so that codec
// iteration is deterministic. This is not the lattice order.
impl Ord for TypeSignature {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bits.iter().cmp(other.bits.iter())
    }
}
impl PartialOrd for TypeSignature {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl ops::BitOrAssign<&TypeSignature> for TypeSignature {
    fn bitor_assign(&mut self, rhs: &TypeSignature) {
        self.bits |= &rhs.bits;
    }
}
impl FromIterator<u32> for TypeSignature {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self { bits: iter.into_iter().collect() }
    }
}
impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut s = String::new();
        for bit in self.bits.iter() {
            s += &(bit.to_string() + ", ");
        }
        s.pop();
        s.pop();
        write!(f, "{{{}}}", s)
    }
}

// Trait values carrying a signature travel through the snapshot codec, so the
// signature itself serializes as its sequence of set bit positions.
impl Serialize for TypeSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let bits: Vec<u32> = self.bits.iter().collect();
        bits.serialize(serializer)
    }
}
impl<'de> Deserialize<'de> for TypeSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bits = Vec::<u32>::deserialize(deserializer)?;
        Ok(bits.into_iter().collect())
    }
}
