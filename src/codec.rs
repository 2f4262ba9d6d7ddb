//! Byte-stable snapshot codec for a [`TraitIndex`].
//!
//! The field order is part of the persistence contract and must be mirrored
//! exactly by any independent implementation: lattice base state, name
//! bindings sorted ascending by name, the running composite, the static
//! signature, then the most-specific cache written verbatim (never recomputed
//! on write). Reading restores the cache with whatever staleness the source
//! held. All framing integers are little-endian; signatures use roaring's
//! portable serialization behind a length prefix; values are length-prefixed
//! bincode payloads.

use std::io::{Read, Write};
use std::sync::Arc;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{DonnedError, Result};
use crate::index::{Cache, Donnable, StaticCode, TraitIndex};
use crate::lattice::{LatticeEntry, TraitMember};
use crate::signature::TypeSignature;

const MAGIC: &[u8; 4] = b"TIDX";
const VERSION: u16 = 1;

const TAG_CORE: u8 = 0;
const TAG_SYNTHETIC: u8 = 1;
const TAG_DONNED: u8 = 2;

// Length prefixes come from untrusted streams; a prefix above this limit is
// rejected before any buffer is allocated.
const MAX_CHUNK: usize = 16 * 1024 * 1024;

fn read_chunk<R: Read>(reader: &mut R, what: &str) -> Result<Vec<u8>> {
    let len = reader.read_u32::<LittleEndian>()? as usize;
    if len > MAX_CHUNK {
        return Err(DonnedError::DataCorruption {
            message: format!("{} length {} exceeds the {} byte limit", what, len, MAX_CHUNK),
        });
    }
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    Ok(bytes)
}

/// Writes a snapshot of the index. Purely in-memory buffer writes; the
/// destination is whatever `Write` the marshalling layer supplies.
pub fn write_snapshot<V, W>(index: &TraitIndex<V>, writer: &mut W) -> Result<()>
where
    V: Donnable + Serialize,
    W: Write,
{
    writer.write_all(MAGIC)?;
    writer.write_u16::<LittleEndian>(VERSION)?;

    // lattice base state: bottom, then entries ascending by signature
    write_opt_signature(writer, index.lattice.bottom())?;
    let entries = index.lattice.entries_sorted();
    writer.write_u32::<LittleEndian>(entries.len() as u32)?;
    for entry in entries {
        entry.code().write_to(writer)?;
        write_member(writer, entry.member())?;
    }

    // name bindings in ascending lexical name order
    let mut names: Vec<&String> = index.by_name.keys().collect();
    names.sort_unstable();
    writer.write_u32::<LittleEndian>(names.len() as u32)?;
    for name in names {
        write_string(writer, name)?;
        write_value(writer, &index.by_name[name.as_str()])?;
    }

    index.running.write_to(writer)?;

    match &index.static_code {
        StaticCode::Unset => writer.write_u8(0)?,
        StaticCode::NoStatic => writer.write_u8(1)?,
        StaticCode::Declared(code) => {
            writer.write_u8(2)?;
            code.write_to(writer)?;
        }
    }

    // cache snapshot, as-is
    match &index.most_specific {
        Cache::Unknown => writer.write_u8(0)?,
        Cache::Computed(cached) => {
            writer.write_u8(1)?;
            writer.write_u32::<LittleEndian>(cached.len() as u32)?;
            for entry in cached {
                entry.code().write_to(writer)?;
                write_member(writer, entry.member())?;
            }
        }
    }
    Ok(())
}

/// Reconstructs an index from a snapshot produced by [`write_snapshot`].
///
/// The name index is rebuilt empty and populated from the stream. Entry
/// identity tokens are process-local and reassigned on read. A stream from an
/// incompatible version fails outright; there is no partial recovery.
pub fn read_snapshot<V, R>(reader: &mut R) -> Result<TraitIndex<V>>
where
    V: Donnable + DeserializeOwned,
    R: Read,
{
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(DonnedError::Snapshot("unrecognized header".to_owned()));
    }
    let version = reader.read_u16::<LittleEndian>()?;
    if version != VERSION {
        return Err(DonnedError::Snapshot(format!(
            "version {} not supported (expected {})",
            version, VERSION
        )));
    }

    let mut index = TraitIndex::empty();

    let bottom = read_opt_signature(reader)?;
    let entries = reader.read_u32::<LittleEndian>()?;
    for _ in 0..entries {
        let code = TypeSignature::read_from(reader)?;
        let member = read_member(reader, &code)?;
        index.lattice.add_member(member, code);
    }
    index.lattice.restore_bottom(bottom);

    let bindings = reader.read_u32::<LittleEndian>()?;
    for _ in 0..bindings {
        let name = read_string(reader)?;
        let value: V = read_value(reader)?;
        index.by_name.insert(name, Arc::new(value));
    }

    index.running = TypeSignature::read_from(reader)?;

    index.static_code = match reader.read_u8()? {
        0 => StaticCode::Unset,
        1 => StaticCode::NoStatic,
        2 => StaticCode::Declared(TypeSignature::read_from(reader)?),
        tag => {
            return Err(DonnedError::DataCorruption {
                message: format!("unknown static code tag {}", tag),
            });
        }
    };

    index.most_specific = match reader.read_u8()? {
        0 => Cache::Unknown,
        1 => {
            let cached = reader.read_u32::<LittleEndian>()?;
            let mut computed = Vec::with_capacity(cached as usize);
            for _ in 0..cached {
                let code = TypeSignature::read_from(reader)?;
                let member = read_member(reader, &code)?;
                let id = index.lattice.mint_id();
                computed.push(LatticeEntry::new(id, code, member));
            }
            Cache::Computed(computed)
        }
        tag => {
            return Err(DonnedError::DataCorruption {
                message: format!("unknown cache tag {}", tag),
            });
        }
    };

    Ok(index)
}

/// [`write_snapshot`] into a fresh buffer.
pub fn to_bytes<V: Donnable + Serialize>(index: &TraitIndex<V>) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_snapshot(index, &mut buffer)?;
    Ok(buffer)
}

/// [`read_snapshot`] from a byte slice.
pub fn from_bytes<V: Donnable + DeserializeOwned>(bytes: &[u8]) -> Result<TraitIndex<V>> {
    let mut reader = bytes;
    read_snapshot(&mut reader)
}

fn write_member<V, W>(writer: &mut W, member: &TraitMember<V>) -> Result<()>
where
    V: Donnable + Serialize,
    W: Write,
{
    match member {
        // placeholder signatures equal the entry signature, already written
        TraitMember::Core(_) => writer.write_u8(TAG_CORE)?,
        TraitMember::Synthetic(_) => writer.write_u8(TAG_SYNTHETIC)?,
        TraitMember::Donned(value) => {
            writer.write_u8(TAG_DONNED)?;
            write_value(writer, value)?;
        }
    }
    Ok(())
}

fn read_member<V, R>(reader: &mut R, code: &TypeSignature) -> Result<TraitMember<V>>
where
    V: Donnable + DeserializeOwned,
    R: Read,
{
    match reader.read_u8()? {
        TAG_CORE => Ok(TraitMember::Core(code.clone())),
        TAG_SYNTHETIC => Ok(TraitMember::Synthetic(code.clone())),
        TAG_DONNED => Ok(TraitMember::Donned(Arc::new(read_value(reader)?))),
        tag => Err(DonnedError::DataCorruption {
            message: format!("unknown member tag {}", tag),
        }),
    }
}

fn write_opt_signature<W: Write>(writer: &mut W, code: Option<&TypeSignature>) -> Result<()> {
    match code {
        None => writer.write_u8(0)?,
        Some(code) => {
            writer.write_u8(1)?;
            code.write_to(writer)?;
        }
    }
    Ok(())
}

fn read_opt_signature<R: Read>(reader: &mut R) -> Result<Option<TypeSignature>> {
    match reader.read_u8()? {
        0 => Ok(None),
        1 => Ok(Some(TypeSignature::read_from(reader)?)),
        tag => Err(DonnedError::DataCorruption {
            message: format!("unknown signature tag {}", tag),
        }),
    }
}

fn write_string<W: Write>(writer: &mut W, s: &str) -> Result<()> {
    writer.write_u32::<LittleEndian>(s.len() as u32)?;
    writer.write_all(s.as_bytes())?;
    Ok(())
}

fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let bytes = read_chunk(reader, "binding name")?;
    String::from_utf8(bytes).map_err(|e| DonnedError::DataCorruption {
        message: format!("binding name is not valid UTF-8: {}", e),
    })
}

fn write_value<V: Serialize, W: Write>(writer: &mut W, value: &Arc<V>) -> Result<()> {
    let payload = bincode::serialize(value.as_ref())?;
    writer.write_u32::<LittleEndian>(payload.len() as u32)?;
    writer.write_all(&payload)?;
    Ok(())
}

fn read_value<V: DeserializeOwned, R: Read>(reader: &mut R) -> Result<V> {
    let payload = read_chunk(reader, "value payload")?;
    Ok(bincode::deserialize(&payload)?)
}
