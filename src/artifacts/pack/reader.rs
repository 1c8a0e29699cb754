//! Pack file (`.pack`) decoding
//!
//! Each entry starts with a variable-length header: the first byte carries
//! the entry type in bits 4-6 and the low four bits of the inflated size, and
//! every byte with the MSB set is followed by seven more size bits. Delta
//! entries then name their base, and all entries end with zlib data.
//!
//! Entries are read with a seek to their offset instead of mapping the whole
//! pack, so a large pack costs only the objects actually visited.

use crate::artifacts::objects::object::RawObject;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::pack::delta::apply_delta;
use crate::artifacts::pack::index::PackIndex;
use crate::artifacts::pack::{MAX_DELTA_CHAIN, MAX_PREALLOCATION, OFS_DELTA, REF_DELTA};
use anyhow::Context;
use byteorder::{BigEndian, ReadBytesExt};
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

const PACK_SIGNATURE: &[u8; 4] = b"PACK";

#[derive(Debug)]
enum EntryKind {
    Object(ObjectType),
    OfsDelta { base_offset: u64 },
    RefDelta { base_oid: ObjectId },
}

#[derive(Debug)]
struct PackEntry {
    kind: EntryKind,
    data: Vec<u8>,
}

/// A pack file together with its index
#[derive(Debug)]
pub struct PackFile {
    path: Box<Path>,
    index: PackIndex,
}

impl PackFile {
    /// Open the pack belonging to an `.idx` file
    pub fn open(index_path: &Path) -> anyhow::Result<Self> {
        let index = PackIndex::open(index_path)?;
        let path = index_path.with_extension("pack").into_boxed_path();

        let mut file = File::open(&path)
            .with_context(|| format!("Unable to open pack file {}", path.display()))?;
        let mut signature = [0u8; 4];
        file.read_exact(&mut signature)?;
        let version = file.read_u32::<BigEndian>()?;
        if &signature != PACK_SIGNATURE || !(2..=3).contains(&version) {
            anyhow::bail!("{} is not a version 2 or 3 pack file", path.display());
        }

        Ok(PackFile { path, index })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn index(&self) -> &PackIndex {
        &self.index
    }

    /// Read an object stored in this pack
    ///
    /// `load_external` resolves `REF_DELTA` bases that live outside this pack
    /// (thin packs completed with loose objects, or other packs).
    ///
    /// # Returns
    ///
    /// `None` when the pack does not contain the object
    pub fn read_object<F>(
        &self,
        object_id: &ObjectId,
        load_external: F,
    ) -> anyhow::Result<Option<RawObject>>
    where
        F: Fn(&ObjectId) -> anyhow::Result<RawObject>,
    {
        let Some(offset) = self.index.find_offset(object_id) else {
            return Ok(None);
        };

        self.read_at(offset, load_external)
            .with_context(|| format!("Unable to read {} from {}", object_id, self.path.display()))
            .map(Some)
    }

    fn read_at<F>(&self, offset: u64, load_external: F) -> anyhow::Result<RawObject>
    where
        F: Fn(&ObjectId) -> anyhow::Result<RawObject>,
    {
        let mut reader = BufReader::new(File::open(&self.path)?);
        let mut deltas = Vec::new();
        let mut offset = offset;

        let base = loop {
            if deltas.len() > MAX_DELTA_CHAIN {
                anyhow::bail!("delta chain longer than {} entries", MAX_DELTA_CHAIN);
            }

            let entry = Self::read_entry(&mut reader, offset)?;
            match entry.kind {
                EntryKind::Object(object_type) => {
                    break RawObject::new(object_type, entry.data.into());
                }
                EntryKind::OfsDelta { base_offset } => {
                    deltas.push(entry.data);
                    offset = base_offset;
                }
                EntryKind::RefDelta { base_oid } => {
                    deltas.push(entry.data);
                    match self.index.find_offset(&base_oid) {
                        Some(base_offset) => offset = base_offset,
                        None => break load_external(&base_oid)?,
                    }
                }
            }
        };

        deltas.iter().rev().try_fold(base, |object, delta| {
            let content = apply_delta(object.content(), delta)?;
            Ok(RawObject::new(object.kind(), content.into()))
        })
    }

    fn read_entry(reader: &mut BufReader<File>, offset: u64) -> anyhow::Result<PackEntry> {
        reader.seek(SeekFrom::Start(offset))?;

        let mut byte = reader.read_u8()?;
        let type_id = (byte >> 4) & 0x07;
        let mut size = (byte & 0x0f) as u64;
        let mut shift = 4u32;
        while byte & 0x80 != 0 {
            byte = reader.read_u8()?;
            let bits = (byte & 0x7f) as u64;
            size |= bits
                .checked_shl(shift)
                .filter(|shifted| shifted >> shift == bits)
                .with_context(|| format!("pack entry size overflows at {}", offset))?;
            shift += 7;
        }
        let size = usize::try_from(size)
            .with_context(|| format!("pack entry size {} too large at {}", size, offset))?;

        let kind = match type_id {
            OFS_DELTA => {
                let distance = Self::read_base_distance(reader)?;
                let base_offset = offset
                    .checked_sub(distance)
                    .with_context(|| format!("delta base before start of pack at {}", offset))?;
                EntryKind::OfsDelta { base_offset }
            }
            REF_DELTA => EntryKind::RefDelta {
                base_oid: ObjectId::read_h40_from(reader)?,
            },
            other => EntryKind::Object(
                ObjectType::from_pack_type(other)
                    .with_context(|| format!("invalid pack entry type {} at {}", other, offset))?,
            ),
        };

        let data = Self::inflate(reader, size)?;

        Ok(PackEntry { kind, data })
    }

    /// Decode the offset encoding of `OFS_DELTA` bases
    ///
    /// Each continuation adds one before shifting, so that every distance has
    /// exactly one encoding.
    fn read_base_distance(reader: &mut impl Read) -> anyhow::Result<u64> {
        let mut byte = reader.read_u8()?;
        let mut distance = (byte & 0x7f) as u64;
        while byte & 0x80 != 0 {
            byte = reader.read_u8()?;
            distance = distance
                .checked_add(1)
                .filter(|next| next.leading_zeros() >= 7)
                .map(|next| (next << 7) | (byte & 0x7f) as u64)
                .context("delta base distance overflows")?;
        }
        Ok(distance)
    }

    fn inflate(reader: &mut impl BufRead, size: usize) -> anyhow::Result<Vec<u8>> {
        let decoder = flate2::bufread::ZlibDecoder::new(reader);
        let mut data = Vec::with_capacity(size.min(MAX_PREALLOCATION));
        decoder
            .take(size as u64)
            .read_to_end(&mut data)
            .context("Unable to decompress pack entry")?;

        if data.len() != size {
            anyhow::bail!("pack entry inflated to {} bytes, expected {}", data.len(), size);
        }

        Ok(data)
    }
}
