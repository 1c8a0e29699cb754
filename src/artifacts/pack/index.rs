//! Pack index (`.idx`) parsing
//!
//! ## Version 2 layout
//!
//! ```text
//! \377tOc                      magic
//! 0x00000002                   version
//! 256 x u32                    fan-out: number of names whose first byte <= i
//! N x 20 bytes                 sorted object names
//! N x u32                      CRC32 of each packed entry
//! N x u32                      offsets; MSB set => index into the large offset table
//! M x u64                      large offsets
//! 20 + 20 bytes                pack checksum, index checksum
//! ```
//!
//! Version 1 has no header: the fan-out table is followed by N records of
//! `u32 offset` + `20-byte name`.

use crate::artifacts::objects::RAW_OBJECT_ID_LENGTH;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use std::path::Path;

const INDEX_MAGIC: [u8; 4] = [0xff, b't', b'O', b'c'];
const FAN_OUT_ENTRIES: usize = 256;
const LARGE_OFFSET_FLAG: u32 = 0x8000_0000;

#[derive(Debug, Clone)]
pub struct PackIndex {
    fan_out: [u32; FAN_OUT_ENTRIES],
    names: Vec<[u8; RAW_OBJECT_ID_LENGTH]>,
    offsets: Vec<u64>,
}

impl PackIndex {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read(path)
            .with_context(|| format!("Unable to read pack index {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Invalid pack index {}", path.display()))
    }

    pub fn parse(content: &[u8]) -> anyhow::Result<Self> {
        if content.starts_with(&INDEX_MAGIC) {
            let mut reader = Cursor::new(&content[INDEX_MAGIC.len()..]);
            let version = reader.read_u32::<BigEndian>()?;
            if version != 2 {
                anyhow::bail!("unsupported pack index version {}", version);
            }
            Self::parse_v2(&mut reader)
        } else {
            Self::parse_v1(&mut Cursor::new(content))
        }
    }

    fn read_fan_out(reader: &mut impl Read) -> anyhow::Result<[u32; FAN_OUT_ENTRIES]> {
        let mut fan_out = [0u32; FAN_OUT_ENTRIES];
        reader.read_u32_into::<BigEndian>(&mut fan_out)?;

        if fan_out.windows(2).any(|pair| pair[0] > pair[1]) {
            anyhow::bail!("fan-out table is not monotonic");
        }

        Ok(fan_out)
    }

    /// Reject an object count the remaining tables cannot hold
    fn ensure_room(reader: &Cursor<&[u8]>, count: usize, bytes_per_object: u64) -> anyhow::Result<()> {
        let remaining = (reader.get_ref().len() as u64).saturating_sub(reader.position());
        if count as u64 * bytes_per_object > remaining {
            anyhow::bail!(
                "fan-out declares {} objects but only {} bytes of tables follow",
                count,
                remaining
            );
        }
        Ok(())
    }

    fn parse_v2(reader: &mut Cursor<&[u8]>) -> anyhow::Result<Self> {
        let fan_out = Self::read_fan_out(reader)?;
        let count = fan_out[FAN_OUT_ENTRIES - 1] as usize;
        // name, CRC and small offset per object
        Self::ensure_room(reader, count, RAW_OBJECT_ID_LENGTH as u64 + 8)?;

        let mut names = vec![[0u8; RAW_OBJECT_ID_LENGTH]; count];
        for name in names.iter_mut() {
            reader.read_exact(name)?;
        }

        // CRCs are only needed when copying entries between packs
        let crc_table_size = count as u64 * 4;
        reader.set_position(reader.position() + crc_table_size);

        let mut small_offsets = vec![0u32; count];
        reader.read_u32_into::<BigEndian>(&mut small_offsets)?;

        let large_count = small_offsets
            .iter()
            .filter(|&&offset| offset & LARGE_OFFSET_FLAG != 0)
            .count();
        let mut large_offsets = vec![0u64; large_count];
        reader.read_u64_into::<BigEndian>(&mut large_offsets)?;

        let offsets = small_offsets
            .into_iter()
            .map(|offset| {
                if offset & LARGE_OFFSET_FLAG == 0 {
                    return Ok(offset as u64);
                }
                let large_index = (offset & !LARGE_OFFSET_FLAG) as usize;
                large_offsets
                    .get(large_index)
                    .copied()
                    .with_context(|| format!("large offset {} out of range", large_index))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(PackIndex {
            fan_out,
            names,
            offsets,
        })
    }

    fn parse_v1(reader: &mut Cursor<&[u8]>) -> anyhow::Result<Self> {
        let fan_out = Self::read_fan_out(reader)?;
        let count = fan_out[FAN_OUT_ENTRIES - 1] as usize;
        Self::ensure_room(reader, count, RAW_OBJECT_ID_LENGTH as u64 + 4)?;

        let mut names = Vec::with_capacity(count);
        let mut offsets = Vec::with_capacity(count);
        for _ in 0..count {
            offsets.push(reader.read_u32::<BigEndian>()? as u64);
            let mut name = [0u8; RAW_OBJECT_ID_LENGTH];
            reader.read_exact(&mut name)?;
            names.push(name);
        }

        Ok(PackIndex {
            fan_out,
            names,
            offsets,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Look up the pack offset of an object
    pub fn find_offset(&self, object_id: &ObjectId) -> Option<u64> {
        let raw = object_id.to_raw();
        let first = raw[0] as usize;

        let start = if first == 0 {
            0
        } else {
            self.fan_out[first - 1] as usize
        };
        let end = (self.fan_out[first] as usize).min(self.names.len());
        if start >= end {
            return None;
        }

        self.names[start..end]
            .binary_search(&raw)
            .ok()
            .map(|position| self.offsets[start + position])
    }

    pub fn contains(&self, object_id: &ObjectId) -> bool {
        self.find_offset(object_id).is_some()
    }
}
