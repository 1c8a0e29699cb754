//! Delta instruction decoding
//!
//! A delta starts with two little-endian base-128 varints (base size, result
//! size) followed by instructions:
//!
//! - `1xxxxxxx`: copy. The low four bits select which offset bytes follow, the
//!   next three bits which size bytes follow. A size of zero means `0x10000`.
//! - `0xxxxxxx` (non-zero): insert the next `x` bytes literally.
//! - `00000000`: reserved, rejected.

use crate::artifacts::pack::MAX_PREALLOCATION;
use anyhow::Context;

const COPY_FLAG: u8 = 0x80;
const DEFAULT_COPY_SIZE: usize = 0x10000;

/// Apply a delta to its base object content
pub fn apply_delta(base: &[u8], delta: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut position = 0;

    let base_size = read_size(delta, &mut position)?;
    if base_size != base.len() {
        anyhow::bail!(
            "delta base size mismatch: expected {}, got {}",
            base_size,
            base.len()
        );
    }
    let result_size = read_size(delta, &mut position)?;
    let mut result = Vec::with_capacity(result_size.min(MAX_PREALLOCATION));

    while position < delta.len() {
        let opcode = delta[position];
        position += 1;

        if opcode & COPY_FLAG != 0 {
            let mut offset = 0usize;
            for bit in 0..4 {
                if opcode & (1 << bit) != 0 {
                    offset |= (next_byte(delta, &mut position)? as usize) << (8 * bit);
                }
            }
            let mut size = 0usize;
            for bit in 0..3 {
                if opcode & (1 << (4 + bit)) != 0 {
                    size |= (next_byte(delta, &mut position)? as usize) << (8 * bit);
                }
            }
            if size == 0 {
                size = DEFAULT_COPY_SIZE;
            }

            let chunk = offset
                .checked_add(size)
                .and_then(|end| base.get(offset..end))
                .with_context(|| {
                    format!("delta copy {}+{} outside base of {}", offset, size, base.len())
                })?;
            result.extend_from_slice(chunk);
        } else if opcode != 0 {
            let size = opcode as usize;
            let chunk = delta
                .get(position..position + size)
                .context("delta insert runs past the end of the delta")?;
            result.extend_from_slice(chunk);
            position += size;
        } else {
            anyhow::bail!("reserved delta opcode 0");
        }
    }

    if result.len() != result_size {
        anyhow::bail!(
            "delta result size mismatch: expected {}, got {}",
            result_size,
            result.len()
        );
    }

    Ok(result)
}

fn next_byte(data: &[u8], position: &mut usize) -> anyhow::Result<u8> {
    let byte = *data.get(*position).context("truncated delta")?;
    *position += 1;
    Ok(byte)
}

fn read_size(data: &[u8], position: &mut usize) -> anyhow::Result<usize> {
    let mut size = 0usize;
    let mut shift = 0u32;

    loop {
        let byte = next_byte(data, position)?;
        let bits = (byte & 0x7f) as usize;
        size |= bits
            .checked_shl(shift)
            .filter(|shifted| shifted >> shift == bits)
            .context("delta size varint overflow")?;
        shift += 7;

        if byte & 0x80 == 0 {
            return Ok(size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn copies_and_inserts() {
        let base = b"hello world";
        // base 11, result 11, copy 6 bytes at 0, insert "rust!"
        let delta = [11, 11, 0x90, 6, 5, b'r', b'u', b's', b't', b'!'];

        let result = apply_delta(base, &delta).unwrap();

        assert_eq!(result, b"hello rust!".to_vec());
    }

    #[test]
    fn copy_with_offset_and_multibyte_size() {
        let base = vec![7u8; 300];
        // copy 0x0102 = 258 bytes from offset 4: offset byte 0, size bytes 0 and 1
        let delta = [0xac, 0x02, 0x82, 0x02, 0xb1, 4, 0x02, 0x01];

        let result = apply_delta(&base, &delta).unwrap();

        assert_eq!(result.len(), 258);
    }

    #[test]
    fn rejects_base_size_mismatch() {
        assert!(apply_delta(b"abc", &[4, 1, 1, b'x']).is_err());
    }

    #[test]
    fn rejects_copy_outside_base() {
        assert!(apply_delta(b"abc", &[3, 4, 0x90 | 0x01, 1, 4]).is_err());
    }

    #[test]
    fn rejects_overflowing_size_varint() {
        let mut delta = vec![0xff; 12];
        delta.push(0x01);

        assert!(apply_delta(b"", &delta).is_err());
    }

    #[test]
    fn huge_declared_result_size_is_an_error() {
        // base 3, result 2^56, insert "x"
        let delta = [3, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01, 1, b'x'];

        assert!(apply_delta(b"abc", &delta).is_err());
    }

    #[test]
    fn rejects_reserved_opcode() {
        assert!(apply_delta(b"abc", &[3, 0, 0]).is_err());
    }
}
