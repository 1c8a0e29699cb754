//! Pack file support
//!
//! Most objects of a real-world repository live in pack files rather than in
//! loose object files: `git gc`, `git clone` and `git fetch` all produce packs.
//!
//! - `index`: `.idx` lookup tables mapping object ids to pack offsets
//! - `delta`: the copy/insert instruction format of deltified entries
//! - `reader`: decoding of `.pack` entries, resolving delta chains
//!
//! ## Entry Types
//!
//! | id | type        | payload                                     |
//! |----|-------------|---------------------------------------------|
//! | 1  | commit      | zlib content                                |
//! | 2  | tree        | zlib content                                |
//! | 3  | blob        | zlib content                                |
//! | 4  | tag         | zlib content                                |
//! | 6  | `OFS_DELTA` | negative offset of the base, zlib delta     |
//! | 7  | `REF_DELTA` | 20-byte id of the base, zlib delta          |

pub mod delta;
pub mod index;
pub mod reader;

/// Pack entry type of a delta against a base at a relative offset
pub const OFS_DELTA: u8 = 6;

/// Pack entry type of a delta against a base named by its object id
pub const REF_DELTA: u8 = 7;

/// Upper bound on delta chain length, guarding against cyclic or corrupt packs
pub const MAX_DELTA_CHAIN: usize = 10_000;

/// Upper bound on ref-delta bases resolved outside the pack that needs them
pub const MAX_EXTERNAL_BASES: usize = 64;

/// Largest buffer reserved up front from a size declared inside a pack
///
/// Declared sizes are untrusted; buffers beyond this grow with the data actually decoded.
pub const MAX_PREALLOCATION: usize = 64 * 1024;
