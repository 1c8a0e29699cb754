//! Git object types and operations
//!
//! Git stores all content as objects identified by SHA-1 hashes. The auditor
//! only interprets commits; the other types are carried as raw content:
//!
//! - **Commit**: Snapshot with metadata (author, message, parent commits, tree)
//! - **Blob**, **Tree**, **Tag**: kept as [`object::RawObject`]
//!
//! All objects implement serialization/deserialization for the Git object format:
//! `<type> <size>\0<content>`

pub mod commit;
pub mod object;
pub mod object_id;
pub mod object_type;

/// Length of a SHA-1 hash in hexadecimal format
pub const OBJECT_ID_LENGTH: usize = 40;

/// Length of a SHA-1 hash in binary format
pub const RAW_OBJECT_ID_LENGTH: usize = 20;
