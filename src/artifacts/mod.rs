//! Git data structures and audit algorithms
//!
//! - `ancestry`: first-parent walk selecting the cutoff-compliant commit
//! - `audit`: per-repository entries and the concurrent dispatcher
//! - `branch`: branch names and symbolic reference names
//! - `cutoff`: cutoff expression resolution
//! - `log`: first-parent history iteration
//! - `objects`: git object types (commit, raw objects, object ids)
//! - `pack`: pack file and pack index decoding
//! - `report`: grid tables and report views

pub mod ancestry;
pub mod audit;
pub mod branch;
pub mod cutoff;
pub mod log;
pub mod objects;
pub mod pack;
pub mod report;
