//! Core repository components
//!
//! - `database`: object database reading loose and packed objects
//! - `refs`: reference management (branches, HEAD, packed-refs)
//! - `repository`: repository discovery, active branch resolution and checkout

pub mod database;
pub mod refs;
pub mod repository;
