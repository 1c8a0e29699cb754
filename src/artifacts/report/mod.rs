//! Report rendering
//!
//! - `table`: grid tables
//! - `views`: the current-state and recommended-checkout tables

pub mod table;
pub mod views;
