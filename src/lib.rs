//! Audit a directory of git checkouts against a cutoff date
//!
//! Every immediate child of a source directory is treated as a candidate
//! repository. For each one the first-parent history of the active branch is
//! walked to find the newest commit at or before the cutoff; the results are
//! reported as tables and can be checked out, forcibly or interactively.

pub mod areas;
pub mod artifacts;
pub mod commands;
