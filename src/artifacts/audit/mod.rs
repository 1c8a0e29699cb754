//! Auditing many repositories at once
//!
//! - `entry`: per-repository state machine and audit results
//! - `entry_log`: buffered per-entry diagnostics
//! - `queue`: the pop-only queue shared by the workers
//! - `dispatcher`: the worker pool consuming entries from the queue

pub mod dispatcher;
pub mod entry;
pub mod entry_log;
pub mod queue;
