//! Branch and reference names
//!
//! - `branch_name`: validated branch names and symbolic reference names

pub mod branch_name;

pub const INVALID_BRANCH_NAME_REGEX: &str =
    r"^\.|\/\.|\.\.|^\/|\/$|\.lock$|@\{|[\x00-\x20\*:\?\[\\~\^\x7f]";

/// Branch names tried, in order, when HEAD is detached and no branch is designated
pub const DEFAULT_BRANCH_NAMES: [&str; 2] = ["main", "master"];
