//! Commit history traversal
//!
//! - `rev_list`: first-parent iteration from a commit down to the root

pub mod rev_list;
