//! Cutoff-compliant commit selection
//!
//! The walker follows the first-parent chain of a branch tip down to its root
//! and picks the commit a repository should be checked out at:
//!
//! - in first-commit mode, the root
//! - the tip itself when it is already at or before the cutoff
//! - otherwise the newest ancestor at or before the cutoff
//! - failing that, the root, flagged as [`WalkOutcome::NoCompliantAncestor`]
//!
//! The chain is loaded once; counting and selection both reuse it.
//!
//! ```text
//!   tip                          root
//!   C4 ── C3 ── C2 ── C1 ── C0
//!   12    11    6     5     1       cutoff 7 => C2, excluded 2, count 5
//! ```
//!
//! ## Debug Logging
//!
//! Build with `--features debug_walk` to emit every visited commit as a `trace`
//! event, shown with `--log-level repo_cutoff=trace`.

use crate::artifacts::log::rev_list::RevList;
use crate::artifacts::objects::commit::SlimCommit;
use crate::artifacts::objects::object_id::ObjectId;
use chrono::{DateTime, FixedOffset};
use std::collections::HashSet;

macro_rules! debug_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "debug_walk")]
        {
            tracing::trace!($($arg)*);
        }
    };
}

/// What the walker is asked to select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalkMode {
    /// Newest commit at or before the cutoff
    #[default]
    Cutoff,
    /// Root commit, regardless of the cutoff
    FirstCommit,
}

/// How the recommended commit was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    FirstCommit,
    TipCompliant,
    AncestorCompliant,
    /// Nothing on the chain is compliant; the root is recommended anyway
    NoCompliantAncestor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestryWalk {
    pub recommended: SlimCommit,
    /// Commits on the first-parent chain, tip and root included
    pub ancestry_count: usize,
    /// Commits newer than the recommended one on the chain
    pub excluded_count: usize,
    pub outcome: WalkOutcome,
}

impl AncestryWalk {
    /// Commits from the recommended one down to the root
    pub fn included_count(&self) -> usize {
        self.ancestry_count - self.excluded_count
    }

    pub fn is_degraded(&self) -> bool {
        self.outcome == WalkOutcome::NoCompliantAncestor
    }
}

/// Walks first-parent chains through a commit loader
///
/// The loader abstracts the object database so the selection can be
/// exercised against in-memory histories.
#[derive(Debug, Clone)]
pub struct AncestryWalker<CommitLoaderFn>
where
    CommitLoaderFn: Fn(&ObjectId) -> anyhow::Result<SlimCommit>,
{
    commit_loader: CommitLoaderFn,
}

impl<CommitLoaderFn> AncestryWalker<CommitLoaderFn>
where
    CommitLoaderFn: Fn(&ObjectId) -> anyhow::Result<SlimCommit>,
{
    pub fn new(commit_loader: CommitLoaderFn) -> Self {
        Self { commit_loader }
    }

    /// Select the recommended commit for the history ending at `tip`
    ///
    /// A commit is compliant when its timestamp is at or before `cutoff`.
    pub fn walk(
        &self,
        tip: &ObjectId,
        cutoff: DateTime<FixedOffset>,
        mode: WalkMode,
    ) -> anyhow::Result<AncestryWalk> {
        let chain = self.load_chain(tip)?;
        let ancestry_count = chain.len();
        debug_log!("chain of {} has {} commits", tip, ancestry_count);

        let (index, outcome) = match mode {
            WalkMode::FirstCommit => (ancestry_count - 1, WalkOutcome::FirstCommit),
            WalkMode::Cutoff if chain[0].timestamp <= cutoff => (0, WalkOutcome::TipCompliant),
            WalkMode::Cutoff => match chain
                .iter()
                .position(|commit| commit.timestamp <= cutoff)
            {
                Some(index) => (index, WalkOutcome::AncestorCompliant),
                None => (ancestry_count - 1, WalkOutcome::NoCompliantAncestor),
            },
        };
        debug_log!("selected {} at depth {} ({:?})", chain[index].oid, index, outcome);

        let recommended = chain.into_iter().nth(index).ok_or_else(|| {
            anyhow::anyhow!("commit chain of {} shrank during selection", tip)
        })?;

        Ok(AncestryWalk {
            recommended,
            ancestry_count,
            excluded_count: index,
            outcome,
        })
    }

    /// Load the first-parent chain, tip first
    fn load_chain(&self, tip: &ObjectId) -> anyhow::Result<Vec<SlimCommit>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();

        for commit in RevList::new(&self.commit_loader, tip.clone()) {
            let commit = commit?;
            if !seen.insert(commit.oid.clone()) {
                anyhow::bail!("history of {} loops back to {}", tip, commit.oid);
            }

            debug_log!("visit {} at {}", commit.oid, commit.timestamp);
            chain.push(commit);
        }

        Ok(chain)
    }
}
