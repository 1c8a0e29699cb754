use crate::areas::repository::{Repository, RepositoryError};
use crate::artifacts::ancestry::{AncestryWalker, WalkMode, WalkOutcome};
use crate::artifacts::audit::dispatcher::Consume;
use crate::artifacts::audit::entry_log::EntryLog;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use chrono::{DateTime, FixedOffset, TimeDelta};
use std::path::{Path, PathBuf};

/// A commit as shown in the reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    pub oid: ObjectId,
    pub author: String,
    pub timestamp: DateTime<FixedOffset>,
    /// Commit time minus cutoff; positive means the commit is too recent
    pub delta: TimeDelta,
}

impl CommitSummary {
    fn new(oid: ObjectId, commit: &Commit, cutoff: DateTime<FixedOffset>) -> Self {
        CommitSummary {
            oid,
            author: commit.author().display_name(),
            timestamp: commit.timestamp(),
            delta: commit.timestamp() - cutoff,
        }
    }

    pub fn is_compliant(&self) -> bool {
        self.delta <= TimeDelta::zero()
    }
}

/// Outcome of auditing a valid repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryAudit {
    pub branch: BranchName,
    pub current: CommitSummary,
    pub recommended: CommitSummary,
    pub ancestry_count: usize,
    pub excluded_count: usize,
    pub outcome: WalkOutcome,
}

impl EntryAudit {
    /// Whether checking out the recommendation would change anything
    pub fn recommends_change(&self) -> bool {
        self.current.oid != self.recommended.oid
    }

    pub fn is_degraded(&self) -> bool {
        self.outcome == WalkOutcome::NoCompliantAncestor
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState {
    Unprocessed,
    Valid(Box<EntryAudit>),
    Invalid,
}

/// One candidate directory of an audit run
///
/// Built once per discovered path and consumed once by whichever worker pops
/// it; read-only afterwards.
#[derive(Debug, Clone)]
pub struct RepoEntry {
    path: PathBuf,
    name: String,
    cutoff: DateTime<FixedOffset>,
    branch: Option<BranchName>,
    state: EntryState,
    log: EntryLog,
}

impl RepoEntry {
    pub fn new(path: &Path, cutoff: DateTime<FixedOffset>, branch: Option<BranchName>) -> Self {
        let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

        RepoEntry {
            name: Self::display_name(&path),
            path,
            cutoff,
            branch,
            state: EntryState::Unprocessed,
            log: EntryLog::default(),
        }
    }

    fn display_name(path: &Path) -> String {
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cutoff(&self) -> DateTime<FixedOffset> {
        self.cutoff
    }

    pub fn state(&self) -> &EntryState {
        &self.state
    }

    pub fn log(&self) -> &EntryLog {
        &self.log
    }

    pub fn is_processed(&self) -> bool {
        self.state != EntryState::Unprocessed
    }

    pub fn is_valid(&self) -> bool {
        matches!(self.state, EntryState::Valid(_))
    }

    pub fn audit(&self) -> Option<&EntryAudit> {
        match &self.state {
            EntryState::Valid(audit) => Some(audit.as_ref()),
            _ => None,
        }
    }

    /// Point the entry at another directory; the next `consume` starts over
    pub fn relocate(&mut self, path: &Path) {
        let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        self.name = Self::display_name(&path);
        self.path = path;
        self.state = EntryState::Unprocessed;
        self.log = EntryLog::default();
    }

    /// Audit the repository, once
    ///
    /// Every failure ends in [`EntryState::Invalid`] with the reason logged;
    /// nothing propagates to the caller.
    pub fn consume(&mut self, mode: WalkMode) {
        if self.is_processed() {
            return;
        }

        self.state = match self.run_audit(mode) {
            Ok(audit) => EntryState::Valid(Box::new(audit)),
            Err(error) => {
                match error.downcast_ref::<RepositoryError>() {
                    Some(expected) => self.log.info(format!("skipped: {}", expected)),
                    None => self.log.warn(format!("unable to audit: {:#}", error)),
                }
                EntryState::Invalid
            }
        };
    }

    fn run_audit(&mut self, mode: WalkMode) -> anyhow::Result<EntryAudit> {
        let repository = Repository::open(&self.path)?;

        let (current_oid, current_commit) = repository.current_commit()?;
        let current = CommitSummary::new(current_oid, &current_commit, self.cutoff);
        self.log.info(format!(
            "checked out at {} from {} ({})",
            current.oid.to_report_oid(),
            current_commit.committer().readable_timestamp(),
            current_commit.short_message()
        ));

        let active = repository.active_branch(self.branch.as_ref())?;
        let walker = AncestryWalker::new(|oid: &ObjectId| repository.database().load_slim_commit(oid));
        let walk = walker.walk(&active.tip, self.cutoff, mode)?;
        self.log.info(format!(
            "branch '{}' has {} commits: {} up to the recommended one, {} after it",
            active.name,
            walk.ancestry_count,
            walk.included_count(),
            walk.excluded_count
        ));

        let recommended_commit = repository.database().load_commit(&walk.recommended.oid)?;
        let recommended =
            CommitSummary::new(walk.recommended.oid.clone(), &recommended_commit, self.cutoff);

        match walk.outcome {
            WalkOutcome::NoCompliantAncestor => self.log.warn(format!(
                "no commit at or before the cutoff; falling back to root commit {}",
                recommended.oid.to_report_oid()
            )),
            _ => self.log.info(format!(
                "recommended {} from {}",
                recommended.oid.to_report_oid(),
                recommended_commit.committer().readable_timestamp()
            )),
        }

        Ok(EntryAudit {
            branch: active.name,
            current,
            recommended,
            ancestry_count: walk.ancestry_count,
            excluded_count: walk.excluded_count,
            outcome: walk.outcome,
        })
    }

    /// Check the repository out at the recommended commit by detaching HEAD
    pub fn apply_recommended_checkout(&self) -> anyhow::Result<()> {
        let audit = self
            .audit()
            .ok_or_else(|| anyhow::anyhow!("{} has no recommendation", self.name))?;

        Repository::open(&self.path)?.detach_head(&audit.recommended.oid)
    }
}

impl Consume for RepoEntry {
    fn consume(&mut self, mode: WalkMode) {
        RepoEntry::consume(self, mode)
    }

    fn abandon(&mut self, reason: &str) {
        self.log.warn(format!("audit aborted: {}", reason));
        self.state = EntryState::Invalid;
    }
}
