use crate::artifacts::ancestry::WalkMode;
use crate::artifacts::audit::dispatcher::Dispatcher;
use crate::artifacts::audit::entry::{EntryAudit, RepoEntry};
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::cutoff::{CutoffResolver, DefaultPolicy};
use crate::artifacts::report::views;
use crate::commands::checkout::{CheckoutMode, CheckoutSummary, execute_checkouts};
use anyhow::Context;
use chrono::{DateTime, FixedOffset};
use std::cell::{RefCell, RefMut};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct AuditOptions {
    pub source: PathBuf,
    pub cutoff: Option<String>,
    pub policy: DefaultPolicy,
    pub branch: Option<BranchName>,
    pub mode: WalkMode,
    /// `None` runs one worker per available core
    pub workers: Option<usize>,
    pub checkout: Option<CheckoutMode>,
}

impl Default for AuditOptions {
    fn default() -> Self {
        AuditOptions {
            source: PathBuf::from("."),
            cutoff: None,
            policy: DefaultPolicy::Inherit,
            branch: None,
            mode: WalkMode::Cutoff,
            workers: None,
            checkout: None,
        }
    }
}

/// Entries of one run, in discovery order
#[derive(Debug)]
pub struct AuditReport {
    pub cutoff: DateTime<FixedOffset>,
    pub entries: Vec<RepoEntry>,
}

impl AuditReport {
    pub fn valid(&self) -> impl Iterator<Item = (&str, &EntryAudit)> {
        self.entries
            .iter()
            .filter_map(|entry| entry.audit().map(|audit| (entry.name(), audit)))
    }

    pub fn valid_count(&self) -> usize {
        self.valid().count()
    }

    /// Entries whose recommended commit is not the one checked out
    pub fn checkout_targets(&self) -> impl Iterator<Item = &RepoEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.audit().is_some_and(EntryAudit::recommends_change))
    }
}

/// Runs audits and writes their reports
pub struct Auditor {
    writer: RefCell<Box<dyn Write>>,
}

impl Auditor {
    pub fn new(writer: Box<dyn Write>) -> Self {
        Auditor {
            writer: RefCell::new(writer),
        }
    }

    pub fn writer(&'_ self) -> RefMut<'_, Box<dyn Write>> {
        self.writer.borrow_mut()
    }

    /// Audit, report and optionally check out, reading prompt answers from `input`
    pub async fn run<R: BufRead>(
        &self,
        options: &AuditOptions,
        mut input: R,
    ) -> anyhow::Result<Option<CheckoutSummary>> {
        let report = self.audit(options).await?;
        self.print_report(&report)?;

        let Some(mode) = options.checkout else {
            return Ok(None);
        };

        let mut writer = self.writer();
        let summary = execute_checkouts(report.checkout_targets(), mode, &mut input, &mut *writer)?;
        writeln!(writer, "{}", summary)?;
        if let Some(note) = summary.working_tree_note() {
            writeln!(writer, "{}", note)?;
        }
        tracing::info!(
            applied = summary.applied,
            skipped = summary.skipped,
            failed = summary.failed,
            untouched = summary.untouched,
            "checkout pass finished"
        );

        Ok(Some(summary))
    }

    pub async fn audit(&self, options: &AuditOptions) -> anyhow::Result<AuditReport> {
        let cutoff = CutoffResolver::from_clock(options.policy).resolve(options.cutoff.as_deref())?;
        tracing::info!("cutoff is {}", cutoff.to_rfc3339());

        let entries = Self::discover(&options.source, cutoff, options.branch.as_ref())?;
        tracing::info!(
            "found {} candidates in {}",
            entries.len(),
            options.source.display()
        );

        let dispatcher = match options.workers {
            Some(workers) => Dispatcher::new(workers),
            None => Dispatcher::with_available_parallelism(),
        };
        tracing::info!("auditing with up to {} workers", dispatcher.workers());
        let entries = dispatcher.dispatch(entries, options.mode).await?;

        for entry in &entries {
            entry.log().flush(entry.name());
        }

        let report = AuditReport { cutoff, entries };
        tracing::info!(
            "{} of {} candidates are valid repositories",
            report.valid_count(),
            report.entries.len()
        );

        Ok(report)
    }

    /// One entry per immediate child of `source`, sorted by name
    pub fn discover(
        source: &Path,
        cutoff: DateTime<FixedOffset>,
        branch: Option<&BranchName>,
    ) -> anyhow::Result<Vec<RepoEntry>> {
        if !source.is_dir() {
            anyhow::bail!("Source directory {} is not a directory", source.display());
        }

        WalkDir::new(source)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .map(|dir_entry| {
                let dir_entry = dir_entry
                    .with_context(|| format!("Unable to list {}", source.display()))?;
                Ok(RepoEntry::new(dir_entry.path(), cutoff, branch.cloned()))
            })
            .collect()
    }

    pub fn print_report(&self, report: &AuditReport) -> anyhow::Result<()> {
        let mut writer = self.writer();

        writeln!(writer, "Cutoff: {}", report.cutoff.format("%Y-%m-%d %H:%M:%S %z"))?;
        writeln!(writer)?;
        write!(writer, "{}", views::current_state_table(report.valid()))?;
        writeln!(writer)?;
        write!(writer, "{}", views::recommended_table(report.valid()))?;
        writeln!(writer)?;
        write!(
            writer,
            "{}",
            views::summary_line(report.entries.len(), report.valid_count())
        )?;
        writer.flush()?;

        Ok(())
    }
}
