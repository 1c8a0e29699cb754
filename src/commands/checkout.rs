//! Applying recommended checkouts
//!
//! Targets are visited in report order. In force mode every target is
//! applied; interactively each one is confirmed with
//!
//! ```text
//! [y]es / [n]o / [a]ll remaining / [q]uit
//! ```
//!
//! `a` applies the current target and every later one without asking, `q`
//! (or end of input) leaves the current target and every later one untouched.
//! A failed checkout is reported and counted; the pass carries on.

use crate::artifacts::audit::entry::RepoEntry;
use phf::phf_map;
use std::io::{BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("invalid selection '{0}': expected y, n, a or q")]
    InvalidSelection(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMode {
    Force,
    Interactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Yes,
    No,
    All,
    Quit,
}

static CHOICES: phf::Map<&'static str, Choice> = phf_map! {
    "y" => Choice::Yes,
    "yes" => Choice::Yes,
    "n" => Choice::No,
    "no" => Choice::No,
    "a" => Choice::All,
    "all" => Choice::All,
    "q" => Choice::Quit,
    "quit" => Choice::Quit,
};

impl TryFrom<&str> for Choice {
    type Error = CheckoutError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let value = value.trim();

        CHOICES
            .get(value.to_ascii_lowercase().as_str())
            .copied()
            .ok_or_else(|| CheckoutError::InvalidSelection(value.to_string()))
    }
}

/// Something the checkout pass can apply
pub trait CheckoutTarget {
    fn name(&self) -> &str;

    /// What applying it does, shown in the prompt
    fn describe(&self) -> String;

    fn apply(&self) -> anyhow::Result<()>;
}

impl CheckoutTarget for &RepoEntry {
    fn name(&self) -> &str {
        RepoEntry::name(self)
    }

    fn describe(&self) -> String {
        match self.audit() {
            Some(audit) => format!(
                "{} at {} ({})",
                RepoEntry::name(self),
                audit.recommended.oid.to_report_oid(),
                audit.recommended.timestamp.format("%Y-%m-%d %H:%M:%S %z")
            ),
            None => RepoEntry::name(self).to_string(),
        }
    }

    fn apply(&self) -> anyhow::Result<()> {
        self.apply_recommended_checkout()
    }
}

/// Printed after a pass that moved at least one HEAD
pub const WORKING_TREE_NOTE: &str = "Note: only HEAD was moved; working trees and indexes still \
hold the previous checkout (`git reset --hard` updates them, discarding local changes).";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckoutSummary {
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
    pub untouched: usize,
}

impl CheckoutSummary {
    pub fn working_tree_note(&self) -> Option<&'static str> {
        (self.applied > 0).then_some(WORKING_TREE_NOTE)
    }
}

impl std::fmt::Display for CheckoutSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Checkout: {} applied, {} skipped, {} failed, {} untouched.",
            self.applied, self.skipped, self.failed, self.untouched
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct PassState {
    force_remaining: bool,
    quit: bool,
    summary: CheckoutSummary,
}

/// Run the checkout pass over `targets`, reading answers from `input`
pub fn execute_checkouts<T, R, W>(
    targets: impl IntoIterator<Item = T>,
    mode: CheckoutMode,
    input: &mut R,
    output: &mut W,
) -> anyhow::Result<CheckoutSummary>
where
    T: CheckoutTarget,
    R: BufRead + ?Sized,
    W: Write + ?Sized,
{
    let initial = PassState {
        force_remaining: mode == CheckoutMode::Force,
        ..Default::default()
    };

    let state = targets
        .into_iter()
        .try_fold(initial, |mut state, target| -> anyhow::Result<PassState> {
            if state.quit {
                state.summary.untouched += 1;
                return Ok(state);
            }

            let choice = if state.force_remaining {
                Choice::Yes
            } else {
                prompt(&target, input, output)?
            };

            match choice {
                Choice::Yes => apply(&target, &mut state.summary, output)?,
                Choice::All => {
                    state.force_remaining = true;
                    apply(&target, &mut state.summary, output)?;
                }
                Choice::No => state.summary.skipped += 1,
                Choice::Quit => {
                    state.quit = true;
                    state.summary.untouched += 1;
                }
            }

            Ok(state)
        })?;

    Ok(state.summary)
}

/// Ask until a valid answer comes in; end of input means quit
fn prompt<T, R, W>(target: &T, input: &mut R, output: &mut W) -> anyhow::Result<Choice>
where
    T: CheckoutTarget,
    R: BufRead + ?Sized,
    W: Write + ?Sized,
{
    loop {
        write!(
            output,
            "Check out {}? [y]es / [n]o / [a]ll remaining / [q]uit: ",
            target.describe()
        )?;
        output.flush()?;

        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 {
            writeln!(output)?;
            return Ok(Choice::Quit);
        }

        match Choice::try_from(answer.as_str()) {
            Ok(choice) => return Ok(choice),
            Err(error) => writeln!(output, "{}", error)?,
        }
    }
}

fn apply<T, W>(target: &T, summary: &mut CheckoutSummary, output: &mut W) -> anyhow::Result<()>
where
    T: CheckoutTarget,
    W: Write + ?Sized,
{
    match target.apply() {
        Ok(()) => {
            summary.applied += 1;
            writeln!(output, "Checked out {}", target.describe())?;
        }
        Err(error) => {
            summary.failed += 1;
            tracing::warn!(repo = target.name(), "checkout failed: {:#}", error);
            writeln!(output, "Failed to check out {}: {}", target.name(), error)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::cell::RefCell;
    use std::io::Cursor;

    struct FakeTarget<'a> {
        name: &'static str,
        fails: bool,
        applied: &'a RefCell<Vec<&'static str>>,
    }

    impl CheckoutTarget for FakeTarget<'_> {
        fn name(&self) -> &str {
            self.name
        }

        fn describe(&self) -> String {
            self.name.to_string()
        }

        fn apply(&self) -> anyhow::Result<()> {
            if self.fails {
                anyhow::bail!("HEAD is locked");
            }
            self.applied.borrow_mut().push(self.name);
            Ok(())
        }
    }

    fn targets<'a>(
        names: &[&'static str],
        applied: &'a RefCell<Vec<&'static str>>,
    ) -> Vec<FakeTarget<'a>> {
        names
            .iter()
            .map(|&name| FakeTarget {
                name,
                fails: name.starts_with("broken"),
                applied,
            })
            .collect()
    }

    fn run(
        names: &[&'static str],
        mode: CheckoutMode,
        answers: &str,
    ) -> (CheckoutSummary, Vec<&'static str>, String) {
        let applied = RefCell::new(Vec::new());
        let mut input = Cursor::new(answers.as_bytes().to_vec());
        let mut output = Vec::new();

        let summary = execute_checkouts(targets(names, &applied), mode, &mut input, &mut output)
            .unwrap();

        (
            summary,
            applied.into_inner(),
            String::from_utf8(output).unwrap(),
        )
    }

    #[rstest]
    #[case("y", Choice::Yes)]
    #[case(" YES \n", Choice::Yes)]
    #[case("n\n", Choice::No)]
    #[case("All", Choice::All)]
    #[case("q", Choice::Quit)]
    fn parses_choices(#[case] input: &str, #[case] expected: Choice) {
        assert_eq!(Choice::try_from(input), Ok(expected));
    }

    #[rstest]
    #[case("")]
    #[case("maybe")]
    #[case("yn")]
    fn rejects_other_answers(#[case] input: &str) {
        assert!(matches!(
            Choice::try_from(input),
            Err(CheckoutError::InvalidSelection(_))
        ));
    }

    #[test]
    fn force_applies_everything_without_prompting() {
        let (summary, applied, output) = run(&["a", "b"], CheckoutMode::Force, "");

        assert_eq!(applied, vec!["a", "b"]);
        assert_eq!(summary.applied, 2);
        assert!(!output.contains("[y]es"));
        assert_eq!(summary.working_tree_note(), Some(WORKING_TREE_NOTE));
    }

    #[test]
    fn yes_and_no_are_per_repository() {
        let (summary, applied, _) = run(&["a", "b", "c"], CheckoutMode::Interactive, "y\nn\ny\n");

        assert_eq!(applied, vec!["a", "c"]);
        assert_eq!(
            summary,
            CheckoutSummary {
                applied: 2,
                skipped: 1,
                failed: 0,
                untouched: 0
            }
        );
    }

    #[test]
    fn all_applies_the_rest_without_asking() {
        let (summary, applied, output) =
            run(&["a", "b", "c"], CheckoutMode::Interactive, "n\na\n");

        assert_eq!(applied, vec!["b", "c"]);
        assert_eq!(summary.skipped, 1);
        assert_eq!(output.matches("[y]es").count(), 2);
    }

    #[test]
    fn quit_leaves_the_rest_untouched() {
        let (summary, applied, _) = run(&["a", "b", "c"], CheckoutMode::Interactive, "y\nq\n");

        assert_eq!(applied, vec!["a"]);
        assert_eq!(summary.untouched, 2);
    }

    #[test]
    fn end_of_input_quits() {
        let (summary, applied, _) = run(&["a", "b"], CheckoutMode::Interactive, "");

        assert!(applied.is_empty());
        assert_eq!(summary.untouched, 2);
        assert_eq!(summary.working_tree_note(), None);
    }

    #[test]
    fn invalid_answers_are_asked_again() {
        let (summary, applied, output) =
            run(&["a"], CheckoutMode::Interactive, "maybe\n\ny\n");

        assert_eq!(applied, vec!["a"]);
        assert_eq!(summary.applied, 1);
        assert_eq!(output.matches("invalid selection").count(), 2);
    }

    #[test]
    fn failures_are_counted_and_the_pass_goes_on() {
        let (summary, applied, output) = run(&["broken", "b"], CheckoutMode::Force, "");

        assert_eq!(applied, vec!["b"]);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.applied, 1);
        assert!(output.contains("Failed to check out broken"));
    }
}
