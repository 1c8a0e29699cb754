use assert_fs::TempDir;
use predicates::prelude::*;
use repo_cutoff::areas::repository::Repository;
use repo_cutoff::artifacts::objects::object_id::ObjectId;
use rstest::{fixture, rstest};
use std::path::PathBuf;

mod common;

use common::command::{read_head, run_cutoff_command, source_dir};
use common::fixtures::{branch, linear_repository};

struct Workspace {
    source: TempDir,
    alpha: Vec<ObjectId>,
    beta: Vec<ObjectId>,
}

impl Workspace {
    fn repo(&self, name: &str) -> PathBuf {
        self.source.path().join(name)
    }
}

/// Two repositories, both past a cutoff of 7
#[fixture]
fn workspace(source_dir: TempDir) -> Workspace {
    let alpha = linear_repository(&source_dir.path().join("alpha"), &[1, 5, 10]);
    let beta = linear_repository(&source_dir.path().join("beta"), &[2, 6, 8, 9]);

    Workspace {
        source: source_dir,
        alpha,
        beta,
    }
}

#[rstest]
fn force_checks_out_every_recommendation(workspace: Workspace) {
    run_cutoff_command(workspace.source.path(), &["--cutoff", "@7", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[y]es").not())
        .stdout(predicate::str::contains(
            "Checkout: 2 applied, 0 skipped, 0 failed, 0 untouched.",
        ))
        .stdout(predicate::str::contains("Note: only HEAD was moved"));

    assert_eq!(read_head(&workspace.repo("alpha")), workspace.alpha[1].to_string());
    assert_eq!(read_head(&workspace.repo("beta")), workspace.beta[1].to_string());
}

#[rstest]
fn checkout_leaves_branches_in_place(workspace: Workspace) -> Result<(), Box<dyn std::error::Error>> {
    run_cutoff_command(workspace.source.path(), &["--cutoff", "@7", "--force"])
        .assert()
        .success();

    let repository = Repository::open(&workspace.repo("alpha"))?;
    assert_eq!(
        repository.refs().read_branch(&branch("main"))?,
        Some(workspace.alpha[2].clone())
    );

    // a second run sees the detached checkout as compliant
    run_cutoff_command(workspace.source.path(), &["--cutoff", "@7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("All repos comply with the cutoff."));

    Ok(())
}

#[rstest]
#[case("y\nn\n", true, false, "1 applied, 1 skipped")]
#[case("n\ny\n", false, true, "1 applied, 1 skipped")]
#[case("a\n", true, true, "2 applied, 0 skipped")]
#[case("q\n", false, false, "0 applied, 0 skipped, 0 failed, 2 untouched")]
#[case("", false, false, "0 applied, 0 skipped, 0 failed, 2 untouched")]
#[case("maybe\ny\nq\n", true, false, "1 applied, 0 skipped, 0 failed, 1 untouched")]
fn interactive_checkout_follows_answers(
    workspace: Workspace,
    #[case] answers: &str,
    #[case] alpha_moved: bool,
    #[case] beta_moved: bool,
    #[case] summary: &str,
) {
    run_cutoff_command(workspace.source.path(), &["--cutoff", "@7", "--checkout"])
        .write_stdin(answers)
        .assert()
        .success()
        .stdout(predicate::str::contains("[y]es / [n]o / [a]ll remaining / [q]uit"))
        .stdout(predicate::str::contains(summary));

    let expected_head = |moved: bool, oid: &ObjectId| {
        if moved {
            oid.to_string()
        } else {
            "ref: refs/heads/main".to_string()
        }
    };
    assert_eq!(
        read_head(&workspace.repo("alpha")),
        expected_head(alpha_moved, &workspace.alpha[1])
    );
    assert_eq!(
        read_head(&workspace.repo("beta")),
        expected_head(beta_moved, &workspace.beta[1])
    );
}

#[rstest]
fn invalid_answers_are_reported(workspace: Workspace) {
    run_cutoff_command(workspace.source.path(), &["--cutoff", "@7", "--checkout"])
        .write_stdin("sure\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "invalid selection 'sure': expected y, n, a or q",
        ))
        .stdout(predicate::str::contains("only HEAD was moved").not());

    assert_eq!(read_head(&workspace.repo("alpha")), "ref: refs/heads/main");
}

#[rstest]
fn compliant_repositories_are_not_offered(source_dir: TempDir) {
    let alpha = linear_repository(&source_dir.path().join("alpha"), &[1, 5, 10]);
    linear_repository(&source_dir.path().join("beta"), &[1, 2]);

    run_cutoff_command(source_dir.path(), &["--cutoff", "@7", "--checkout"])
        .write_stdin("y\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Check out beta").not())
        .stdout(predicate::str::contains(
            "Checkout: 1 applied, 0 skipped, 0 failed, 0 untouched.",
        ));

    assert_eq!(read_head(&source_dir.path().join("alpha")), alpha[1].to_string());
}
