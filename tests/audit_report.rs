use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use predicates::prelude::*;
use repo_cutoff::areas::repository::Repository;
use rstest::rstest;
use std::path::Path;

mod common;

use common::command::{run_cutoff_command, source_dir};
use common::fixtures::{extend_branch, linear_repository};

#[rstest]
fn reports_current_and_recommended_commits(
    source_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let alpha = linear_repository(&source_dir.path().join("alpha"), &[1, 5, 10]);
    let beta = linear_repository(&source_dir.path().join("beta"), &[1, 2]);
    source_dir.child("notes").create_dir_all()?;
    source_dir.child("readme.txt").write_str("not a repository")?;

    let output = run_cutoff_command(source_dir.path(), &["--cutoff", "@7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Current state; 2 valid repos:"))
        .stdout(predicate::str::contains("Recommended checkouts:"))
        .stdout(predicate::str::contains(
            "Checked 4 candidates: 2 valid, 2 invalid.",
        ));

    let stdout = String::from_utf8(output.get_output().stdout.clone())?;
    let (current, recommended) = stdout
        .split_once("Recommended checkouts:")
        .ok_or("missing recommended table")?;

    assert!(current.contains(&alpha[2].to_report_oid()));
    assert!(current.contains(&beta[1].to_report_oid()));
    assert!(!current.contains("notes"));

    // only alpha is past the cutoff
    assert!(recommended.contains(&alpha[1].to_report_oid()));
    assert!(!recommended.contains("beta"));

    // rows follow directory order
    let alpha_row = current.find("| alpha").ok_or("missing alpha row")?;
    let beta_row = current.find("| beta").ok_or("missing beta row")?;
    assert!(alpha_row < beta_row);

    Ok(())
}

#[rstest]
fn counts_total_and_excluded_commits(source_dir: TempDir) -> Result<(), Box<dyn std::error::Error>> {
    linear_repository(&source_dir.path().join("alpha"), &[1, 5, 10]);

    run_cutoff_command(source_dir.path(), &["--cutoff", "@7"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"\| alpha \|\s+3 \|\s+1 \|")?);

    Ok(())
}

#[rstest]
fn falls_back_to_root_when_nothing_complies(
    source_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let oids = linear_repository(&source_dir.path().join("alpha"), &[100, 500, 1000]);

    run_cutoff_command(source_dir.path(), &["--cutoff", "@0"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "{} (no compliant commit)",
            oids[0].to_report_oid()
        )))
        .stderr(predicate::str::contains("no commit at or before the cutoff"));

    Ok(())
}

#[rstest]
fn nothing_to_recommend_when_everything_complies(
    source_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    linear_repository(&source_dir.path().join("alpha"), &[1, 5, 10]);
    linear_repository(&source_dir.path().join("beta"), &[3]);

    run_cutoff_command(source_dir.path(), &["--cutoff", "@10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("All repos comply with the cutoff."))
        .stdout(predicate::str::contains("Recommended checkouts:").not());

    Ok(())
}

#[rstest]
fn first_commit_mode_recommends_roots(source_dir: TempDir) -> Result<(), Box<dyn std::error::Error>> {
    let oids = linear_repository(&source_dir.path().join("alpha"), &[1, 5, 10]);

    run_cutoff_command(source_dir.path(), &["--first-commit", "--cutoff", "@100"])
        .assert()
        .success()
        .stdout(predicate::str::contains(oids[0].to_report_oid()))
        .stdout(predicate::str::is_match(r"\| alpha \|\s+3 \|\s+2 \|")?);

    Ok(())
}

#[rstest]
fn designated_branch_is_audited(source_dir: TempDir) -> Result<(), Box<dyn std::error::Error>> {
    let repo = source_dir.path().join("alpha");
    let main = linear_repository(&repo, &[1, 5, 10]);
    let repository = Repository::open(&repo)?;
    let feature = extend_branch(&repository, "feature", Some(main[0].clone()), &[3, 20]);

    run_cutoff_command(source_dir.path(), &["--cutoff", "@7", "--branch", "feature"])
        .assert()
        .success()
        .stdout(predicate::str::contains(feature[0].to_report_oid()))
        .stdout(predicate::str::contains(main[1].to_report_oid()).not());

    Ok(())
}

#[rstest]
fn unknown_branch_makes_repositories_invalid(
    source_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    linear_repository(&source_dir.path().join("alpha"), &[1, 5, 10]);

    run_cutoff_command(source_dir.path(), &["--cutoff", "@7", "--branch", "nope"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Current state; 0 valid repos:"))
        .stderr(predicate::str::contains("no resolvable active branch"));

    Ok(())
}

#[rstest]
fn detached_head_audits_the_default_branch(
    source_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let repo = source_dir.path().join("alpha");
    let oids = linear_repository(&repo, &[1, 5, 10]);
    Repository::open(&repo)?.detach_head(&oids[0])?;

    // checked out at the root, but main's history is what gets walked
    run_cutoff_command(source_dir.path(), &["--cutoff", "@7"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"\| alpha \|\s+3 \|\s+1 \|")?)
        .stdout(predicate::str::contains(oids[1].to_report_oid()));

    Ok(())
}

#[rstest]
fn cutoff_can_come_from_the_environment(
    source_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    linear_repository(&source_dir.path().join("alpha"), &[1, 5, 10]);

    run_cutoff_command(source_dir.path(), &[])
        .env("REPO_CUTOFF_DATE", "@100")
        .assert()
        .success()
        .stdout(predicate::str::contains("All repos comply with the cutoff."));

    Ok(())
}

#[rstest]
#[case("2024-01-15 12:00:00", "Cutoff: 2024-01-15 12:00:00 +0100")]
#[case("2024-07-15 12:00:00", "Cutoff: 2024-07-15 12:00:00 +0200")]
fn calendar_cutoff_uses_local_offset_of_that_date(
    source_dir: TempDir,
    #[case] cutoff: &str,
    #[case] expected: &str,
) {
    if !Path::new("/usr/share/zoneinfo/Europe/Berlin").exists() {
        return;
    }

    run_cutoff_command(source_dir.path(), &["--cutoff", cutoff])
        .env("TZ", "Europe/Berlin")
        .assert()
        .success()
        .stdout(predicate::str::contains(expected));
}

#[rstest]
#[case(&["--cutoff-date", "@7"])]
#[case(&["--date", "@7", "--one-thread"])]
#[case(&["--cutoff", "@7", "--no-multithreading", "--branch-name", "main"])]
fn long_option_aliases_are_accepted(source_dir: TempDir, #[case] args: &[&str]) {
    linear_repository(&source_dir.path().join("alpha"), &[1, 5, 10]);

    run_cutoff_command(source_dir.path(), args)
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"\| alpha \|\s+3 \|\s+1 \|").unwrap());
}

#[rstest]
fn source_path_alias_is_accepted(source_dir: TempDir) {
    linear_repository(&source_dir.path().join("alpha"), &[1, 5, 10]);

    Command::cargo_bin("repo-cutoff")
        .expect("Failed to find repo-cutoff binary")
        .env_remove("REPO_CUTOFF_SOURCE")
        .env_remove("REPO_CUTOFF_DATE")
        .args(["--no-color", "--cutoff", "@7", "--source-path"])
        .arg(source_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Current state; 1 valid repos:"));
}

#[rstest]
#[case("tomorrow-ish")]
#[case("2023-02-30")]
fn unparseable_cutoff_aborts(source_dir: TempDir, #[case] cutoff: &str) {
    run_cutoff_command(source_dir.path(), &["--cutoff", cutoff])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unable to parse cutoff"))
        .stdout(predicate::str::is_empty());
}

#[rstest]
fn missing_source_aborts(source_dir: TempDir) {
    run_cutoff_command(&source_dir.path().join("missing"), &[])
        .assert()
        .failure()
        .code(1);
}

#[rstest]
#[case(&["--threads", "2", "--single-thread"])]
#[case(&["--checkout", "--force"])]
#[case(&["--threads", "2", "--one-thread"])]
#[case(&["--threads", "0"])]
#[case(&["--branch", "bad..name"])]
fn conflicting_arguments_are_rejected(source_dir: TempDir, #[case] args: &[&str]) {
    run_cutoff_command(source_dir.path(), args)
        .assert()
        .failure()
        .code(2);
}
