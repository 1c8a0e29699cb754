use assert_cmd::Command;
use assert_fs::TempDir;
use rstest::fixture;
use std::path::Path;

#[fixture]
pub fn source_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

pub fn run_cutoff_command(source: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("repo-cutoff").expect("Failed to find repo-cutoff binary");
    cmd.env_remove("REPO_CUTOFF_SOURCE");
    cmd.env_remove("REPO_CUTOFF_DATE");
    cmd.env_remove("RUST_LOG");
    cmd.arg("--no-color").arg("--source").arg(source);
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

pub fn run_git_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(dir);
    cmd.envs(vec![
        ("GIT_AUTHOR_NAME", "fake_user"),
        ("GIT_AUTHOR_EMAIL", "fake_email@email.com"),
        ("GIT_COMMITTER_NAME", "fake_user"),
        ("GIT_COMMITTER_EMAIL", "fake_email@email.com"),
        ("GIT_CONFIG_NOSYSTEM", "1"),
        ("GIT_CONFIG_GLOBAL", "/dev/null"),
    ]);
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

pub fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

/// Raw content of HEAD, trimmed
pub fn read_head(repo: &Path) -> String {
    std::fs::read_to_string(repo.join(".git").join("HEAD"))
        .expect("Failed to read HEAD")
        .trim()
        .to_string()
}
