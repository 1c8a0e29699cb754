use anyhow::Result;
use clap::{ArgGroup, Parser};
use is_terminal::IsTerminal;
use repo_cutoff::artifacts::ancestry::WalkMode;
use repo_cutoff::artifacts::branch::branch_name::BranchName;
use repo_cutoff::artifacts::cutoff::DefaultPolicy;
use repo_cutoff::commands::audit::{AuditOptions, Auditor};
use repo_cutoff::commands::checkout::CheckoutMode;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(
    name = "repo-cutoff",
    version = "0.1.0",
    about = "Audit a directory of git checkouts against a cutoff date",
    long_about = "Every immediate child of the source directory is treated as a git repository. \
    For each one, the first-parent history of the active branch is walked to find the newest \
    commit at or before the cutoff, and the current and recommended commits are reported. \
    Optionally, the recommended commits are checked out (HEAD is detached at them).",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
",
    group(ArgGroup::new("workers").args(["threads", "single_thread"])),
    group(ArgGroup::new("apply").args(["checkout", "force"]))
)]
struct Cli {
    #[arg(
        long,
        visible_aliases = ["source-path", "dir", "repos"],
        env = "REPO_CUTOFF_SOURCE",
        default_value = ".",
        help = "Directory whose immediate children are audited"
    )]
    source: PathBuf,

    #[arg(
        long,
        visible_aliases = ["date", "cutoff-date"],
        env = "REPO_CUTOFF_DATE",
        help = "Cutoff date: now, @<unix>, RFC 3339, RFC 2822 or YYYY-MM-DD[ HH:MM[:SS]][±HH:MM]"
    )]
    cutoff: Option<String>,

    #[arg(
        long,
        visible_alias = "branch-name",
        value_parser = parse_branch,
        help = "Audit this branch instead of the checked-out one"
    )]
    branch: Option<BranchName>,

    #[arg(long, help = "Ignore the cutoff and recommend every repository's first commit")]
    first_commit: bool,

    #[arg(long, value_parser = clap::value_parser!(u16).range(1..), help = "Number of audit workers")]
    threads: Option<u16>,

    #[arg(
        long,
        visible_aliases = ["one-thread", "no-multithreading"],
        help = "Audit one repository at a time"
    )]
    single_thread: bool,

    #[arg(long, help = "Default unspecified time components to midnight instead of now")]
    midnight: bool,

    #[arg(long, help = "Ask, repository by repository, whether to check out the recommendation")]
    checkout: bool,

    #[arg(long, help = "Check out every recommendation without asking")]
    force: bool,

    #[arg(long, help = "Disable coloured output")]
    no_color: bool,

    #[arg(long, default_value = "info", help = "Log filter, e.g. warn or repo_cutoff=debug")]
    log_level: String,
}

fn parse_branch(name: &str) -> Result<BranchName, String> {
    BranchName::try_parse(name.to_string()).map_err(|error| error.to_string())
}

impl Cli {
    fn into_options(self) -> AuditOptions {
        AuditOptions {
            source: self.source,
            cutoff: self.cutoff,
            policy: if self.midnight {
                DefaultPolicy::Midnight
            } else {
                DefaultPolicy::Inherit
            },
            branch: self.branch,
            mode: if self.first_commit {
                WalkMode::FirstCommit
            } else {
                WalkMode::Cutoff
            },
            workers: match (self.single_thread, self.threads) {
                (true, _) => Some(1),
                (false, threads) => threads.map(usize::from),
            },
            checkout: match (self.force, self.checkout) {
                (true, _) => Some(CheckoutMode::Force),
                (false, true) => Some(CheckoutMode::Interactive),
                (false, false) => None,
            },
        }
    }
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    if cli.no_color || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let options = cli.into_options();
    let auditor = Auditor::new(Box::new(std::io::stdout()));

    match auditor.run(&options, std::io::stdin().lock()).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {:#}", error);
            ExitCode::FAILURE
        }
    }
}
