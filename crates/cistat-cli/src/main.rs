//! cistat - CI status for git refs
//!
//! ## Commands
//!
//! - `status`: Show the combined CI status of a ref
//! - `refresh`: Drop cached statuses and fetch again
//! - `open`: Print the CI URL for a ref, choosing among several checks
//! - `resolve`: Show the remote ref a branch is checked against
//! - `last-ci-commit`: Show the newest commit not marked to skip CI

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};

use cistat_core::{
    format_entry, is_git_repo, most_recent_non_skip_commit, resolve_default_ref, summarize,
    Chooser, GitCli, GithubStatusClient, NavAction, NavTarget, StatusConfig, StatusReport,
    StatusService, Vcs, METRICS,
};

#[derive(Parser)]
#[command(name = "cistat")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Combined CI status for git refs", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Do not contact the remote unless a command forces it
    #[arg(long, global = true)]
    offline: bool,

    /// Repository to inspect (default: current directory)
    #[arg(short = 'C', long, global = true, default_value = ".")]
    repo: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the combined CI status of a ref
    Status {
        /// Revision to check (default: the current branch's remote ref)
        rev: Option<String>,

        /// List every individual check
        #[arg(short, long)]
        entries: bool,

        /// Print the raw report as JSON
        #[arg(long)]
        raw: bool,
    },

    /// Drop cached statuses and fetch again
    Refresh {
        /// Revision to check (default: the current branch's remote ref)
        rev: Option<String>,

        /// Fetch even in offline mode
        #[arg(short, long)]
        force: bool,
    },

    /// Print the CI URL for a ref
    Open {
        /// Revision to check (default: the current branch's remote ref)
        rev: Option<String>,

        /// URL already known to the caller; printed as is
        #[arg(long, conflicts_with = "rev")]
        url: Option<String>,
    },

    /// Show the remote ref a branch is checked against
    Resolve {
        /// Local branch (default: current branch)
        branch: Option<String>,
    },

    /// Show the newest commit not marked to skip CI
    LastCiCommit,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    cistat_core::init_tracing(cli.json, level);

    if !is_git_repo(&cli.repo) {
        bail!("{} is not inside a git work tree", cli.repo.display());
    }
    let vcs: Arc<dyn Vcs> = Arc::new(GitCli::new(&cli.repo));

    let result = match cli.command {
        Commands::Resolve { branch } => cmd_resolve(vcs.as_ref(), branch.as_deref()),
        Commands::LastCiCommit => cmd_last_ci_commit(vcs.as_ref()),
        Commands::Status { rev, entries, raw } => {
            let service = build_service(vcs, cli.offline)?;
            cmd_status(&service, rev.as_deref(), entries, raw).await
        }
        Commands::Refresh { rev, force } => {
            let service = build_service(vcs, cli.offline)?;
            cmd_refresh(&service, rev.as_deref(), force).await
        }
        Commands::Open { rev, url } => {
            let service = build_service(vcs, cli.offline)?;
            cmd_open(&service, rev.as_deref(), url).await
        }
    };

    if cli.verbose {
        METRICS.flush();
    }
    result
}

fn build_service(vcs: Arc<dyn Vcs>, offline: bool) -> Result<StatusService> {
    let mut config = StatusConfig::from_env();
    if offline {
        config = config.with_offline(true);
    }
    let api = GithubStatusClient::from_config(&config).context("Failed to create HTTP client")?;
    StatusService::from_config(vcs, Arc::new(api), &config)
        .context("Failed to set up CI status for this repository")
}

const UNAVAILABLE: &str =
    "CI status unavailable (disabled for this repository, rebase in progress, or offline)";

/// Render a report as the status header plus, optionally, one line per check.
fn render_report(report: &StatusReport, entries: bool) -> String {
    let display = summarize(report);
    let mut out = format!("CI: {}", display.detail);
    if entries && report.statuses.len() > 1 {
        for entry in &report.statuses {
            out.push_str(&format!("\n  {:<24} {}", entry.context, format_entry(entry)));
        }
    }
    out
}

async fn cmd_status(
    service: &StatusService,
    rev: Option<&str>,
    entries: bool,
    raw: bool,
) -> Result<()> {
    let git_ref = service.resolve_ref(rev)?;
    info!(repo = %service.repo(), git_ref = %git_ref, "checking CI status");

    match service.get_status(&git_ref).await? {
        Some(report) if raw => println!("{}", serde_json::to_string_pretty(&report)?),
        Some(report) => println!("{}", render_report(&report, entries)),
        None => eprintln!("{UNAVAILABLE}"),
    }
    Ok(())
}

async fn cmd_refresh(service: &StatusService, rev: Option<&str>, force: bool) -> Result<()> {
    let git_ref = service.resolve_ref(rev)?;
    match service.refresh(&git_ref, force).await? {
        Some(report) => println!("{}", render_report(&report, true)),
        None => eprintln!("{UNAVAILABLE}"),
    }
    Ok(())
}

/// Numbered prompt on stderr, answer read from stdin.
struct StdinChooser;

impl Chooser for StdinChooser {
    fn choose(&self, prompt: &str, options: &[String]) -> Option<usize> {
        let mut stderr = std::io::stderr();
        for (idx, option) in options.iter().enumerate() {
            writeln!(stderr, "{:>3}. {option}", idx + 1).ok()?;
        }
        write!(stderr, "{prompt}").ok()?;
        stderr.flush().ok()?;

        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line).ok()?;
        parse_choice(&line, options.len())
    }
}

/// 1-based answer to a 0-based index, `None` for anything out of range.
fn parse_choice(answer: &str, count: usize) -> Option<usize> {
    let n: usize = answer.trim().parse().ok()?;
    (1..=count).contains(&n).then(|| n - 1)
}

async fn cmd_open(service: &StatusService, rev: Option<&str>, url: Option<String>) -> Result<()> {
    let target = match url {
        Some(url) => NavTarget::Url(url),
        None => NavTarget::Ref(service.resolve_ref(rev)?),
    };
    match service.navigate(&target, &StdinChooser).await? {
        NavAction::Open(url) => println!("{url}"),
        NavAction::Cancelled => eprintln!("Cancelled"),
        NavAction::Suppressed => eprintln!("{UNAVAILABLE}"),
    }
    Ok(())
}

fn cmd_resolve(vcs: &dyn Vcs, branch: Option<&str>) -> Result<()> {
    let git_ref = resolve_default_ref(vcs, branch)
        .context("Cannot determine the remote ref; pass a revision explicitly")?;
    println!("{git_ref}");
    Ok(())
}

fn cmd_last_ci_commit(vcs: &dyn Vcs) -> Result<()> {
    match most_recent_non_skip_commit(vcs)? {
        Some(commit) => println!("{commit}"),
        None => eprintln!("Every commit is marked to skip CI"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cistat_core::StatusEntry;

    #[test]
    fn test_cli_parses_status_with_revision() {
        let cli = Cli::try_parse_from(["cistat", "status", "v1.2", "--entries"]).unwrap();
        match cli.command {
            Commands::Status { rev, entries, raw } => {
                assert_eq!(rev.as_deref(), Some("v1.2"));
                assert!(entries);
                assert!(!raw);
            }
            _ => panic!("expected status command"),
        }
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["cistat", "refresh", "--force", "--offline", "-C", "/tmp"])
            .unwrap();
        assert!(cli.offline);
        assert_eq!(cli.repo, PathBuf::from("/tmp"));
        assert!(matches!(cli.command, Commands::Refresh { force: true, .. }));
    }

    #[test]
    fn test_cli_open_rejects_rev_with_url() {
        assert!(Cli::try_parse_from(["cistat", "open", "main", "--url", "https://x"]).is_err());
    }

    #[test]
    fn test_render_report_lists_entries_for_many_checks() {
        let report = StatusReport::new(
            Some("failure"),
            vec![
                StatusEntry::new("success", "ci/build"),
                StatusEntry::new("failure", "ci/test").with_description("3 failed"),
            ],
        );
        let out = render_report(&report, true);
        assert!(out.starts_with("CI: Failure (1/2)"));
        assert!(out.contains("ci/test"));
        assert!(out.contains("Failure 3 failed"));
        assert_eq!(render_report(&report, false), "CI: Failure (1/2)");
    }

    #[test]
    fn test_render_single_check() {
        let report = StatusReport::new(
            Some("success"),
            vec![StatusEntry::new("success", "ci/build").with_description("All tests passed")],
        );
        assert_eq!(render_report(&report, true), "CI: Success All tests passed");
    }

    #[test]
    fn test_parse_choice_is_one_based() {
        assert_eq!(parse_choice("1\n", 3), Some(0));
        assert_eq!(parse_choice(" 3 ", 3), Some(2));
        assert_eq!(parse_choice("0", 3), None);
        assert_eq!(parse_choice("4", 3), None);
        assert_eq!(parse_choice("abc", 3), None);
    }
}
