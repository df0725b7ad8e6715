use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use git_release_flow::cli::orchestration::{self, PublishArgs};
use git_release_flow::config;
use git_release_flow::git::{CliGateway, Git2Repository, Repository};
use git_release_flow::notify::ConsoleNotifier;
use git_release_flow::release::ReleaseFlow;
use git_release_flow::ui;

#[derive(Parser)]
#[command(
    name = "git-release-flow",
    version,
    about = "Merge feature branches into a shared release branch, one release at a time"
)]
struct Args {
    #[arg(short, long, global = true, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(short, long, global = true, help = "Log git commands and workflow steps")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Lock the release branch so nobody else releases concurrently
    Start,

    /// Merge the current branch into the release branch, tag and push
    Publish {
        #[arg(short, long, help = "Branch to merge into (default: configured release branch)")]
        target: Option<String>,

        #[arg(long, help = "Annotated tag to create after merging")]
        tag: Option<String>,

        #[arg(short, long, requires = "tag", help = "Tag message")]
        message: Option<String>,
    },

    /// Remove the release lock
    Unlock,

    /// Show the current branch and whether a release is in progress
    Status,

    /// Create a branch from master and push it
    NewBranch { name: String },

    /// Delete a branch locally and on the remote
    DeleteBranch {
        name: String,

        #[arg(short, long, help = "Skip the confirmation prompt")]
        yes: bool,
    },

    /// Rename a local branch
    RenameBranch { old: String, new: String },

    /// Write a default gitflow.toml and stage it
    InitConfig,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            ui::display_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: Args) -> Result<bool> {
    let repo = Git2Repository::open(".");
    let project_root = repo.as_ref().ok().map(|repo| repo.root());
    let config = config::load_config(args.config.as_deref(), project_root)
        .context("Error loading config")?;

    let repo = repo.context("Not inside a git working tree")?;
    let gateway = CliGateway::new(repo.root());
    let notifier = ConsoleNotifier;
    let mut flow = ReleaseFlow::new(&repo, &gateway, &notifier, &config);

    match args.command {
        Command::Start => orchestration::run_start(&flow),
        Command::Publish {
            target,
            tag,
            message,
        } => {
            let publish = PublishArgs {
                target,
                tag,
                message,
            };
            ui::display_status("Publishing...");
            let result = orchestration::run_publish(&mut flow, &publish)?;
            Ok(result.success())
        }
        Command::Unlock => orchestration::run_unlock(&flow),
        Command::Status => {
            ui::display_status("Fetching latest data from remote...");
            let status = orchestration::run_status(&flow)?;
            ui::display_lock_status(&status.project, status.branch.as_deref(), status.locked);
            Ok(true)
        }
        Command::NewBranch { name } => orchestration::run_new_branch(&flow, &name),
        Command::DeleteBranch { name, yes } => {
            let prompt = format!("Delete {} locally and on the remote?", name);
            if !yes && !ui::confirm_action(&prompt)? {
                println!("Operation cancelled by user.");
                return Ok(true);
            }
            orchestration::run_delete_branch(&flow, &name)
        }
        Command::RenameBranch { old, new } => orchestration::run_rename_branch(&flow, &old, &new),
        Command::InitConfig => {
            let path = orchestration::run_init_config(&flow)?;
            ui::display_success(&format!("Wrote {}", path.display()));
            Ok(true)
        }
    }
}
