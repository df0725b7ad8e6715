//! Makes a target branch available locally before anything is merged into it.

use tracing::{debug, info};

use crate::domain::BranchExistence;
use crate::error::Result;
use crate::git::{CommandGateway, CommandOutcome, GitCommand, LineObserver, Repository};
use crate::remote::default_remote;

/// What the bootstrap step found and did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bootstrap {
    pub existence: BranchExistence,
    /// Outcome of the last command issued, `None` when nothing had to run
    pub outcome: Option<CommandOutcome>,
}

impl Bootstrap {
    /// True when no command ran or the last one succeeded
    pub fn succeeded(&self) -> bool {
        self.outcome.as_ref().map_or(true, |outcome| outcome.success)
    }
}

/// Classifies `target` as local, remote-only or missing.
pub fn classify(repo: &dyn Repository, target: &str) -> Result<BranchExistence> {
    let local = repo.local_branches()?;
    if local.iter().any(|b| b == target) {
        return Ok(BranchExistence::Local);
    }

    let remote = default_remote(repo)?;
    let remote_branches = repo.remote_branches(&remote.name)?;
    Ok(BranchExistence::classify(target, &local, &remote_branches))
}

/// Ensures `target` exists locally, creating it when needed.
///
/// * local: nothing runs
/// * remote only: `git checkout -b target origin/target`
/// * missing: the branch is cut from `master` (see [new_branch_from_master])
pub fn ensure_branch(
    repo: &dyn Repository,
    gateway: &dyn CommandGateway,
    master: &str,
    target: &str,
    observers: &mut [&mut dyn LineObserver],
) -> Result<Bootstrap> {
    let existence = classify(repo, target)?;
    debug!(branch = target, %existence, "classified target branch");

    let outcome = match existence {
        BranchExistence::Local => None,
        BranchExistence::RemoteOnly => {
            let remote = default_remote(repo)?;
            info!(branch = target, remote = %remote.name, "creating local tracking branch");
            let command = GitCommand::checkout_tracking(&remote.name, target);
            Some(gateway.run(&command, observers)?)
        }
        BranchExistence::Missing => Some(new_branch_from_master(
            repo, gateway, master, target, observers,
        )?),
    };

    Ok(Bootstrap { existence, outcome })
}

/// Creates `name` from the remote `master` and publishes it.
///
/// Runs `git fetch origin master:name -f`, `git checkout name` and
/// `git push origin name:name --tags --set-upstream`, stopping at the first
/// failure. Returns the outcome of the last command that ran.
pub fn new_branch_from_master(
    repo: &dyn Repository,
    gateway: &dyn CommandGateway,
    master: &str,
    name: &str,
    observers: &mut [&mut dyn LineObserver],
) -> Result<CommandOutcome> {
    let remote = default_remote(repo)?;
    info!(branch = name, master, remote = %remote.name, "creating branch from master");

    let fetch = GitCommand::fetch_into(&remote.name, master, name).with_urls(&remote.urls);
    let outcome = gateway.run(&fetch, observers)?;
    if !outcome.success {
        return Ok(outcome);
    }

    let outcome = gateway.run(&GitCommand::checkout(name), observers)?;
    if !outcome.success {
        return Ok(outcome);
    }

    let push = GitCommand::push(&remote.name, name, true).with_urls(&remote.urls);
    gateway.run(&push, observers)
}
