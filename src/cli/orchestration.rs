//! Subcommand workflows
//!
//! Each `run_*` function carries one CLI subcommand from start to finish on
//! top of a [ReleaseFlow]. They are kept apart from clap so they can be
//! driven programmatically and from tests with mock collaborators.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::config::{render_default_config, CONFIG_FILE_NAME};
use crate::domain::TagSpec;
use crate::lock::project_name;
use crate::release::{ReleaseFlow, ReleaseOutcome};

/// Arguments for the publish workflow
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishArgs {
    /// Branch to merge into, the configured release branch when `None`
    pub target: Option<String>,

    /// Tag to create on the target after merging
    pub tag: Option<String>,

    /// Tag annotation
    pub message: Option<String>,
}

/// Result of the publish workflow
#[derive(Debug, Clone, PartialEq)]
pub struct PublishResult {
    pub source: String,
    pub target: String,
    /// Tag as created, with the configured prefix
    pub tag: Option<String>,
    pub outcome: ReleaseOutcome,
}

impl PublishResult {
    pub fn success(&self) -> bool {
        self.outcome.success()
    }
}

/// Lock state reported by `status`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockStatus {
    pub project: String,
    pub branch: Option<String>,
    pub lock_branch: String,
    pub locked: bool,
}

/// `start`: refuse on a dirty tree, then take the release lock.
pub fn run_start(flow: &ReleaseFlow<'_>) -> Result<bool> {
    Ok(flow.start_release()?)
}

/// `publish`: merge the current branch into the target, tag, push and come back.
///
/// # Returns
/// * `Ok(PublishResult)` - The release ran; check [PublishResult::success]
/// * `Err` - Preconditions failed or a step could not be attempted
pub fn run_publish(flow: &mut ReleaseFlow<'_>, args: &PublishArgs) -> Result<PublishResult> {
    if flow.has_uncommitted_changes()? {
        bail!("Commit or stash your changes before publishing");
    }

    let source = flow
        .current_branch()?
        .context("HEAD is detached, check out the branch to publish")?;
    let target = args
        .target
        .clone()
        .unwrap_or_else(|| flow.config().release_branch.clone());
    if source == target {
        bail!("Already on '{}', check out the branch to publish", target);
    }

    let tag = args.tag.as_ref().map(|name| {
        let message = args
            .message
            .clone()
            .unwrap_or_else(|| format!("Release {}", name));
        TagSpec::new(name.as_str(), message)
    });
    let tag_name = tag
        .as_ref()
        .map(|t| t.prefixed_name(&flow.config().tag_prefix));

    info!(%source, %target, "publishing");
    let outcome = flow.merge_and_publish(&source, &target, tag.as_ref())?;

    if outcome.success() {
        let mut body = format!("Merged {} into {} and pushed", source, target);
        if let Some(name) = &tag_name {
            body.push_str(&format!(", tagged {}", name));
        }
        flow.notifier().notify_success("Success", &body);
    } else {
        let mut body = outcome.to_string();
        for line in &outcome.error_lines {
            body.push_str("\n  ");
            body.push_str(line);
        }
        flow.notifier().notify_error("Error", &body);
    }

    Ok(PublishResult {
        source,
        target,
        tag: tag_name,
        outcome,
    })
}

/// `unlock`: delete the release lock.
pub fn run_unlock(flow: &ReleaseFlow<'_>) -> Result<bool> {
    Ok(flow.lock_manager().release()?)
}

/// `status`: refresh remote branches and report whether a release is running.
pub fn run_status(flow: &ReleaseFlow<'_>) -> Result<LockStatus> {
    let lock = flow.lock_manager();
    let refreshed = lock.refresh()?;
    if !refreshed.success {
        flow.notifier().notify_warning(
            "Warning",
            &format!(
                "Could not refresh remote branches, showing cached state: {}",
                refreshed.error_output_joined()
            ),
        );
    }

    Ok(LockStatus {
        project: project_name(flow.repository()),
        branch: flow.current_branch()?,
        lock_branch: lock.lock_branch().to_string(),
        locked: lock.is_held()?,
    })
}

/// `new-branch`: cut `name` from master and publish it.
pub fn run_new_branch(flow: &ReleaseFlow<'_>, name: &str) -> Result<bool> {
    if flow.has_uncommitted_changes()? {
        bail!("Commit or stash your changes before switching branches");
    }

    let outcome = flow.new_branch_from_master(name)?;
    if outcome.success {
        flow.notifier().notify_success(
            "Success",
            &format!("Created {} from {}", name, flow.config().master_branch),
        );
    } else {
        flow.notifier().notify_error(
            "Error",
            &format!("Failed to create {}: {}", name, outcome.error_output_joined()),
        );
    }
    Ok(outcome.success)
}

/// `delete-branch`: delete `name` locally and on the remote.
pub fn run_delete_branch(flow: &ReleaseFlow<'_>, name: &str) -> Result<bool> {
    let config = flow.config();
    if name == config.master_branch || name == config.release_branch {
        bail!("Refusing to delete protected branch '{}'", name);
    }

    let outcome = flow.delete_branch(name)?;
    if outcome.success {
        flow.notifier()
            .notify_success("Success", &format!("Deleted {}", name));
    } else {
        flow.notifier().notify_error(
            "Error",
            &format!("Failed to delete {}: {}", name, outcome.error_output_joined()),
        );
    }
    Ok(outcome.success)
}

/// `rename-branch`: rename a local branch.
pub fn run_rename_branch(flow: &ReleaseFlow<'_>, old: &str, new: &str) -> Result<bool> {
    let outcome = flow.rename_branch(old, new)?;
    if outcome.success {
        flow.notifier()
            .notify_success("Success", &format!("Renamed {} to {}", old, new));
    } else {
        flow.notifier().notify_error(
            "Error",
            &format!("Failed to rename {}: {}", old, outcome.error_output_joined()),
        );
    }
    Ok(outcome.success)
}

/// `init-config`: write a default `gitflow.toml` into `dir`.
///
/// Never overwrites an existing file.
pub fn write_default_config(dir: &Path) -> Result<PathBuf> {
    let path = dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        bail!("{} already exists", path.display());
    }

    let contents = render_default_config()?;
    fs::write(&path, contents).with_context(|| format!("cannot write {}", path.display()))?;
    Ok(path)
}

/// `init-config`, then stage the new file so it is shared with the team.
pub fn run_init_config(flow: &ReleaseFlow<'_>) -> Result<PathBuf> {
    let path = write_default_config(flow.repository().root())?;
    let staged = flow.stage_config_file()?;
    if !staged.success {
        flow.notifier().notify_warning(
            "Warning",
            &format!(
                "{} was written but not staged: {}",
                CONFIG_FILE_NAME,
                staged.error_output_joined()
            ),
        );
    }
    Ok(path)
}
