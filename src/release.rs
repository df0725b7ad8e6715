//! Release orchestration.
//!
//! [ReleaseFlow::merge_and_publish] merges a working branch into the release
//! branch and publishes it:
//!
//! 1. make sure the target branch exists locally (bootstrap)
//! 2. check out the target
//! 3. pull the target from the remote
//! 4. merge the source, watching for conflicts
//! 5. resolve conflicts if any were reported
//! 6. stop unless the merge stands (conflict resolution decides when it ran)
//! 7. create the annotated tag, if requested
//! 8. push the target with tags
//! 9. check the source branch out again
//!
//! The first failing step stops the sequence. Step 9 runs regardless, so the
//! operator always ends up back on their own branch when git allows it.

use std::fmt;

use tracing::{info, instrument, warn};

use crate::bootstrap::{self, ensure_branch};
use crate::config::{Config, CONFIG_FILE_NAME};
use crate::conflict::{resolver_for, ConflictResolver, ConflictSession};
use crate::domain::TagSpec;
use crate::error::Result;
use crate::git::{
    CommandGateway, CommandOutcome, ConflictDetector, ErrorLineCollector, GitCommand,
    LineObserver, Repository,
};
use crate::last_commit::{self, LastCommit};
use crate::lock::LockManager;
use crate::notify::Notifier;
use crate::preflight;
use crate::remote::default_remote;

/// Steps of a release, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStep {
    Bootstrap,
    CheckoutTarget,
    Pull,
    Merge,
    Tag,
    Push,
    RestoreSource,
}

impl fmt::Display for ReleaseStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReleaseStep::Bootstrap => "prepare target branch",
            ReleaseStep::CheckoutTarget => "check out target branch",
            ReleaseStep::Pull => "pull target branch",
            ReleaseStep::Merge => "merge",
            ReleaseStep::Tag => "tag",
            ReleaseStep::Push => "push",
            ReleaseStep::RestoreSource => "restore source branch",
        };
        f.write_str(name)
    }
}

/// Pass/fail result of [ReleaseFlow::merge_and_publish]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseOutcome {
    /// First step that failed, `None` when the release went through
    pub failed_step: Option<ReleaseStep>,
    /// Outcome of the failed step, or of the final checkout on success
    pub outcome: CommandOutcome,
    /// Whether the closing checkout of the source branch succeeded
    pub restored: bool,
    /// `Some(all_resolved)` when the merge reported conflicts
    pub conflicts_resolved: Option<bool>,
    /// `error:` / `fatal:` lines seen while the release ran
    pub error_lines: Vec<String>,
}

impl ReleaseOutcome {
    pub fn success(&self) -> bool {
        self.failed_step.is_none() && self.outcome.success
    }
}

impl fmt::Display for ReleaseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failed_step {
            None => write!(f, "release completed"),
            Some(step) => {
                write!(f, "step '{}' failed", step)?;
                let detail = self.outcome.error_output_joined();
                if !detail.is_empty() {
                    write!(f, ": {}", detail)?;
                }
                if step != ReleaseStep::RestoreSource && !self.restored {
                    write!(f, " (could not switch back to the source branch)")?;
                }
                Ok(())
            }
        }
    }
}

struct StepFailure {
    step: ReleaseStep,
    outcome: CommandOutcome,
    conflicts_resolved: Option<bool>,
}

impl StepFailure {
    fn new(step: ReleaseStep, outcome: CommandOutcome) -> Self {
        StepFailure {
            step,
            outcome,
            conflicts_resolved: None,
        }
    }
}

type StepResult = std::result::Result<Option<bool>, StepFailure>;

/// The release workflow for one working copy
pub struct ReleaseFlow<'a> {
    repo: &'a dyn Repository,
    gateway: &'a dyn CommandGateway,
    notifier: &'a dyn Notifier,
    config: &'a Config,
    resolver: Box<dyn ConflictResolver + 'a>,
}

impl<'a> ReleaseFlow<'a> {
    /// Workflow using the conflict strategy from `config`
    pub fn new(
        repo: &'a dyn Repository,
        gateway: &'a dyn CommandGateway,
        notifier: &'a dyn Notifier,
        config: &'a Config,
    ) -> Self {
        ReleaseFlow {
            repo,
            gateway,
            notifier,
            config,
            resolver: resolver_for(config.conflict_strategy),
        }
    }

    /// Replace the conflict resolver
    pub fn with_resolver(mut self, resolver: Box<dyn ConflictResolver + 'a>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier
    }

    pub fn repository(&self) -> &dyn Repository {
        self.repo
    }

    /// Lock manager sharing this workflow's collaborators
    pub fn lock_manager(&self) -> LockManager<'a> {
        LockManager::new(self.repo, self.gateway, self.notifier, self.config)
    }

    /// Short name of the checked-out branch
    pub fn current_branch(&self) -> Result<Option<String>> {
        self.repo.current_branch()
    }

    /// See [preflight::has_uncommitted_changes]
    pub fn has_uncommitted_changes(&self) -> Result<bool> {
        preflight::has_uncommitted_changes(self.repo, self.notifier)
    }

    /// Merges `source` into `target`, tags and pushes `target`, then returns to `source`.
    ///
    /// Command failures come back inside the [ReleaseOutcome]; `Err` means a
    /// step could not be attempted (no remote, git not runnable, bad tag name).
    #[instrument(skip(self, tag), fields(tag = tag.map(|t| t.name.as_str())))]
    pub fn merge_and_publish(
        &mut self,
        source: &str,
        target: &str,
        tag: Option<&TagSpec>,
    ) -> Result<ReleaseOutcome> {
        if let Some(tag) = tag {
            tag.validate()?;
        }

        let mut errors = ErrorLineCollector::default();
        let steps = self.run_steps(source, target, tag, &mut errors);

        info!(branch = source, "switching back to source branch");
        let restore = self.gateway.run(&GitCommand::checkout(source), &mut [&mut errors]);

        let steps = match steps {
            Ok(steps) => steps,
            Err(e) => {
                if let Err(restore_err) = restore {
                    warn!(error = %restore_err, "could not switch back to source branch");
                }
                return Err(e);
            }
        };
        let restore = restore?;
        let error_lines = errors.lines().to_vec();

        let outcome = match steps {
            Ok(conflicts_resolved) => {
                let failed_step = (!restore.success).then_some(ReleaseStep::RestoreSource);
                ReleaseOutcome {
                    failed_step,
                    restored: restore.success,
                    outcome: restore,
                    conflicts_resolved,
                    error_lines,
                }
            }
            Err(failure) => {
                warn!(step = %failure.step, "release aborted");
                ReleaseOutcome {
                    failed_step: Some(failure.step),
                    outcome: failure.outcome,
                    restored: restore.success,
                    conflicts_resolved: failure.conflicts_resolved,
                    error_lines,
                }
            }
        };

        if outcome.success() {
            info!(source, target, "release published");
        }
        Ok(outcome)
    }

    fn run_steps(
        &mut self,
        source: &str,
        target: &str,
        tag: Option<&TagSpec>,
        errors: &mut ErrorLineCollector,
    ) -> Result<StepResult> {
        let bootstrap = ensure_branch(
            self.repo,
            self.gateway,
            &self.config.master_branch,
            target,
            &mut [&mut *errors],
        )?;
        if let Some(outcome) = bootstrap.outcome.filter(|o| !o.success) {
            return Ok(Err(StepFailure::new(ReleaseStep::Bootstrap, outcome)));
        }

        let outcome = self
            .gateway
            .run(&GitCommand::checkout(target), &mut [&mut *errors])?;
        if !outcome.success {
            return Ok(Err(StepFailure::new(ReleaseStep::CheckoutTarget, outcome)));
        }

        let remote = default_remote(self.repo)?;
        info!(branch = target, remote = %remote.name, "pulling target branch");
        let pull = GitCommand::pull(&remote.name, target).with_urls(&remote.urls);
        let outcome = self.gateway.run(&pull, &mut [&mut *errors])?;
        if !outcome.success {
            return Ok(Err(StepFailure::new(ReleaseStep::Pull, outcome)));
        }

        info!(source, target, "merging");
        let mut detector = ConflictDetector::default();
        let merge = {
            let mut observers: [&mut dyn LineObserver; 2] = [&mut detector, &mut *errors];
            self.gateway.run(&GitCommand::merge(source), &mut observers)?
        };

        // Once conflicts were reported, the resolution result decides.
        let conflicts_resolved = if detector.has_happened() {
            let session =
                ConflictSession::new(self.repo, self.gateway, self.notifier, source, target);
            Some(session.run(self.resolver.as_mut())?)
        } else {
            None
        };

        let merged = conflicts_resolved.unwrap_or(merge.success);
        if !merged {
            return Ok(Err(StepFailure {
                step: ReleaseStep::Merge,
                outcome: merge,
                conflicts_resolved,
            }));
        }

        if let Some(tag) = tag {
            let name = tag.prefixed_name(&self.config.tag_prefix);
            info!(tag = %name, "tagging");
            let outcome = self.gateway.run(
                &GitCommand::annotated_tag(&name, &tag.message),
                &mut [&mut *errors],
            )?;
            if !outcome.success {
                return Ok(Err(StepFailure::new(ReleaseStep::Tag, outcome)));
            }
        }

        info!(branch = target, remote = %remote.name, "pushing");
        let push = GitCommand::push(&remote.name, target, false).with_urls(&remote.urls);
        let outcome = self.gateway.run(&push, &mut [&mut *errors])?;
        if !outcome.success {
            return Ok(Err(StepFailure::new(ReleaseStep::Push, outcome)));
        }

        Ok(Ok(conflicts_resolved))
    }

    /// Checks the working tree, then takes the release lock with the tip of
    /// the current branch.
    ///
    /// Returns true when the lock was acquired. On contention the operator
    /// gets an error notification and the chat channel, when configured, is
    /// told who released last.
    #[instrument(skip(self))]
    pub fn start_release(&self) -> Result<bool> {
        if self.has_uncommitted_changes()? {
            return Ok(false);
        }

        let branch = self.repo.current_branch()?.ok_or_else(|| {
            crate::error::ReleaseFlowError::branch("HEAD is detached, check out a branch first")
        })?;

        let lock = self.lock_manager();
        if lock.acquire(&branch, &mut [])? {
            self.notifier.notify_success(
                "Success",
                &format!("Release started from {}, the release branch is locked", branch),
            );
            return Ok(true);
        }

        self.notifier.notify_error(
            "Error",
            "The release branch is locked by another release. \
             If that release was abandoned, unlock it and start again.",
        );
        lock.notify_contention_logged();
        Ok(false)
    }

    /// Creates `name` from the configured master branch and publishes it.
    pub fn new_branch_from_master(&self, name: &str) -> Result<CommandOutcome> {
        bootstrap::new_branch_from_master(
            self.repo,
            self.gateway,
            &self.config.master_branch,
            name,
            &mut [],
        )
    }

    /// Deletes `name` on the remote and locally, leaving master checked out.
    ///
    /// Returns the outcome of the local deletion. A missing remote branch is
    /// logged and does not stop the local deletion.
    pub fn delete_branch(&self, name: &str) -> Result<CommandOutcome> {
        let checkout = self
            .gateway
            .run(&GitCommand::checkout(&self.config.master_branch), &mut [])?;
        if !checkout.success {
            return Ok(checkout);
        }

        let remote = default_remote(self.repo)?;
        let deleted = self.gateway.run(
            &GitCommand::delete_remote_branch(&remote.name, name).with_urls(&remote.urls),
            &mut [],
        )?;
        if !deleted.success {
            warn!(
                branch = name,
                stderr = %deleted.error_output_joined(),
                "remote branch not deleted"
            );
        }

        self.gateway
            .run(&GitCommand::delete_local_branch(name, true), &mut [])
    }

    /// Renames a local branch.
    pub fn rename_branch(&self, old: &str, new: &str) -> Result<CommandOutcome> {
        self.gateway
            .run(&GitCommand::rename_branch(old, new), &mut [])
    }

    /// Newest commit of `branch` on the default remote.
    pub fn remote_last_commit(&self, branch: &str) -> Result<LastCommit> {
        last_commit::remote_last_commit(self.repo, self.gateway, branch)
    }

    /// Stages the project configuration file so it is shared through the repository.
    pub fn stage_config_file(&self) -> Result<CommandOutcome> {
        self.gateway
            .run(&GitCommand::add_paths(&[CONFIG_FILE_NAME]), &mut [])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::{Resolution, StrategyResolver};
    use crate::git::{MockGateway, MockRemote, MockRepository};
    use crate::notify::{Level, RecordingNotifier};

    fn fixture() -> (MockRemote, MockRepository) {
        let remote = MockRemote::new();
        remote.add_branch("master");
        remote.add_branch("release");
        let repo = MockRepository::new("/work/app", &remote, "feature/x");
        repo.add_local_branch("release");
        (remote, repo)
    }

    #[test]
    fn test_happy_path_with_existing_branch() {
        let (_remote, repo) = fixture();
        let gateway = MockGateway::new(&repo);
        let notifier = RecordingNotifier::new();
        let config = Config::default();
        let mut flow = ReleaseFlow::new(&repo, &gateway, &notifier, &config);

        let outcome = flow.merge_and_publish("feature/x", "release", None).unwrap();

        assert!(outcome.success());
        assert!(outcome.restored);
        assert_eq!(outcome.conflicts_resolved, None);
        assert_eq!(
            gateway.commands(),
            [
                "git checkout release",
                "git pull origin release:release",
                "git merge feature/x",
                "git push origin release:release --tags",
                "git checkout feature/x",
            ]
        );
    }

    #[test]
    fn test_tag_uses_prefix() {
        let (_remote, repo) = fixture();
        let gateway = MockGateway::new(&repo);
        let notifier = RecordingNotifier::new();
        let config = Config {
            tag_prefix: "v".to_string(),
            ..Config::default()
        };
        let mut flow = ReleaseFlow::new(&repo, &gateway, &notifier, &config);

        let tag = TagSpec::new("1.2.0", "cut");
        let outcome = flow
            .merge_and_publish("feature/x", "release", Some(&tag))
            .unwrap();

        assert!(outcome.success());
        assert!(gateway
            .commands()
            .contains(&"git tag -a -f -m cut v1.2.0".to_string()));
        assert_eq!(repo.tag_message("v1.2.0").as_deref(), Some("cut"));
    }

    #[test]
    fn test_invalid_tag_runs_nothing() {
        let (_remote, repo) = fixture();
        let gateway = MockGateway::new(&repo);
        let notifier = RecordingNotifier::new();
        let config = Config::default();
        let mut flow = ReleaseFlow::new(&repo, &gateway, &notifier, &config);

        let tag = TagSpec::new("bad name", "cut");
        assert!(flow
            .merge_and_publish("feature/x", "release", Some(&tag))
            .is_err());
        assert!(gateway.commands().is_empty());
    }

    #[test]
    fn test_merge_failure_without_conflict_aborts() {
        let (_remote, repo) = fixture();
        let gateway = MockGateway::new(&repo);
        gateway.fail_on("git merge", "fatal: refusing to merge unrelated histories");
        let notifier = RecordingNotifier::new();
        let config = Config::default();
        let mut flow = ReleaseFlow::new(&repo, &gateway, &notifier, &config);

        let outcome = flow.merge_and_publish("feature/x", "release", None).unwrap();

        assert!(!outcome.success());
        assert_eq!(outcome.failed_step, Some(ReleaseStep::Merge));
        assert_eq!(
            outcome.error_lines,
            ["fatal: refusing to merge unrelated histories"]
        );
        assert!(!gateway.commands().iter().any(|c| c.starts_with("git push")));
        assert_eq!(gateway.commands().last().unwrap(), "git checkout feature/x");
    }

    #[test]
    fn test_unresolved_conflicts_abort_with_warning() {
        let (_remote, repo) = fixture();
        let gateway = MockGateway::new(&repo);
        gateway.conflict_on_merge(["src/lib.rs"]);
        let notifier = RecordingNotifier::new();
        let config = Config::default();
        let mut flow = ReleaseFlow::new(&repo, &gateway, &notifier, &config)
            .with_resolver(Box::new(StrategyResolver::new(Resolution::Skip)));

        let outcome = flow.merge_and_publish("feature/x", "release", None).unwrap();

        assert_eq!(outcome.failed_step, Some(ReleaseStep::Merge));
        assert_eq!(outcome.conflicts_resolved, Some(false));
        assert!(outcome.outcome.contains("CONFLICT"));
        assert_eq!(notifier.of_level(Level::Warning).len(), 1);
    }

    #[test]
    fn test_display_of_failure() {
        let outcome = ReleaseOutcome {
            failed_step: Some(ReleaseStep::Pull),
            outcome: CommandOutcome::failed("fatal: couldn't find remote ref release"),
            restored: true,
            conflicts_resolved: None,
            error_lines: Vec::new(),
        };
        assert_eq!(
            outcome.to_string(),
            "step 'pull target branch' failed: fatal: couldn't find remote ref release"
        );
    }

    #[test]
    fn test_start_release_refuses_dirty_tree() {
        let (remote, repo) = fixture();
        repo.add_change("src/lib.rs");
        let gateway = MockGateway::new(&repo);
        let notifier = RecordingNotifier::new();
        let config = Config::default();
        let flow = ReleaseFlow::new(&repo, &gateway, &notifier, &config);

        assert!(!flow.start_release().unwrap());
        assert!(gateway.commands().is_empty());
        assert!(!remote.has_branch("release_lock"));
    }

    #[test]
    fn test_start_release_contention() {
        let (remote, repo) = fixture();
        remote.add_branch("release_lock");
        let gateway = MockGateway::new(&repo);
        let notifier = RecordingNotifier::new();
        let config = Config::default();
        let flow = ReleaseFlow::new(&repo, &gateway, &notifier, &config);

        assert!(!flow.start_release().unwrap());
        assert_eq!(notifier.of_level(Level::Error).len(), 1);
    }

    #[test]
    fn test_start_release_acquires_lock() {
        let (remote, repo) = fixture();
        let gateway = MockGateway::new(&repo);
        let notifier = RecordingNotifier::new();
        let config = Config::default();
        let flow = ReleaseFlow::new(&repo, &gateway, &notifier, &config);

        assert!(flow.start_release().unwrap());
        assert!(remote.has_branch("release_lock"));
        assert_eq!(
            gateway.commands(),
            ["git push origin feature/x:release_lock"]
        );
    }

    #[test]
    fn test_delete_branch() {
        let (remote, repo) = fixture();
        repo.add_local_branch("master");
        remote.add_branch("feature/old");
        repo.add_local_branch("feature/old");
        let gateway = MockGateway::new(&repo);
        let notifier = RecordingNotifier::new();
        let config = Config::default();
        let flow = ReleaseFlow::new(&repo, &gateway, &notifier, &config);

        let outcome = flow.delete_branch("feature/old").unwrap();

        assert!(outcome.success);
        assert!(!remote.has_branch("feature/old"));
        assert!(!repo.has_local_branch("feature/old"));
        assert_eq!(
            gateway.commands(),
            [
                "git checkout master",
                "git push origin --delete feature/old",
                "git branch -D feature/old",
            ]
        );
    }

    #[test]
    fn test_rename_branch() {
        let (_remote, repo) = fixture();
        let gateway = MockGateway::new(&repo);
        let notifier = RecordingNotifier::new();
        let config = Config::default();
        let flow = ReleaseFlow::new(&repo, &gateway, &notifier, &config);

        assert!(flow.rename_branch("feature/x", "feature/y").unwrap().success);
        assert_eq!(flow.current_branch().unwrap().as_deref(), Some("feature/y"));
    }

    #[test]
    fn test_stage_config_file() {
        let (_remote, repo) = fixture();
        let gateway = MockGateway::new(&repo);
        let notifier = RecordingNotifier::new();
        let config = Config::default();
        let flow = ReleaseFlow::new(&repo, &gateway, &notifier, &config);

        flow.stage_config_file().unwrap();
        assert_eq!(gateway.commands(), ["git add -- gitflow.toml"]);
    }
}
