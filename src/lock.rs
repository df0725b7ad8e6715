//! Release lock backed by a sentinel branch on the shared remote.
//!
//! The lock is held exactly when the sentinel branch exists on the remote.
//! Acquiring pushes a branch tip to the sentinel name and only counts when
//! git reports `[new branch]`; a fast-forward of an existing sentinel means
//! somebody else is mid-release. Releasing deletes the sentinel. Nothing
//! expires on its own.

use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::error::Result;
use crate::git::{CommandGateway, CommandOutcome, GitCommand, LineObserver, Repository};
use crate::last_commit::remote_last_commit;
use crate::notify::{Notifier, WebhookNotifier};
use crate::remote::default_remote;

/// Marker git prints when a push creates a ref
const NEW_BRANCH_MARKER: &str = "new branch";

/// Acquires, releases and inspects the release lock
pub struct LockManager<'a> {
    repo: &'a dyn Repository,
    gateway: &'a dyn CommandGateway,
    notifier: &'a dyn Notifier,
    config: &'a Config,
}

impl<'a> LockManager<'a> {
    pub fn new(
        repo: &'a dyn Repository,
        gateway: &'a dyn CommandGateway,
        notifier: &'a dyn Notifier,
        config: &'a Config,
    ) -> Self {
        LockManager {
            repo,
            gateway,
            notifier,
            config,
        }
    }

    /// Sentinel branch name
    pub fn lock_branch(&self) -> &str {
        &self.config.lock_branch
    }

    /// Pushes the tip of `releasing_branch` to the sentinel branch.
    ///
    /// Returns true only if this push created the sentinel. The return value
    /// is the only authority: checking [LockManager::is_held] first and then
    /// acquiring leaves a window for another collaborator.
    #[instrument(skip(self, observers))]
    pub fn acquire(
        &self,
        releasing_branch: &str,
        observers: &mut [&mut dyn LineObserver],
    ) -> Result<bool> {
        let remote = default_remote(self.repo)?;
        let command =
            GitCommand::push_refspec(&remote.name, releasing_branch, &self.config.lock_branch)
                .with_urls(&remote.urls);
        let outcome = self.gateway.run(&command, observers)?;

        let acquired = is_new_branch(&outcome);
        if acquired {
            info!(lock = %self.config.lock_branch, "release lock acquired");
        } else {
            debug!(
                success = outcome.success,
                lock = %self.config.lock_branch,
                "release lock not acquired"
            );
        }
        Ok(acquired)
    }

    /// Deletes the sentinel branch on the remote.
    ///
    /// Notifies success or the raw git error and returns whether the
    /// deletion succeeded.
    #[instrument(skip(self))]
    pub fn release(&self) -> Result<bool> {
        let remote = default_remote(self.repo)?;
        let command = GitCommand::delete_remote_branch(&remote.name, &self.config.lock_branch)
            .with_urls(&remote.urls);
        let outcome = self.gateway.run(&command, &mut [])?;

        if outcome.success {
            info!(lock = %self.config.lock_branch, "release lock removed");
            self.notifier.notify_success(
                "Success",
                "The release branch is unlocked, a new release can be started",
            );
        } else {
            self.notifier.notify_error(
                "Error",
                &format!(
                    "Failed to unlock the release branch: {}",
                    outcome.error_output_joined()
                ),
            );
        }
        Ok(outcome.success)
    }

    /// True iff the sentinel appears among the known remote branches.
    pub fn is_held(&self) -> Result<bool> {
        let remote = default_remote(self.repo)?;
        let held = self
            .repo
            .remote_branches(&remote.name)?
            .iter()
            .any(|branch| *branch == self.config.lock_branch);
        Ok(held)
    }

    /// Fetches with prune so [LockManager::is_held] sees the remote's current state.
    pub fn refresh(&self) -> Result<CommandOutcome> {
        let remote = default_remote(self.repo)?;
        self.gateway.run(
            &GitCommand::fetch_prune(&remote.name).with_urls(&remote.urls),
            &mut [],
        )
    }

    /// Tells the third-party channel who holds the lock.
    ///
    /// Does nothing when no notification token is configured. Errors are
    /// returned for the caller to log; they never affect the workflow.
    pub fn notify_contention(&self) -> Result<()> {
        let Some(url) = self.config.notify_endpoint() else {
            debug!("no notification token configured, skipping channel message");
            return Ok(());
        };

        let last = remote_last_commit(self.repo, self.gateway, &self.config.release_branch)?;
        let message = format!(
            "{} release branch is locked, last operation: {};\n\
             To force a release, unlock it first and then start the release again.",
            project_name(self.repo),
            last
        );

        WebhookNotifier::new(url)?.send(&message)
    }

    /// [LockManager::notify_contention], logging instead of returning failures
    pub fn notify_contention_logged(&self) {
        if let Err(e) = self.notify_contention() {
            warn!(error = %e, "lock contention notification failed");
        }
    }
}

fn is_new_branch(outcome: &CommandOutcome) -> bool {
    outcome.success && outcome.contains(NEW_BRANCH_MARKER)
}

/// Directory name of the working tree, used as the project name
pub fn project_name(repo: &dyn Repository) -> String {
    repo.root()
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| repo.root().display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::{MockGateway, MockRemote, MockRepository};
    use crate::notify::{Level, RecordingNotifier};

    fn setup() -> (MockRemote, MockRepository, Config) {
        let remote = MockRemote::new();
        remote.add_branch("release");
        let repo = MockRepository::new("/work/app", &remote, "release");
        (remote, repo, Config::default())
    }

    #[test]
    fn test_acquire_then_is_held() {
        let (remote, repo, config) = setup();
        let gateway = MockGateway::new(&repo);
        let notifier = RecordingNotifier::new();
        let lock = LockManager::new(&repo, &gateway, &notifier, &config);

        assert!(!lock.is_held().unwrap());
        assert!(lock.acquire("release", &mut []).unwrap());
        assert!(lock.is_held().unwrap());
        assert!(remote.has_branch("release_lock"));
        assert_eq!(
            gateway.commands(),
            ["git push origin release:release_lock"]
        );
    }

    #[test]
    fn test_second_acquire_fails() {
        let (_remote, repo, config) = setup();
        let gateway = MockGateway::new(&repo);
        let notifier = RecordingNotifier::new();
        let lock = LockManager::new(&repo, &gateway, &notifier, &config);

        assert!(lock.acquire("release", &mut []).unwrap());
        assert!(!lock.acquire("release", &mut []).unwrap());
    }

    #[test]
    fn test_failed_push_is_not_acquisition() {
        let (_remote, repo, config) = setup();
        let gateway = MockGateway::new(&repo);
        gateway.fail_on("git push", " ! [new branch] rejected (permission denied)");
        let notifier = RecordingNotifier::new();
        let lock = LockManager::new(&repo, &gateway, &notifier, &config);

        assert!(!lock.acquire("release", &mut []).unwrap());
    }

    #[test]
    fn test_release_then_is_held_false() {
        let (remote, repo, config) = setup();
        remote.add_branch("release_lock");
        let gateway = MockGateway::new(&repo);
        let notifier = RecordingNotifier::new();
        let lock = LockManager::new(&repo, &gateway, &notifier, &config);

        assert!(lock.is_held().unwrap());
        assert!(lock.release().unwrap());
        assert!(!lock.is_held().unwrap());
        assert_eq!(notifier.of_level(Level::Success).len(), 1);
        assert_eq!(
            gateway.commands(),
            ["git push origin --delete release_lock"]
        );
    }

    #[test]
    fn test_release_failure_reports_raw_error() {
        let (_remote, repo, config) = setup();
        let gateway = MockGateway::new(&repo);
        let notifier = RecordingNotifier::new();
        let lock = LockManager::new(&repo, &gateway, &notifier, &config);

        assert!(!lock.release().unwrap());
        let errors = notifier.of_level(Level::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].body.contains("remote ref does not exist"));
    }

    #[test]
    fn test_notify_contention_without_token_is_noop() {
        let (_remote, repo, config) = setup();
        let gateway = MockGateway::new(&repo);
        let notifier = RecordingNotifier::new();
        let lock = LockManager::new(&repo, &gateway, &notifier, &config);

        assert!(lock.notify_contention().is_ok());
        assert!(gateway.commands().is_empty());
    }

    #[test]
    fn test_notify_contention_failure_is_returned_not_raised() {
        let (_remote, repo, _) = setup();
        let config = Config {
            notify_token: Some("token".to_string()),
            notify_url: "http://127.0.0.1:9/robot?access_token={token}".to_string(),
            ..Config::default()
        };
        let gateway = MockGateway::new(&repo);
        let notifier = RecordingNotifier::new();
        let lock = LockManager::new(&repo, &gateway, &notifier, &config);

        assert!(lock.notify_contention().is_err());
        lock.notify_contention_logged();
        assert!(notifier.events().is_empty());
    }

    #[tokio::test]
    async fn test_notify_contention_posts_holder_to_channel() {
        use wiremock::matchers::{method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/robot/send"))
            .and(query_param("access_token", "tok"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config = Config {
            notify_token: Some("tok".to_string()),
            notify_url: format!("{}/robot/send?access_token={{token}}", server.uri()),
            ..Config::default()
        };

        // The blocking client must not run on the async runtime.
        let (sent, commands) = tokio::task::spawn_blocking(move || {
            let (_remote, repo, _) = setup();
            let gateway = MockGateway::new(&repo);
            let notifier = RecordingNotifier::new();
            let lock = LockManager::new(&repo, &gateway, &notifier, &config);
            (lock.notify_contention().is_ok(), gateway.commands())
        })
        .await
        .unwrap();

        assert!(sent);
        assert_eq!(commands.len(), 1);
        assert!(commands[0].starts_with("git show origin/release"));

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let body: serde_json::Value = requests[0].body_json().unwrap();
        let msg = body["msg"].as_str().unwrap();
        assert!(msg.starts_with("app release branch is locked"));
        assert!(msg.contains("dev@example.com"));
        assert!(msg.contains("fix login"));
        assert!(msg.contains("unlock it first"));
    }

    #[test]
    fn test_project_name() {
        let (_remote, repo, _) = setup();
        assert_eq!(project_name(&repo), "app");
    }
}
