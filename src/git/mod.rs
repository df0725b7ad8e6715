//! Git operations abstraction layer
//!
//! The release workflow never talks to git directly. It goes through two
//! traits:
//!
//! - [CommandGateway]: runs one state-changing git command and hands back an
//!   immutable [CommandOutcome], streaming output lines to observers as they
//!   arrive.
//! - [Repository]: read-only queries (branches, remotes, working tree state).
//!
//! The concrete implementations include:
//!
//! - [cli::CliGateway]: runs the `git` executable
//! - [repository::Git2Repository]: answers queries through the `git2` crate
//! - [mock::MockGateway] / [mock::MockRepository]: in-memory doubles for tests
//!
//! ```rust
//! # use git_release_flow::git::{CommandGateway, ConflictDetector, GitCommand, LineObserver};
//! # fn example<G: CommandGateway>(gateway: &G) -> git_release_flow::Result<()> {
//! let mut conflicts = ConflictDetector::default();
//! let outcome = gateway.run(&GitCommand::merge("feature/x"), &mut [&mut conflicts])?;
//! if !outcome.success && conflicts.has_happened() {
//!     // hand over to conflict resolution
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod command;
pub mod mock;
pub mod repository;

pub use cli::CliGateway;
pub use command::{GitCommand, GitVerb};
pub use mock::{MockGateway, MockRemote, MockRepository};
pub use repository::Git2Repository;

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Result of a single gateway invocation
///
/// Produced once and never mutated; a failed outcome must stop the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub success: bool,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl CommandOutcome {
    /// Successful outcome with the given stdout lines
    pub fn ok(stdout: Vec<String>) -> Self {
        CommandOutcome {
            success: true,
            stdout,
            stderr: Vec::new(),
        }
    }

    /// Failed outcome carrying a single error line
    pub fn failed(message: impl Into<String>) -> Self {
        CommandOutcome {
            success: false,
            stdout: Vec::new(),
            stderr: vec![message.into()],
        }
    }

    /// Stdout joined with newlines
    pub fn output_joined(&self) -> String {
        self.stdout.join("\n")
    }

    /// Stderr joined with newlines
    pub fn error_output_joined(&self) -> String {
        self.stderr.join("\n")
    }

    /// True if either stream contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.stdout
            .iter()
            .chain(self.stderr.iter())
            .any(|line| line.contains(needle))
    }
}

/// Which stream a line was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// One line of command output delivered to observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub text: String,
}

impl OutputLine {
    pub fn stdout(text: impl Into<String>) -> Self {
        OutputLine {
            stream: OutputStream::Stdout,
            text: text.into(),
        }
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        OutputLine {
            stream: OutputStream::Stderr,
            text: text.into(),
        }
    }
}

/// Receives command output line by line while the command runs
pub trait LineObserver {
    fn on_line(&mut self, line: &OutputLine);
}

impl<F> LineObserver for F
where
    F: FnMut(&OutputLine),
{
    fn on_line(&mut self, line: &OutputLine) {
        self(line)
    }
}

/// Fires when git reports a merge conflict
#[derive(Debug, Default)]
pub struct ConflictDetector {
    happened: bool,
}

impl ConflictDetector {
    pub fn has_happened(&self) -> bool {
        self.happened
    }
}

impl LineObserver for ConflictDetector {
    fn on_line(&mut self, line: &OutputLine) {
        if line.text.starts_with("CONFLICT") || line.text.contains("Automatic merge failed") {
            self.happened = true;
        }
    }
}

/// Collects `error:` / `fatal:` lines from stderr
#[derive(Debug, Default)]
pub struct ErrorLineCollector {
    lines: Vec<String>,
}

impl ErrorLineCollector {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl LineObserver for ErrorLineCollector {
    fn on_line(&mut self, line: &OutputLine) {
        if line.stream == OutputStream::Stderr
            && (line.text.starts_with("error:") || line.text.starts_with("fatal:"))
        {
            self.lines.push(line.text.clone());
        }
    }
}

/// Executes state-changing git commands against one repository
///
/// Every call blocks until the command has exited. Implementations report
/// a non-zero exit as `Ok(CommandOutcome { success: false, .. })`; `Err` is
/// reserved for not being able to run the command at all.
pub trait CommandGateway {
    fn run(
        &self,
        command: &GitCommand,
        observers: &mut [&mut dyn LineObserver],
    ) -> Result<CommandOutcome>;
}

/// A configured remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remote {
    pub name: String,
    pub urls: Vec<String>,
}

impl Remote {
    pub fn new(name: impl Into<String>, urls: Vec<String>) -> Self {
        Remote {
            name: name.into(),
            urls,
        }
    }
}

/// Read-only view of a working copy
pub trait Repository {
    /// Root directory of the working tree
    fn root(&self) -> &Path;

    /// Short name of the checked-out branch, `None` when HEAD is detached
    fn current_branch(&self) -> Result<Option<String>>;

    /// Configured remotes, in configuration order
    fn remotes(&self) -> Result<Vec<Remote>>;

    /// Local branch names
    fn local_branches(&self) -> Result<Vec<String>>;

    /// Branch names known for `remote`, without the `remote/` prefix
    fn remote_branches(&self, remote: &str) -> Result<Vec<String>>;

    /// Paths with uncommitted changes (staged, unstaged or untracked)
    fn changed_paths(&self) -> Result<Vec<PathBuf>>;

    /// Paths currently in a conflicted state
    fn conflicted_paths(&self) -> Result<Vec<PathBuf>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_contains_checks_both_streams() {
        let outcome = CommandOutcome {
            success: true,
            stdout: vec!["Everything up-to-date".to_string()],
            stderr: vec![" * [new branch]      release -> release_lock".to_string()],
        };
        assert!(outcome.contains("new branch"));
        assert!(outcome.contains("up-to-date"));
        assert!(!outcome.contains("rejected"));
    }

    #[test]
    fn test_outcome_joined() {
        let outcome = CommandOutcome {
            success: false,
            stdout: vec!["a".to_string(), "b".to_string()],
            stderr: vec!["fatal: boom".to_string()],
        };
        assert_eq!(outcome.output_joined(), "a\nb");
        assert_eq!(outcome.error_output_joined(), "fatal: boom");
    }

    #[test]
    fn test_conflict_detector() {
        let mut detector = ConflictDetector::default();
        detector.on_line(&OutputLine::stdout("Auto-merging src/lib.rs"));
        assert!(!detector.has_happened());
        detector.on_line(&OutputLine::stdout(
            "CONFLICT (content): Merge conflict in src/lib.rs",
        ));
        assert!(detector.has_happened());
    }

    #[test]
    fn test_error_line_collector_ignores_stdout() {
        let mut collector = ErrorLineCollector::default();
        collector.on_line(&OutputLine::stdout("error: not really"));
        collector.on_line(&OutputLine::stderr("hint: try again"));
        collector.on_line(&OutputLine::stderr("fatal: couldn't find remote ref"));
        assert_eq!(collector.lines(), ["fatal: couldn't find remote ref"]);
    }

    #[test]
    fn test_closure_observer() {
        let mut seen = Vec::new();
        {
            let mut observer = |line: &OutputLine| seen.push(line.text.clone());
            observer.on_line(&OutputLine::stderr("remote: counting objects"));
        }
        assert_eq!(seen, ["remote: counting objects"]);
    }
}
