use thiserror::Error;

/// Unified error type for git-release-flow operations
///
/// A git command that runs and exits non-zero is not an error: it comes back
/// as a failed [`crate::git::CommandOutcome`]. These variants cover everything
/// that prevents a command from being attempted at all.
#[derive(Error, Debug)]
pub enum ReleaseFlowError {
    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No remote configured for repository at {0}")]
    NoRemote(String),

    #[error("Branch error: {0}")]
    Branch(String),

    #[error("Conflict resolution error: {0}")]
    Conflict(String),

    #[error("Notification failed: {0}")]
    Notify(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in git-release-flow
pub type Result<T> = std::result::Result<T, ReleaseFlowError>;

impl ReleaseFlowError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseFlowError::Config(msg.into())
    }

    /// Create a branch error with context
    pub fn branch(msg: impl Into<String>) -> Self {
        ReleaseFlowError::Branch(msg.into())
    }

    /// Create a conflict resolution error with context
    pub fn conflict(msg: impl Into<String>) -> Self {
        ReleaseFlowError::Conflict(msg.into())
    }

    /// Create a notification error with context
    pub fn notify(msg: impl Into<String>) -> Self {
        ReleaseFlowError::Notify(msg.into())
    }

    /// True for errors that mean "the operation was never started"
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ReleaseFlowError::Config(_) | ReleaseFlowError::NoRemote(_) | ReleaseFlowError::Toml(_)
        )
    }
}
