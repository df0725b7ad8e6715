use std::fmt;

/// Result of classifying a target branch before a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchExistence {
    /// Present as a local branch, nothing to bootstrap
    Local,
    /// Only on the remote, needs a local tracking branch
    RemoteOnly,
    /// Nowhere, must be created from the master branch
    Missing,
}

impl BranchExistence {
    /// Classify from the known local and remote branch names
    pub fn classify(target: &str, local: &[String], remote: &[String]) -> Self {
        if local.iter().any(|b| b == target) {
            BranchExistence::Local
        } else if remote.iter().any(|b| b == target) {
            BranchExistence::RemoteOnly
        } else {
            BranchExistence::Missing
        }
    }
}

impl fmt::Display for BranchExistence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchExistence::Local => write!(f, "local"),
            BranchExistence::RemoteOnly => write!(f, "remote only"),
            BranchExistence::Missing => write!(f, "missing"),
        }
    }
}
