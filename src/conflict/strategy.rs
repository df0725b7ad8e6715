use std::path::PathBuf;

use tracing::debug;

use crate::conflict::ConflictResolver;
use crate::error::Result;
use crate::git::{CommandGateway, GitCommand};

/// How a single conflicting file gets settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Keep the version from the branch being merged into
    Ours,
    /// Take the version from the branch being merged
    Theirs,
    /// Open `git mergetool` for the file
    Manual,
    /// Leave the file conflicted
    Skip,
}

impl Resolution {
    /// Applies this resolution to `path`; true when the file was settled.
    pub fn apply(self, gateway: &dyn CommandGateway, path: &str) -> Result<bool> {
        let command = match self {
            Resolution::Ours => GitCommand::checkout_side(path, true),
            Resolution::Theirs => GitCommand::checkout_side(path, false),
            Resolution::Manual => GitCommand::mergetool(path),
            Resolution::Skip => return Ok(false),
        };

        let outcome = gateway.run(&command, &mut [])?;
        debug!(path, resolution = ?self, success = outcome.success, "applied resolution");
        Ok(outcome.success)
    }
}

/// Applies the same resolution to every conflicting file
#[derive(Debug, Clone, Copy)]
pub struct StrategyResolver {
    resolution: Resolution,
}

impl StrategyResolver {
    pub fn new(resolution: Resolution) -> Self {
        StrategyResolver { resolution }
    }
}

impl ConflictResolver for StrategyResolver {
    fn resolve_conflicts(
        &mut self,
        gateway: &dyn CommandGateway,
        paths: &[PathBuf],
    ) -> Result<Vec<PathBuf>> {
        let mut resolved = Vec::new();
        for path in paths {
            if self.resolution.apply(gateway, &path.display().to_string())? {
                resolved.push(path.clone());
            }
        }
        Ok(resolved)
    }
}
