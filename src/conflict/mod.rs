//! Merge conflict resolution.
//!
//! A merge that stops on conflicts is handed to a [ConflictSession]. The
//! session asks a [ConflictResolver] to settle the conflicting paths, stages
//! what was settled and commits the merge only when nothing is left
//! unresolved. Resolvers are pluggable: a fixed [StrategyResolver]
//! (ours / theirs / mergetool) or the per-file [InteractiveResolver].

pub mod interactive;
pub mod strategy;

pub use interactive::InteractiveResolver;
pub use strategy::{Resolution, StrategyResolver};

use std::path::PathBuf;

use tracing::{info, warn};

use crate::config::ConflictStrategyConfig;
use crate::error::Result;
use crate::git::{CommandGateway, GitCommand, Repository};
use crate::notify::Notifier;

/// Settles conflicting paths in the working tree
pub trait ConflictResolver {
    /// Returns the subset of `paths` whose content was settled.
    ///
    /// Staging and committing are left to the session.
    fn resolve_conflicts(
        &mut self,
        gateway: &dyn CommandGateway,
        paths: &[PathBuf],
    ) -> Result<Vec<PathBuf>>;
}

/// Builds the resolver selected in configuration
pub fn resolver_for(strategy: ConflictStrategyConfig) -> Box<dyn ConflictResolver> {
    match strategy {
        ConflictStrategyConfig::Prompt => Box::new(InteractiveResolver::stdin()),
        ConflictStrategyConfig::Ours => Box::new(StrategyResolver::new(Resolution::Ours)),
        ConflictStrategyConfig::Theirs => Box::new(StrategyResolver::new(Resolution::Theirs)),
        ConflictStrategyConfig::Manual => Box::new(StrategyResolver::new(Resolution::Manual)),
    }
}

/// One committing resolution pass over a stopped merge of `source` into `target`
pub struct ConflictSession<'a> {
    repo: &'a dyn Repository,
    gateway: &'a dyn CommandGateway,
    notifier: &'a dyn Notifier,
    source: &'a str,
    target: &'a str,
}

impl<'a> ConflictSession<'a> {
    pub fn new(
        repo: &'a dyn Repository,
        gateway: &'a dyn CommandGateway,
        notifier: &'a dyn Notifier,
        source: &'a str,
        target: &'a str,
    ) -> Self {
        ConflictSession {
            repo,
            gateway,
            notifier,
            source,
            target,
        }
    }

    /// Returns true iff every conflicting path was resolved and the merge committed.
    pub fn run(&self, resolver: &mut dyn ConflictResolver) -> Result<bool> {
        let conflicted = self.repo.conflicted_paths()?;
        info!(
            source = self.source,
            target = self.target,
            files = conflicted.len(),
            "resolving merge conflicts"
        );

        if !conflicted.is_empty() {
            let resolved = match resolver.resolve_conflicts(self.gateway, &conflicted) {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!(error = %e, "conflict resolution aborted");
                    self.warn_unresolved(&conflicted);
                    return Ok(false);
                }
            };
            if !resolved.is_empty() {
                let staged = self
                    .gateway
                    .run(&GitCommand::add_paths(&display_paths(&resolved)), &mut [])?;
                if !staged.success {
                    warn!(stderr = %staged.error_output_joined(), "staging resolved files failed");
                }
            }
        }

        let remaining = self.repo.conflicted_paths()?;
        if !remaining.is_empty() {
            self.warn_unresolved(&remaining);
            return Ok(false);
        }

        let commit = self.gateway.run(&GitCommand::commit_no_edit(), &mut [])?;
        if !commit.success {
            warn!(stderr = %commit.error_output_joined(), "committing the merge failed");
            self.warn_unresolved(&remaining);
            return Ok(false);
        }

        info!(source = self.source, target = self.target, "merge conflicts resolved");
        Ok(true)
    }

    fn warn_unresolved(&self, remaining: &[PathBuf]) {
        let mut body = format!(
            "Merging {} into {} left conflicts unresolved",
            self.source, self.target
        );
        if !remaining.is_empty() {
            body.push_str(":\n");
            body.push_str(&crate::ui::format_changed_paths(remaining));
        }
        self.notifier.notify_warning("Merge conflict", &body);
    }
}

fn display_paths(paths: &[PathBuf]) -> Vec<String> {
    paths.iter().map(|p| p.display().to_string()).collect()
}
