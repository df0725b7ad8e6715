//! Checks that must pass before a release is attempted.

use tracing::debug;

use crate::error::Result;
use crate::git::Repository;
use crate::notify::Notifier;
use crate::ui::format_changed_paths;

/// Returns true (release must not proceed) when the working tree has
/// uncommitted changes, after reporting every changed path as an error.
pub fn has_uncommitted_changes(repo: &dyn Repository, notifier: &dyn Notifier) -> Result<bool> {
    let changes = repo.changed_paths()?;
    if changes.is_empty() {
        return Ok(false);
    }

    debug!(files = changes.len(), "working tree has uncommitted changes");
    notifier.notify_error(
        "Error",
        &format!(
            "The current branch has uncommitted files:\n{}",
            format_changed_paths(&changes)
        ),
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::{MockRemote, MockRepository};
    use crate::notify::{Level, RecordingNotifier};

    #[test]
    fn test_clean_tree_passes_silently() {
        let repo = MockRepository::new("/work/app", &MockRemote::new(), "feature/x");
        let notifier = RecordingNotifier::new();

        assert!(!has_uncommitted_changes(&repo, &notifier).unwrap());
        assert!(notifier.events().is_empty());
    }

    #[test]
    fn test_dirty_tree_lists_every_path() {
        let repo = MockRepository::new("/work/app", &MockRemote::new(), "feature/x");
        repo.add_change("src/lib.rs");
        repo.add_change("docs/notes.md");
        let notifier = RecordingNotifier::new();

        assert!(has_uncommitted_changes(&repo, &notifier).unwrap());

        let errors = notifier.of_level(Level::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].body.contains("src/lib.rs"));
        assert!(errors[0].body.contains("docs/notes.md"));
    }
}
