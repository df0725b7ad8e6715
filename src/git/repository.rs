use std::path::{Path, PathBuf};

use git2::{BranchType, ErrorCode, Repository as Git2Repo, Status, StatusOptions};

use crate::error::{ReleaseFlowError, Result};
use crate::git::{Remote, Repository};

/// Wrapper around git2::Repository with our query interface
pub struct Git2Repository {
    repo: Git2Repo,
    root: PathBuf,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;
        Self::from_git2(repo)
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Result<Self> {
        let root = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| ReleaseFlowError::branch("bare repositories have no working tree"))?;

        Ok(Git2Repository { repo, root })
    }

    fn paths_with_status(&self, wanted: impl Fn(Status) -> bool) -> Result<Vec<PathBuf>> {
        let mut options = StatusOptions::new();
        options
            .include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);

        let statuses = self.repo.statuses(Some(&mut options))?;

        Ok(statuses
            .iter()
            .filter(|entry| wanted(entry.status()))
            .filter_map(|entry| entry.path().map(PathBuf::from))
            .collect())
    }
}

impl Repository for Git2Repository {
    fn root(&self) -> &Path {
        &self.root
    }

    fn current_branch(&self) -> Result<Option<String>> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                return Ok(None)
            }
            Err(e) => return Err(e.into()),
        };

        if !head.is_branch() {
            return Ok(None);
        }

        Ok(head.shorthand().map(str::to_string))
    }

    fn remotes(&self) -> Result<Vec<Remote>> {
        let names = self.repo.remotes()?;
        let mut remotes = Vec::new();

        for name in names.iter().flatten() {
            let remote = self.repo.find_remote(name)?;
            let urls = remote
                .url()
                .into_iter()
                .chain(remote.pushurl())
                .map(str::to_string)
                .collect();
            remotes.push(Remote::new(name, urls));
        }

        Ok(remotes)
    }

    fn local_branches(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for branch in self.repo.branches(Some(BranchType::Local))? {
            let (branch, _) = branch?;
            if let Some(name) = branch.name()? {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    fn remote_branches(&self, remote: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/", remote);
        let mut names = Vec::new();
        for branch in self.repo.branches(Some(BranchType::Remote))? {
            let (branch, _) = branch?;
            if let Some(short) = branch.name()?.and_then(|name| name.strip_prefix(&prefix)) {
                if short != "HEAD" {
                    names.push(short.to_string());
                }
            }
        }
        Ok(names)
    }

    fn changed_paths(&self) -> Result<Vec<PathBuf>> {
        // Untracked files are not pending changes.
        self.paths_with_status(|status| {
            !status.is_empty() && !status.is_ignored() && !status.is_wt_new()
        })
    }

    fn conflicted_paths(&self) -> Result<Vec<PathBuf>> {
        self.paths_with_status(|status| status.is_conflicted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_fresh_repository() {
        let dir = tempfile::tempdir().unwrap();
        Git2Repo::init(dir.path()).unwrap();

        let repo = Git2Repository::open(dir.path()).unwrap();
        assert_eq!(repo.current_branch().unwrap(), None);
        assert!(repo.remotes().unwrap().is_empty());
        assert!(repo.local_branches().unwrap().is_empty());
        assert!(repo.changed_paths().unwrap().is_empty());
    }

    #[test]
    fn test_untracked_file_is_not_a_change() {
        let dir = tempfile::tempdir().unwrap();
        let raw = Git2Repo::init(dir.path()).unwrap();
        std::fs::write(dir.path().join("scratch.log"), "noise").unwrap();

        let repo = Git2Repository::open(dir.path()).unwrap();
        assert!(repo.changed_paths().unwrap().is_empty());
        assert!(repo.conflicted_paths().unwrap().is_empty());

        std::fs::write(dir.path().join("notes.txt"), "draft").unwrap();
        let mut index = raw.index().unwrap();
        index.add_path(Path::new("notes.txt")).unwrap();
        index.write().unwrap();

        assert_eq!(repo.changed_paths().unwrap(), [PathBuf::from("notes.txt")]);
    }

    #[test]
    fn test_remote_urls() {
        let dir = tempfile::tempdir().unwrap();
        let raw = Git2Repo::init(dir.path()).unwrap();
        raw.remote("origin", "https://example.com/team/app.git")
            .unwrap();

        let repo = Git2Repository::from_git2(raw).unwrap();
        let remotes = repo.remotes().unwrap();
        assert_eq!(remotes.len(), 1);
        assert_eq!(remotes[0].name, "origin");
        assert_eq!(remotes[0].urls, ["https://example.com/team/app.git"]);
    }

    #[test]
    fn test_bare_repository_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let raw = Git2Repo::init_bare(dir.path()).unwrap();
        assert!(Git2Repository::from_git2(raw).is_err());
    }
}
