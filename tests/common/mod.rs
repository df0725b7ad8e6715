// tests/common/mod.rs
//! Real git fixtures: a bare "shared" remote and working clones of it.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

/// Runs git in `dir` and panics with its stderr on failure
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("LC_ALL", "C")
        .output()
        .expect("Failed to execute git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A bare remote with one commit on `master`
pub struct SharedRemote {
    pub dir: TempDir,
    pub bare: PathBuf,
}

impl SharedRemote {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let bare = dir.path().join("remote.git");
        fs::create_dir(&bare).unwrap();
        git(&bare, &["init", "--bare", "-q"]);
        git(&bare, &["symbolic-ref", "HEAD", "refs/heads/master"]);

        let seed = dir.path().join("seed");
        fs::create_dir(&seed).unwrap();
        git(&seed, &["init", "-q"]);
        git(&seed, &["symbolic-ref", "HEAD", "refs/heads/master"]);
        configure_identity(&seed);
        commit_file(&seed, "README.md", "hello\n", "initial commit");
        git(&seed, &["remote", "add", "origin", bare.to_str().unwrap()]);
        git(&seed, &["push", "-q", "origin", "master"]);

        SharedRemote { dir, bare }
    }

    /// Clone the remote into `name`, with an identity configured
    pub fn clone_as(&self, name: &str) -> PathBuf {
        let work = self.dir.path().join(name);
        git(
            self.dir.path(),
            &["clone", "-q", self.bare.to_str().unwrap(), name],
        );
        configure_identity(&work);
        work
    }

    /// Branch names on the remote
    pub fn branches(&self) -> Vec<String> {
        git(
            &self.bare,
            &["for-each-ref", "--format=%(refname:short)", "refs/heads"],
        )
        .lines()
        .map(str::to_string)
        .collect()
    }

    /// Tag names on the remote
    pub fn tags(&self) -> Vec<String> {
        git(&self.bare, &["tag", "--list"])
            .lines()
            .map(str::to_string)
            .collect()
    }
}

pub fn configure_identity(dir: &Path) {
    git(dir, &["config", "user.name", "Release Bot"]);
    git(dir, &["config", "user.email", "release@example.com"]);
}

pub fn commit_file(dir: &Path, name: &str, contents: &str, message: &str) {
    fs::write(dir.join(name), contents).unwrap();
    git(dir, &["add", name]);
    git(dir, &["commit", "-q", "-m", message]);
}
