//! In-memory doubles for driving the workflow without a real repository.
//!
//! [MockRepository] holds a fake working copy and [MockGateway] applies git
//! commands to it with just enough semantics for the release workflow:
//! branch checkout, tracking branches, forced fetches, pushes that report
//! `[new branch]`, remote deletion, merges that can be told to conflict.
//! Several repositories can share one [MockRemote] to model collaborators.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::Result;
use crate::git::{
    CommandGateway, CommandOutcome, GitCommand, GitVerb, LineObserver, OutputLine, Remote,
    Repository,
};

/// Branches on a shared fake remote, keyed by name with a fake tip id
#[derive(Debug, Clone, Default)]
pub struct MockRemote {
    branches: Rc<RefCell<BTreeMap<String, u32>>>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a branch to the remote
    pub fn add_branch(&self, name: impl Into<String>) {
        self.branches.borrow_mut().insert(name.into(), 1);
    }

    pub fn has_branch(&self, name: &str) -> bool {
        self.branches.borrow().contains_key(name)
    }

    pub fn branch_names(&self) -> Vec<String> {
        self.branches.borrow().keys().cloned().collect()
    }
}

#[derive(Debug, Default)]
struct LocalState {
    current: Option<String>,
    local: BTreeSet<String>,
    changed: Vec<PathBuf>,
    conflicted: Vec<PathBuf>,
    tags: BTreeMap<String, String>,
}

/// Mock working copy
pub struct MockRepository {
    root: PathBuf,
    remotes: Vec<Remote>,
    state: Rc<RefCell<LocalState>>,
    remote: MockRemote,
}

impl MockRepository {
    /// Working copy with an `origin` remote backed by `remote`, on branch `current`
    pub fn new(root: impl Into<PathBuf>, remote: &MockRemote, current: &str) -> Self {
        let repo = MockRepository {
            root: root.into(),
            remotes: vec![Remote::new(
                "origin",
                vec!["git@example.com:team/app.git".to_string()],
            )],
            state: Rc::default(),
            remote: remote.clone(),
        };
        repo.add_local_branch(current);
        repo.state.borrow_mut().current = Some(current.to_string());
        repo
    }

    /// Replace the configured remotes (an empty list models "no remote")
    pub fn with_remotes(mut self, remotes: Vec<Remote>) -> Self {
        self.remotes = remotes;
        self
    }

    pub fn add_local_branch(&self, name: impl Into<String>) {
        self.state.borrow_mut().local.insert(name.into());
    }

    /// Mark a path as modified in the working tree
    pub fn add_change(&self, path: impl Into<PathBuf>) {
        self.state.borrow_mut().changed.push(path.into());
    }

    pub fn has_local_branch(&self, name: &str) -> bool {
        self.state.borrow().local.contains(name)
    }

    /// Message of a local tag, if it exists
    pub fn tag_message(&self, name: &str) -> Option<String> {
        self.state.borrow().tags.get(name).cloned()
    }
}

impl Repository for MockRepository {
    fn root(&self) -> &Path {
        &self.root
    }

    fn current_branch(&self) -> Result<Option<String>> {
        Ok(self.state.borrow().current.clone())
    }

    fn remotes(&self) -> Result<Vec<Remote>> {
        Ok(self.remotes.clone())
    }

    fn local_branches(&self) -> Result<Vec<String>> {
        Ok(self.state.borrow().local.iter().cloned().collect())
    }

    fn remote_branches(&self, remote: &str) -> Result<Vec<String>> {
        if self.remotes.iter().any(|r| r.name == remote) {
            Ok(self.remote.branch_names())
        } else {
            Ok(Vec::new())
        }
    }

    fn changed_paths(&self) -> Result<Vec<PathBuf>> {
        Ok(self.state.borrow().changed.clone())
    }

    fn conflicted_paths(&self) -> Result<Vec<PathBuf>> {
        Ok(self.state.borrow().conflicted.clone())
    }
}

/// Gateway that applies commands to a [MockRepository] and records them
pub struct MockGateway {
    state: Rc<RefCell<LocalState>>,
    remote: MockRemote,
    commands: RefCell<Vec<GitCommand>>,
    failures: RefCell<Vec<(String, String)>>,
    merge_conflicts: RefCell<Vec<PathBuf>>,
}

impl MockGateway {
    pub fn new(repo: &MockRepository) -> Self {
        MockGateway {
            state: Rc::clone(&repo.state),
            remote: repo.remote.clone(),
            commands: RefCell::default(),
            failures: RefCell::default(),
            merge_conflicts: RefCell::default(),
        }
    }

    /// Make every command whose rendering starts with `prefix` fail with `stderr`
    ///
    /// `prefix` is matched against e.g. `"git pull origin release:release"`.
    pub fn fail_on(&self, prefix: impl Into<String>, stderr: impl Into<String>) {
        self.failures
            .borrow_mut()
            .push((prefix.into(), stderr.into()));
    }

    /// Make the next merge stop with conflicts in `paths`
    pub fn conflict_on_merge<P: Into<PathBuf>>(&self, paths: impl IntoIterator<Item = P>) {
        *self.merge_conflicts.borrow_mut() = paths.into_iter().map(Into::into).collect();
    }

    /// Every command run so far, rendered as `git ...`
    pub fn commands(&self) -> Vec<String> {
        self.commands
            .borrow()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    /// Number of commands that reached the network
    pub fn network_calls(&self) -> usize {
        self.commands
            .borrow()
            .iter()
            .filter(|c| c.verb.is_network())
            .count()
    }

    pub fn clear_commands(&self) {
        self.commands.borrow_mut().clear();
    }

    fn scripted_failure(&self, rendered: &str) -> Option<CommandOutcome> {
        self.failures
            .borrow()
            .iter()
            .find(|(prefix, _)| rendered.starts_with(prefix.as_str()))
            .map(|(_, stderr)| CommandOutcome::failed(stderr.clone()))
    }

    fn apply(&self, command: &GitCommand) -> CommandOutcome {
        let args: Vec<&str> = command.args.iter().map(String::as_str).collect();
        match (command.verb, args.as_slice()) {
            (GitVerb::Checkout, ["-b", branch, upstream]) => {
                self.checkout_tracking(branch, upstream)
            }
            (GitVerb::Checkout, [side @ ("--ours" | "--theirs"), "--", _path]) => {
                CommandOutcome::ok(vec![format!("Updated 1 path ({})", side)])
            }
            (GitVerb::Checkout, [branch]) => self.checkout(branch),
            (GitVerb::Fetch, [_remote, refspec, "-f"]) => self.fetch_into(refspec),
            (GitVerb::Pull, [_remote, refspec]) => self.pull(refspec),
            (GitVerb::Merge, [branch]) => self.merge(branch),
            (GitVerb::Push, [_remote, "--delete", branch]) => self.delete_remote(branch),
            (GitVerb::Push, [_remote, refspec, ..]) => self.push(refspec),
            (GitVerb::Tag, ["-a", "-f", "-m", message, name]) => {
                self.state
                    .borrow_mut()
                    .tags
                    .insert(name.to_string(), message.to_string());
                CommandOutcome::ok(Vec::new())
            }
            (GitVerb::Show, _) => CommandOutcome::ok(vec![
                "Author:dev@example.com-Date:2024-05-01_10:20:30-Message:fix login".to_string(),
            ]),
            (GitVerb::Branch, ["-m", old, new]) => self.rename(old, new),
            (GitVerb::Branch, [_flag, branch]) => self.delete_local(branch),
            (GitVerb::Add, ["--", paths @ ..]) => {
                self.state
                    .borrow_mut()
                    .conflicted
                    .retain(|p| !paths.iter().any(|added| p == Path::new(added)));
                CommandOutcome::ok(Vec::new())
            }
            (GitVerb::Commit, _) => {
                if self.state.borrow().conflicted.is_empty() {
                    CommandOutcome::ok(vec!["[release 0000001] Merge".to_string()])
                } else {
                    CommandOutcome::failed(
                        "error: Committing is not possible because you have unmerged files.",
                    )
                }
            }
            _ => CommandOutcome::ok(Vec::new()),
        }
    }

    fn checkout(&self, branch: &str) -> CommandOutcome {
        let mut state = self.state.borrow_mut();
        if state.local.contains(branch) {
            state.current = Some(branch.to_string());
            CommandOutcome {
                success: true,
                stdout: Vec::new(),
                stderr: vec![format!("Switched to branch '{}'", branch)],
            }
        } else {
            CommandOutcome::failed(format!(
                "error: pathspec '{}' did not match any file(s) known to git",
                branch
            ))
        }
    }

    fn checkout_tracking(&self, branch: &str, upstream: &str) -> CommandOutcome {
        let remote_name = upstream.split_once('/').map(|(_, b)| b).unwrap_or(upstream);
        if !self.remote.has_branch(remote_name) {
            return CommandOutcome::failed(format!(
                "fatal: '{}' is not a commit and a branch '{}' cannot be created from it",
                upstream, branch
            ));
        }
        let mut state = self.state.borrow_mut();
        if !state.local.insert(branch.to_string()) {
            return CommandOutcome::failed(format!(
                "fatal: a branch named '{}' already exists",
                branch
            ));
        }
        state.current = Some(branch.to_string());
        CommandOutcome::ok(vec![format!(
            "branch '{}' set up to track '{}'.",
            branch, upstream
        )])
    }

    fn fetch_into(&self, refspec: &str) -> CommandOutcome {
        let Some((source, local)) = refspec.split_once(':') else {
            return CommandOutcome::failed(format!("fatal: invalid refspec '{}'", refspec));
        };
        if !self.remote.has_branch(source) {
            return CommandOutcome::failed(format!("fatal: couldn't find remote ref {}", source));
        }
        self.state.borrow_mut().local.insert(local.to_string());
        CommandOutcome {
            success: true,
            stdout: Vec::new(),
            stderr: vec![format!(" * [new branch]      {} -> {}", source, local)],
        }
    }

    fn pull(&self, refspec: &str) -> CommandOutcome {
        let source = refspec.split(':').next().unwrap_or(refspec);
        if self.remote.has_branch(source) {
            CommandOutcome::ok(vec!["Already up to date.".to_string()])
        } else {
            CommandOutcome::failed(format!("fatal: couldn't find remote ref {}", source))
        }
    }

    fn merge(&self, branch: &str) -> CommandOutcome {
        if !self.state.borrow().local.contains(branch) {
            return CommandOutcome::failed(format!(
                "merge: {} - not something we can merge",
                branch
            ));
        }
        let conflicts = std::mem::take(&mut *self.merge_conflicts.borrow_mut());
        if conflicts.is_empty() {
            return CommandOutcome::ok(vec!["Merge made by the 'ort' strategy.".to_string()]);
        }

        let mut stdout: Vec<String> = conflicts
            .iter()
            .map(|p| format!("CONFLICT (content): Merge conflict in {}", p.display()))
            .collect();
        stdout.push(
            "Automatic merge failed; fix conflicts and then commit the result.".to_string(),
        );
        self.state.borrow_mut().conflicted = conflicts;

        CommandOutcome {
            success: false,
            stdout,
            stderr: Vec::new(),
        }
    }

    fn push(&self, refspec: &str) -> CommandOutcome {
        let Some((source, destination)) = refspec.split_once(':') else {
            return CommandOutcome::failed(format!("fatal: invalid refspec '{}'", refspec));
        };
        if !self.state.borrow().local.contains(source) {
            return CommandOutcome::failed(format!(
                "error: src refspec {} does not match any",
                source
            ));
        }

        let mut branches = self.remote.branches.borrow_mut();
        let line = match branches.get_mut(destination) {
            Some(tip) => {
                let old = *tip;
                *tip += 1;
                format!("   {:07x}..{:07x}  {} -> {}", old, *tip, source, destination)
            }
            None => {
                branches.insert(destination.to_string(), 1);
                format!(" * [new branch]      {} -> {}", source, destination)
            }
        };

        CommandOutcome {
            success: true,
            stdout: Vec::new(),
            stderr: vec!["To git@example.com:team/app.git".to_string(), line],
        }
    }

    fn delete_remote(&self, branch: &str) -> CommandOutcome {
        if self.remote.branches.borrow_mut().remove(branch).is_some() {
            CommandOutcome {
                success: true,
                stdout: Vec::new(),
                stderr: vec![format!(" - [deleted]         {}", branch)],
            }
        } else {
            CommandOutcome::failed(format!(
                "error: unable to delete '{}': remote ref does not exist",
                branch
            ))
        }
    }

    fn delete_local(&self, branch: &str) -> CommandOutcome {
        let mut state = self.state.borrow_mut();
        if state.current.as_deref() == Some(branch) {
            return CommandOutcome::failed(format!(
                "error: Cannot delete branch '{}' checked out",
                branch
            ));
        }
        if state.local.remove(branch) {
            CommandOutcome::ok(vec![format!("Deleted branch {}.", branch)])
        } else {
            CommandOutcome::failed(format!("error: branch '{}' not found.", branch))
        }
    }

    fn rename(&self, old: &str, new: &str) -> CommandOutcome {
        let mut state = self.state.borrow_mut();
        if !state.local.remove(old) {
            return CommandOutcome::failed(format!("error: refname refs/heads/{} not found", old));
        }
        state.local.insert(new.to_string());
        if state.current.as_deref() == Some(old) {
            state.current = Some(new.to_string());
        }
        CommandOutcome::ok(Vec::new())
    }
}

impl CommandGateway for MockGateway {
    fn run(
        &self,
        command: &GitCommand,
        observers: &mut [&mut dyn LineObserver],
    ) -> Result<CommandOutcome> {
        self.commands.borrow_mut().push(command.clone());
        let rendered = command.to_string();

        let outcome = self
            .scripted_failure(&rendered)
            .unwrap_or_else(|| self.apply(command));

        for text in &outcome.stdout {
            let line = OutputLine::stdout(text.as_str());
            for observer in observers.iter_mut() {
                observer.on_line(&line);
            }
        }
        for text in &outcome.stderr {
            let line = OutputLine::stderr(text.as_str());
            for observer in observers.iter_mut() {
                observer.on_line(&line);
            }
        }

        Ok(outcome)
    }
}
