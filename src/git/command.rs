use std::fmt;

/// Git subcommands the workflow issues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitVerb {
    Fetch,
    Checkout,
    Pull,
    Merge,
    Push,
    Tag,
    Show,
    Branch,
    Add,
    Commit,
    Mergetool,
}

impl GitVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            GitVerb::Fetch => "fetch",
            GitVerb::Checkout => "checkout",
            GitVerb::Pull => "pull",
            GitVerb::Merge => "merge",
            GitVerb::Push => "push",
            GitVerb::Tag => "tag",
            GitVerb::Show => "show",
            GitVerb::Branch => "branch",
            GitVerb::Add => "add",
            GitVerb::Commit => "commit",
            GitVerb::Mergetool => "mergetool",
        }
    }

    /// Whether the command talks to a remote
    pub fn is_network(&self) -> bool {
        matches!(self, GitVerb::Fetch | GitVerb::Pull | GitVerb::Push)
    }
}

/// A fully built git invocation
///
/// Constructed fresh for every call; there is no shared handler state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCommand {
    pub verb: GitVerb,
    pub args: Vec<String>,
    /// URLs of the remote involved, for logging and credential lookup
    pub remote_urls: Vec<String>,
}

impl GitCommand {
    pub fn new(verb: GitVerb) -> Self {
        GitCommand {
            verb,
            args: Vec::new(),
            remote_urls: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_urls(mut self, urls: &[String]) -> Self {
        self.remote_urls = urls.to_vec();
        self
    }

    /// Arguments as passed to the `git` executable
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.verb.as_str().to_string())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// `git fetch <remote> <source>:<local> -f`
    ///
    /// Force-fetches a remote branch into a local branch of another name,
    /// overwriting a stale local ref.
    pub fn fetch_into(remote: &str, source: &str, local: &str) -> Self {
        GitCommand::new(GitVerb::Fetch)
            .arg(remote)
            .arg(format!("{}:{}", source, local))
            .arg("-f")
    }

    /// `git fetch <remote> --prune`, refreshing remote-tracking branches
    pub fn fetch_prune(remote: &str) -> Self {
        GitCommand::new(GitVerb::Fetch).arg(remote).arg("--prune")
    }

    /// `git checkout <branch>`
    pub fn checkout(branch: &str) -> Self {
        GitCommand::new(GitVerb::Checkout).arg(branch)
    }

    /// `git checkout -b <branch> <remote>/<branch>`
    pub fn checkout_tracking(remote: &str, branch: &str) -> Self {
        GitCommand::new(GitVerb::Checkout)
            .arg("-b")
            .arg(branch)
            .arg(format!("{}/{}", remote, branch))
    }

    /// `git pull <remote> <branch>:<branch>`
    pub fn pull(remote: &str, branch: &str) -> Self {
        GitCommand::new(GitVerb::Pull)
            .arg(remote)
            .arg(format!("{}:{}", branch, branch))
    }

    /// `git merge <branch>`
    pub fn merge(branch: &str) -> Self {
        GitCommand::new(GitVerb::Merge).arg(branch)
    }

    /// `git push <remote> <branch>:<branch> --tags [--set-upstream]`
    pub fn push(remote: &str, branch: &str, new_branch: bool) -> Self {
        let command = GitCommand::push_refspec(remote, branch, branch).arg("--tags");
        if new_branch {
            command.arg("--set-upstream")
        } else {
            command
        }
    }

    /// `git push <remote> <source>:<destination>`
    pub fn push_refspec(remote: &str, source: &str, destination: &str) -> Self {
        GitCommand::new(GitVerb::Push)
            .arg(remote)
            .arg(format!("{}:{}", source, destination))
    }

    /// `git push <remote> --delete <branch>`
    pub fn delete_remote_branch(remote: &str, branch: &str) -> Self {
        GitCommand::new(GitVerb::Push)
            .arg(remote)
            .arg("--delete")
            .arg(branch)
    }

    /// `git tag -a -f -m <message> <name>`
    pub fn annotated_tag(name: &str, message: &str) -> Self {
        GitCommand::new(GitVerb::Tag)
            .arg("-a")
            .arg("-f")
            .arg("-m")
            .arg(message)
            .arg(name)
    }

    /// `git show <remote>/<branch> -s --format=... --date=...`
    pub fn show_last_commit(remote: &str, branch: &str) -> Self {
        GitCommand::new(GitVerb::Show)
            .arg(format!("{}/{}", remote, branch))
            .arg("-s")
            .arg("--format=Author:%ae-Date:%ad-Message:%s")
            .arg("--date=format:%Y-%m-%d_%H:%M:%S")
    }

    /// `git branch -d|-D <branch>`
    pub fn delete_local_branch(branch: &str, force: bool) -> Self {
        GitCommand::new(GitVerb::Branch)
            .arg(if force { "-D" } else { "-d" })
            .arg(branch)
    }

    /// `git branch -m <old> <new>`
    pub fn rename_branch(old: &str, new: &str) -> Self {
        GitCommand::new(GitVerb::Branch).arg("-m").arg(old).arg(new)
    }

    /// `git add -- <paths>`
    pub fn add_paths<S: AsRef<str>>(paths: &[S]) -> Self {
        paths
            .iter()
            .fold(GitCommand::new(GitVerb::Add).arg("--"), |command, path| {
                command.arg(path.as_ref())
            })
    }

    /// `git checkout --ours|--theirs -- <path>`
    pub fn checkout_side(path: &str, ours: bool) -> Self {
        GitCommand::new(GitVerb::Checkout)
            .arg(if ours { "--ours" } else { "--theirs" })
            .arg("--")
            .arg(path)
    }

    /// `git commit --no-edit`, concluding a merge
    pub fn commit_no_edit() -> Self {
        GitCommand::new(GitVerb::Commit).arg("--no-edit")
    }

    /// `git mergetool --no-prompt -- <path>`
    pub fn mergetool(path: &str) -> Self {
        GitCommand::new(GitVerb::Mergetool)
            .arg("--no-prompt")
            .arg("--")
            .arg(path)
    }
}

impl fmt::Display for GitCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "git {}", self.argv().join(" "))
    }
}
