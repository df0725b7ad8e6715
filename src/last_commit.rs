//! Summary of the newest commit on a remote branch.

use std::fmt;

use regex::Regex;

use crate::error::Result;
use crate::git::{CommandGateway, GitCommand, Repository};
use crate::remote::default_remote;

/// Who touched a branch last, and when
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LastCommit {
    Parsed {
        author: String,
        date: String,
        message: String,
    },
    /// Output that did not match the expected format, kept verbatim
    Raw(String),
}

impl LastCommit {
    /// Parses `Author:<email>-Date:<yyyy-mm-dd_hh:mm:ss>-Message:<subject>`
    pub fn parse(output: &str) -> Self {
        let line = output.trim();
        if let Some(captures) = Regex::new(
            r"^Author:(.*?)-Date:(\d{4}-\d{2}-\d{2}_\d{2}:\d{2}:\d{2})-Message:(.*)$",
        )
        .ok()
        .and_then(|re| re.captures(line))
        {
            return LastCommit::Parsed {
                author: captures[1].to_string(),
                date: captures[2].to_string(),
                message: captures[3].to_string(),
            };
        }

        LastCommit::Raw(line.to_string())
    }
}

impl fmt::Display for LastCommit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LastCommit::Parsed {
                author,
                date,
                message,
            } => write!(
                f,
                "\n  Operator: {};\n  Time: {};\n  Message: {}",
                author, date, message
            ),
            LastCommit::Raw(text) => write!(f, "{}", text),
        }
    }
}

/// Looks up the newest commit of `branch` on the default remote.
///
/// A failed `git show` yields [LastCommit::Raw] with the error text.
pub fn remote_last_commit(
    repo: &dyn Repository,
    gateway: &dyn CommandGateway,
    branch: &str,
) -> Result<LastCommit> {
    let remote = default_remote(repo)?;
    let command = GitCommand::show_last_commit(&remote.name, branch).with_urls(&remote.urls);
    let outcome = gateway.run(&command, &mut [])?;

    if outcome.success {
        Ok(LastCommit::parse(&outcome.output_joined()))
    } else {
        Ok(LastCommit::Raw(outcome.error_output_joined()))
    }
}
