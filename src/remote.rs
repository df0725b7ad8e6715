//! Default remote selection.

use std::cmp::Ordering;

use tracing::debug;

use crate::error::{ReleaseFlowError, Result};
use crate::git::{Remote, Repository};

/// Orders remotes with "origin" first, followed by others alphabetically.
fn remote_order(a: &Remote, b: &Remote) -> Ordering {
    match (a.name == "origin", b.name == "origin") {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.name.cmp(&b.name),
    }
}

/// Returns the first remote of `repo` in a stable order.
///
/// # Returns
/// * `Ok(Remote)` - "origin" when configured, otherwise the alphabetically first remote
/// * `Err(NoRemote)` - If the repository has no remote at all
pub fn default_remote<R: Repository + ?Sized>(repo: &R) -> Result<Remote> {
    let mut remotes = repo.remotes()?;
    remotes.sort_by(remote_order);

    let remote = remotes
        .into_iter()
        .next()
        .ok_or_else(|| ReleaseFlowError::NoRemote(repo.root().display().to_string()))?;

    debug!(remote = %remote.name, "resolved default remote");
    Ok(remote)
}
