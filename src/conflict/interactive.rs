use std::io::{self, BufRead, BufReader, Stdin};
use std::path::PathBuf;

use crate::conflict::{ConflictResolver, Resolution};
use crate::error::{ReleaseFlowError, Result};
use crate::git::CommandGateway;
use crate::ui;

const CHOICES: [(&str, Resolution); 4] = [
    ("Open merge tool", Resolution::Manual),
    ("Keep target branch version (ours)", Resolution::Ours),
    ("Take merged branch version (theirs)", Resolution::Theirs),
    ("Leave unresolved", Resolution::Skip),
];

/// Asks the operator how to settle each conflicting file
pub struct InteractiveResolver<R: BufRead> {
    input: R,
}

impl InteractiveResolver<BufReader<Stdin>> {
    /// Resolver reading answers from standard input
    pub fn stdin() -> Self {
        InteractiveResolver::new(BufReader::new(io::stdin()))
    }
}

impl<R: BufRead> InteractiveResolver<R> {
    pub fn new(input: R) -> Self {
        InteractiveResolver { input }
    }
}

impl<R: BufRead> ConflictResolver for InteractiveResolver<R> {
    fn resolve_conflicts(
        &mut self,
        gateway: &dyn CommandGateway,
        paths: &[PathBuf],
    ) -> Result<Vec<PathBuf>> {
        let labels: Vec<&str> = CHOICES.iter().map(|(label, _)| *label).collect();
        let mut resolved = Vec::new();

        for (i, path) in paths.iter().enumerate() {
            let prompt = format!(
                "Conflict {}/{}: {}",
                i + 1,
                paths.len(),
                path.display()
            );
            let choice = ui::select_option_from(&mut self.input, &prompt, &labels)
                .map_err(|e| ReleaseFlowError::conflict(e.to_string()))?;
            let resolution = match choice {
                Some(choice) => CHOICES[choice].1,
                // No operator left to answer.
                None => Resolution::Skip,
            };

            if resolution.apply(gateway, &path.display().to_string())? {
                resolved.push(path.clone());
            }
        }

        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::{MockGateway, MockRemote, MockRepository};

    #[test]
    fn test_answers_drive_resolutions() {
        let repo = MockRepository::new("/work/app", &MockRemote::new(), "release");
        let gateway = MockGateway::new(&repo);
        let mut resolver = InteractiveResolver::new("2\n3\n4\n".as_bytes());

        let resolved = resolver
            .resolve_conflicts(
                &gateway,
                &[
                    PathBuf::from("a.txt"),
                    PathBuf::from("b.txt"),
                    PathBuf::from("c.txt"),
                ],
            )
            .unwrap();

        assert_eq!(resolved, [PathBuf::from("a.txt"), PathBuf::from("b.txt")]);
        assert_eq!(
            gateway.commands(),
            [
                "git checkout --ours -- a.txt",
                "git checkout --theirs -- b.txt",
            ]
        );
    }

    #[test]
    fn test_typo_is_asked_again() {
        let repo = MockRepository::new("/work/app", &MockRemote::new(), "release");
        let gateway = MockGateway::new(&repo);
        let mut resolver = InteractiveResolver::new("x\n9\n3\n".as_bytes());

        let resolved = resolver
            .resolve_conflicts(&gateway, &[PathBuf::from("a.txt")])
            .unwrap();

        assert_eq!(resolved, [PathBuf::from("a.txt")]);
        assert_eq!(gateway.commands(), ["git checkout --theirs -- a.txt"]);
    }

    #[test]
    fn test_closed_input_leaves_files_unresolved() {
        let repo = MockRepository::new("/work/app", &MockRemote::new(), "release");
        let gateway = MockGateway::new(&repo);
        let mut resolver = InteractiveResolver::new("".as_bytes());

        let resolved = resolver
            .resolve_conflicts(&gateway, &[PathBuf::from("a.txt"), PathBuf::from("b.txt")])
            .unwrap();

        assert!(resolved.is_empty());
        assert!(gateway.commands().is_empty());
    }
}
