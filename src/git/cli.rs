use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Sender};
use std::thread;

use tracing::{debug, warn};

use crate::error::Result;
use crate::git::{
    CommandGateway, CommandOutcome, GitCommand, GitVerb, LineObserver, OutputLine, OutputStream,
};

/// Runs commands through the `git` executable in a working tree
pub struct CliGateway {
    root: PathBuf,
    program: PathBuf,
}

impl CliGateway {
    /// Create a gateway bound to the working tree at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        CliGateway {
            root: root.into(),
            program: PathBuf::from("git"),
        }
    }

    /// Use a different git executable
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Mergetool needs the operator's terminal, so its output is not captured.
    fn run_attached(&self, command: &GitCommand) -> Result<CommandOutcome> {
        let status = Command::new(&self.program)
            .args(command.argv())
            .current_dir(&self.root)
            .status()?;

        Ok(CommandOutcome {
            success: status.success(),
            stdout: Vec::new(),
            stderr: Vec::new(),
        })
    }
}

impl CommandGateway for CliGateway {
    fn run(
        &self,
        command: &GitCommand,
        observers: &mut [&mut dyn LineObserver],
    ) -> Result<CommandOutcome> {
        debug!(command = %command, urls = ?command.remote_urls, "running git");

        if command.verb == GitVerb::Mergetool {
            return self.run_attached(command);
        }

        // Output is matched against English markers ("new branch", "CONFLICT").
        let mut child = Command::new(&self.program)
            .args(command.argv())
            .current_dir(&self.root)
            .env("LC_ALL", "C")
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        thread::scope(|scope| {
            let (tx, rx) = mpsc::channel();
            if let Some(pipe) = stdout_pipe {
                let tx = tx.clone();
                scope.spawn(move || forward_lines(pipe, OutputStream::Stdout, tx));
            }
            if let Some(pipe) = stderr_pipe {
                let tx = tx.clone();
                scope.spawn(move || forward_lines(pipe, OutputStream::Stderr, tx));
            }
            drop(tx);

            // Observers only ever run on the calling thread.
            for line in rx {
                for observer in observers.iter_mut() {
                    observer.on_line(&line);
                }
                match line.stream {
                    OutputStream::Stdout => stdout.push(line.text),
                    OutputStream::Stderr => stderr.push(line.text),
                }
            }
        });

        let status = child.wait()?;
        if !status.success() {
            warn!(command = %command, code = ?status.code(), "git command failed");
        }

        Ok(CommandOutcome {
            success: status.success(),
            stdout,
            stderr,
        })
    }
}

fn forward_lines<R: Read>(reader: R, stream: OutputStream, tx: Sender<OutputLine>) {
    for chunk in BufReader::new(reader).split(b'\n') {
        let Ok(bytes) = chunk else { break };
        let text = String::from_utf8_lossy(&bytes)
            .trim_end_matches('\r')
            .to_string();
        if tx.send(OutputLine { stream, text }).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_an_error() {
        let gateway = CliGateway::new(".").with_program("/nonexistent/git-binary");
        let result = gateway.run(&GitCommand::checkout("main"), &mut []);
        assert!(result.is_err());
    }

    #[test]
    fn test_forward_lines_splits_and_trims() {
        let (tx, rx) = mpsc::channel();
        forward_lines(
            "one\r\ntwo\nthree".as_bytes(),
            OutputStream::Stderr,
            tx,
        );
        let lines: Vec<String> = rx.iter().map(|l| l.text).collect();
        assert_eq!(lines, ["one", "two", "three"]);
    }
}
