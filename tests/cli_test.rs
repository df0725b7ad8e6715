// tests/cli_test.rs
use std::process::Command;

const BIN: &str = env!("CARGO_BIN_EXE_git-release-flow");

#[test]
fn test_help_lists_subcommands() {
    let output = Command::new(BIN)
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("git-release-flow"));
    for subcommand in ["start", "publish", "unlock", "status", "new-branch", "init-config"] {
        assert!(stdout.contains(subcommand), "missing {}", subcommand);
    }
}

#[test]
fn test_version() {
    let output = Command::new(BIN)
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_message_requires_tag() {
    let output = Command::new(BIN)
        .args(["publish", "--message", "notes"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_unreadable_config_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(BIN)
        .args(["--config", "/nonexistent/gitflow.toml", "status"])
        .current_dir(dir.path())
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Error loading config"));
}
