//! Pure formatting functions for UI output.
//!
//! This module contains all display/formatting logic separated from user interaction.

use std::path::PathBuf;

use console::style;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Format and print a warning with a yellow warning icon.
pub fn display_warning(message: &str) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), message);
}

/// Renders a listing of changed paths, one per line, indented.
pub fn format_changed_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| format!("  {}", path.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Display the lock state and current branch for `status`.
pub fn display_lock_status(project: &str, branch: Option<&str>, locked: bool) {
    println!("{}", style(project).bold());
    println!("  Branch: {}", style(branch.unwrap_or("(detached)")).cyan());
    if locked {
        println!("  Release: {}", style("locked").red());
    } else {
        println!("  Release: {}", style("free").green());
    }
}
