//! User interface module - interaction (prompts) and formatting.
//!
//! Separates concerns:
//! - `formatter` - Pure formatting functions
//! - This module - Interactive prompts and user input handling

use std::io::{self, BufRead, Write};

use anyhow::Result;

pub mod formatter;

pub use formatter::{
    display_error, display_lock_status, display_status, display_success, display_warning,
    format_changed_paths,
};

/// Prompts user to pick one of `options`, reading the answer from `input`.
///
/// Displays a numbered list and accepts a 1-based index. Default selection is
/// the first option if user presses Enter. An invalid answer is reported and
/// the question asked again.
///
/// # Returns
/// * `Ok(Some(usize))` - 0-based index of the chosen option
/// * `Ok(None)` - Input ended before a valid answer
/// * `Err` - If there are no options or input fails
pub fn select_option_from<R: BufRead>(
    input: &mut R,
    prompt: &str,
    options: &[&str],
) -> Result<Option<usize>> {
    if options.is_empty() {
        return Err(anyhow::anyhow!("No options to choose from"));
    }

    println!("\n{}", console::style(prompt).bold());
    for (i, option) in options.iter().enumerate() {
        println!("  {}. {}", i + 1, option);
    }

    loop {
        print!("\nSelect (1-{}) [default: 1]: ", options.len());
        io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let selection = line.trim();

        let index = if selection.is_empty() {
            1
        } else {
            selection.parse::<usize>().unwrap_or(0)
        };

        if index > 0 && index <= options.len() {
            return Ok(Some(index - 1));
        }
        display_warning(&format!(
            "Invalid selection '{}', enter a number from 1 to {}",
            selection,
            options.len()
        ));
    }
}

/// Prompts user to confirm an action with a yes/no prompt.
///
/// Accepts "y" or "yes" (case-insensitive). Default is "no".
pub fn confirm_action(prompt: &str) -> Result<bool> {
    print!("\n{} (y/N): ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let response = input.trim().to_lowercase();
    Ok(response == "y" || response == "yes")
}
