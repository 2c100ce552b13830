//! Bounded confirmation prompts.
//!
//! Reads from any `BufRead` and writes to any `Write`, so callers decide where
//! the terminal is and tests can script the answers.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::error::{Result, SearchError};

pub const DEFAULT_ATTEMPTS: usize = 3;

fn terminal_error(source: std::io::Error) -> SearchError {
    SearchError::Io {
        path: PathBuf::from("<terminal>"),
        source,
    }
}

/// Ask a yes/no question. An empty answer takes the default.
///
/// Fails with [`SearchError::InvalidResponse`] after `max_attempts` unusable
/// answers, or when input ends first.
pub fn yes_no<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
    default_yes: bool,
    max_attempts: usize,
) -> Result<bool> {
    let choices = if default_yes { "([y]/n)" } else { "(y/[n])" };
    let mut line = String::new();

    for _ in 0..max_attempts {
        write!(output, "{} {} ", prompt, choices).map_err(terminal_error)?;
        output.flush().map_err(terminal_error)?;

        line.clear();
        if input.read_line(&mut line).map_err(terminal_error)? == 0 {
            break;
        }
        match line.trim().to_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            "" => return Ok(default_yes),
            _ => {}
        }
    }

    Err(SearchError::InvalidResponse {
        attempts: max_attempts,
    })
}
