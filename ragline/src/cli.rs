//! Line based prompts for the interactive binaries.
use std::io::Write as _;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt as _, BufReader, Lines, Stdin};

pub const RULE: &str = "==================================================";

/// Words that end an interactive loop.
pub fn is_exit(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "quit" | "exit")
}

/// Reads answers from stdin.
#[derive(Debug)]
pub struct Prompter {
    lines: Lines<BufReader<Stdin>>,
}

impl Default for Prompter {
    fn default() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Prompter {
    /// Prints `label` and reads one line. `None` once stdin is closed.
    ///
    /// # Errors
    ///
    /// Errors if stdin or stdout fail.
    pub async fn ask(&mut self, label: &str) -> Result<Option<String>> {
        print!("{label}");
        std::io::stdout().flush()?;

        Ok(self.lines.next_line().await?)
    }

    /// Asks a yes/no question, anything but `y` is a no.
    ///
    /// # Errors
    ///
    /// Errors if stdin or stdout fail.
    pub async fn confirm(&mut self, label: &str) -> Result<bool> {
        Ok(self
            .ask(label)
            .await?
            .is_some_and(|answer| answer.trim().eq_ignore_ascii_case("y")))
    }
}
