use std::io::Write;

use anyhow::anyhow;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::errors::AppError;

/// Line-oriented questions on stdin/stdout.
pub struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    pub fn stdin() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Prints `label` and returns the trimmed answer.
    pub async fn ask(&mut self, label: &str) -> Result<String, AppError> {
        print!("{label}: ");
        std::io::stdout()
            .flush()
            .map_err(|e| AppError::Internal(e.into()))?;
        match self.lines.next_line().await {
            Ok(Some(line)) => Ok(line.trim().to_string()),
            Ok(None) => Err(AppError::Internal(anyhow!("standard input closed"))),
            Err(e) => Err(AppError::Internal(e.into())),
        }
    }

    /// Asks until the answer is non-empty.
    pub async fn ask_required(&mut self, label: &str) -> Result<String, AppError> {
        loop {
            let answer = self.ask(label).await?;
            if !answer.is_empty() {
                return Ok(answer);
            }
        }
    }

    /// Numbered menu; asks until a listed number is entered.
    pub async fn choose<'a, T>(
        &mut self,
        label: &str,
        items: &'a [T],
        describe: impl Fn(&T) -> String,
    ) -> Result<&'a T, AppError> {
        if items.is_empty() {
            return Err(AppError::Validation("There is nothing to choose from".to_string()));
        }
        println!("{label}");
        for (i, item) in items.iter().enumerate() {
            println!("  {}) {}", i + 1, describe(item));
        }
        loop {
            let answer = self.ask("Enter a number").await?;
            match parse_choice(&answer, items.len()) {
                Some(index) => return Ok(&items[index]),
                None => println!("Please enter a number between 1 and {}.", items.len()),
            }
        }
    }
}

/// 1-based menu input to a 0-based index.
pub fn parse_choice(input: &str, len: usize) -> Option<usize> {
    match input.trim().parse::<usize>() {
        Ok(n) if (1..=len).contains(&n) => Some(n - 1),
        _ => None,
    }
}
