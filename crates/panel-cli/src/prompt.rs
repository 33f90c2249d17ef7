//! Operator confirmation for destructive actions.

use std::io::{self, BufRead, Write};

/// How confirmations are answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Confirmation {
    /// Ask on stdin.
    #[default]
    Prompt,
    AssumeYes,
    AssumeNo,
}

impl Confirmation {
    pub fn from_flags(assume_yes: bool, assume_no: bool) -> Self {
        match (assume_yes, assume_no) {
            (true, _) => Self::AssumeYes,
            (_, true) => Self::AssumeNo,
            _ => Self::Prompt,
        }
    }

    /// Resolves `question` to a decision, asking on stdin when needed.
    pub fn confirm(self, question: &str) -> io::Result<bool> {
        match self {
            Self::AssumeYes => Ok(true),
            Self::AssumeNo => Ok(false),
            Self::Prompt => {
                let stdin = io::stdin();
                let mut input = stdin.lock();
                prompt_confirm(question, &mut input, &mut io::stdout())
            }
        }
    }
}

/// Asks `question` until the answer is `y` or `n`. An empty answer or end of
/// input counts as no.
pub fn prompt_confirm<R: BufRead, W: Write>(
    question: &str,
    input: &mut R,
    output: &mut W,
) -> io::Result<bool> {
    let mut line = String::new();
    loop {
        line.clear();
        write!(output, "{question} (y/N): ")?;
        output.flush()?;
        if input.read_line(&mut line)? == 0 {
            return Ok(false);
        }
        match line.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "" | "n" | "no" => return Ok(false),
            _ => continue,
        }
    }
}
