//! ui::prompts
//!
//! Interactive prompts and confirmations.
//!
//! # Design
//!
//! Prompts are only shown in interactive mode. In non-interactive mode,
//! operations requiring user input must either have defaults or fail
//! with a clear error message.
//!
//! Each prompt has a reader/writer variant (`*_with`) so the parsing can be
//! exercised without a terminal.

use std::io::{self, BufRead, Write};

use thiserror::Error;

/// Errors from prompts.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt cancelled by user")]
    Cancelled,

    #[error("not in interactive mode")]
    NotInteractive,

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<io::Error> for PromptError {
    fn from(e: io::Error) -> Self {
        PromptError::IoError(e.to_string())
    }
}

fn read_line(reader: &mut impl BufRead) -> Result<String, PromptError> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        // EOF (Ctrl-D) means the user walked away.
        return Err(PromptError::Cancelled);
    }
    Ok(line.trim().to_string())
}

/// Prompt for confirmation (yes/no).
///
/// Returns `Ok(true)` if the user confirms, `Ok(false)` if they decline.
/// Returns `Err(PromptError::NotInteractive)` if not in interactive mode.
pub fn confirm(message: &str, default: bool, interactive: bool) -> Result<bool, PromptError> {
    if !interactive {
        return Err(PromptError::NotInteractive);
    }
    confirm_with(message, default, &mut io::stdin().lock(), &mut io::stderr())
}

pub fn confirm_with(
    message: &str,
    default: bool,
    reader: &mut impl BufRead,
    writer: &mut impl Write,
) -> Result<bool, PromptError> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    loop {
        write!(writer, "{} {} ", message, hint)?;
        writer.flush()?;
        match read_line(reader)?.to_ascii_lowercase().as_str() {
            "" => return Ok(default),
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => writeln!(writer, "Please answer y or n.")?,
        }
    }
}

/// Prompt for text input.
///
/// An empty answer takes `default` when there is one.
pub fn input(message: &str, default: Option<&str>, interactive: bool) -> Result<String, PromptError> {
    if !interactive {
        return Err(PromptError::NotInteractive);
    }
    input_with(message, default, &mut io::stdin().lock(), &mut io::stderr())
}

pub fn input_with(
    message: &str,
    default: Option<&str>,
    reader: &mut impl BufRead,
    writer: &mut impl Write,
) -> Result<String, PromptError> {
    match default {
        Some(d) => write!(writer, "{} [{}]: ", message, d)?,
        None => write!(writer, "{}: ", message)?,
    }
    writer.flush()?;
    let answer = read_line(reader)?;
    Ok(match (answer.is_empty(), default) {
        (true, Some(d)) => d.to_string(),
        _ => answer,
    })
}

/// Answer to [`select_or_enter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    /// Index into the offered options
    Existing(usize),
    /// Free text that matched no option number
    Entered(String),
}

/// Prompt to select from a list of options.
///
/// Returns the index of the selected option.
pub fn select<T: AsRef<str>>(
    message: &str,
    options: &[T],
    default: Option<usize>,
    interactive: bool,
) -> Result<usize, PromptError> {
    if !interactive {
        return Err(PromptError::NotInteractive);
    }
    select_with(message, options, default, &mut io::stdin().lock(), &mut io::stderr())
}

pub fn select_with<T: AsRef<str>>(
    message: &str,
    options: &[T],
    default: Option<usize>,
    reader: &mut impl BufRead,
    writer: &mut impl Write,
) -> Result<usize, PromptError> {
    if options.is_empty() {
        return Err(PromptError::Cancelled);
    }
    loop {
        write_options(message, options, writer)?;
        let answer = read_line(reader)?;
        if answer.is_empty() {
            if let Some(d) = default.filter(|d| *d < options.len()) {
                return Ok(d);
            }
        }
        match parse_index(&answer, options.len()) {
            Some(i) => return Ok(i),
            None => writeln!(writer, "Enter a number between 1 and {}.", options.len())?,
        }
    }
}

/// Offer numbered options, or accept a new name typed in their place.
pub fn select_or_enter<T: AsRef<str>>(
    message: &str,
    options: &[T],
    interactive: bool,
) -> Result<Choice, PromptError> {
    if !interactive {
        return Err(PromptError::NotInteractive);
    }
    select_or_enter_with(message, options, &mut io::stdin().lock(), &mut io::stderr())
}

pub fn select_or_enter_with<T: AsRef<str>>(
    message: &str,
    options: &[T],
    reader: &mut impl BufRead,
    writer: &mut impl Write,
) -> Result<Choice, PromptError> {
    loop {
        write_options(message, options, writer)?;
        let answer = read_line(reader)?;
        if answer.is_empty() {
            continue;
        }
        if let Some(i) = parse_index(&answer, options.len()) {
            return Ok(Choice::Existing(i));
        }
        if let Some(i) = options.iter().position(|o| o.as_ref() == answer) {
            return Ok(Choice::Existing(i));
        }
        return Ok(Choice::Entered(answer));
    }
}

fn write_options<T: AsRef<str>>(
    message: &str,
    options: &[T],
    writer: &mut impl Write,
) -> Result<(), PromptError> {
    writeln!(writer, "{}", message)?;
    for (i, option) in options.iter().enumerate() {
        writeln!(writer, "  {}) {}", i + 1, option.as_ref())?;
    }
    write!(writer, "> ")?;
    writer.flush()?;
    Ok(())
}

fn parse_index(answer: &str, len: usize) -> Option<usize> {
    answer
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=len).contains(n))
        .map(|n| n - 1)
}

/// Prompt for masked input (e.g., passwords, tokens).
///
/// The input is not echoed to the terminal.
pub fn password(message: &str, interactive: bool) -> Result<String, PromptError> {
    if !interactive {
        return Err(PromptError::NotInteractive);
    }
    let value = rpassword::prompt_password(format!("{}: ", message))?;
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(PromptError::Cancelled);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run<T>(
        input: &str,
        f: impl FnOnce(&mut Cursor<&[u8]>, &mut Vec<u8>) -> Result<T, PromptError>,
    ) -> (Result<T, PromptError>, String) {
        let mut reader = Cursor::new(input.as_bytes());
        let mut out = Vec::new();
        let result = f(&mut reader, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn non_interactive_fails() {
        assert!(matches!(
            confirm("ok?", true, false),
            Err(PromptError::NotInteractive)
        ));
        assert!(matches!(
            password("token", false),
            Err(PromptError::NotInteractive)
        ));
    }

    #[test]
    fn confirm_default_and_retry() {
        let (r, _) = run("\n", |i, o| confirm_with("ok?", true, i, o));
        assert!(r.unwrap());

        let (r, out) = run("maybe\nn\n", |i, o| confirm_with("ok?", true, i, o));
        assert!(!r.unwrap());
        assert!(out.contains("Please answer y or n."));
    }

    #[test]
    fn eof_cancels() {
        let (r, _) = run("", |i, o| confirm_with("ok?", true, i, o));
        assert!(matches!(r, Err(PromptError::Cancelled)));
    }

    #[test]
    fn input_uses_default_on_empty() {
        let (r, out) = run("\n", |i, o| input_with("Message", Some("wip"), i, o));
        assert_eq!(r.unwrap(), "wip");
        assert!(out.contains("[wip]"));

        let (r, _) = run("  fix typo \n", |i, o| input_with("Message", Some("wip"), i, o));
        assert_eq!(r.unwrap(), "fix typo");
    }

    #[test]
    fn select_by_number() {
        let options = ["draft", "push", "cancel"];
        let (r, out) = run("9\n2\n", |i, o| select_with("Save how?", &options, None, i, o));
        assert_eq!(r.unwrap(), 1);
        assert!(out.contains("  3) cancel"));
        assert!(out.contains("between 1 and 3"));
    }

    #[test]
    fn select_or_enter_accepts_names() {
        let options = ["feature/x", "notes"];
        let (r, _) = run("notes\n", |i, o| select_or_enter_with("Branch", &options, i, o));
        assert_eq!(r.unwrap(), Choice::Existing(1));

        let (r, _) = run("\nnew/idea\n", |i, o| select_or_enter_with("Branch", &options, i, o));
        assert_eq!(r.unwrap(), Choice::Entered("new/idea".into()));

        let (r, _) = run("1\n", |i, o| select_or_enter_with("Branch", &options, i, o));
        assert_eq!(r.unwrap(), Choice::Existing(0));
    }
}
