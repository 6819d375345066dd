//! Command results and the checked-invocation failure contract.

use std::borrow::Cow;

use thiserror::Error;

use crate::TransportError;

/// Number of characters of each stream shown in a failure message.
const PREVIEW_CHARS: usize = 100;

/// Raw outcome of one remote command.
///
/// Produced once per invocation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    status_code: i32,
    std_out: Vec<u8>,
    std_err: Option<Vec<u8>>,
}

impl CommandResult {
    /// Create a new result.
    #[must_use]
    pub const fn new(status_code: i32, std_out: Vec<u8>, std_err: Option<Vec<u8>>) -> Self {
        Self {
            status_code,
            std_out,
            std_err,
        }
    }

    /// Exit status reported by the remote command.
    #[must_use]
    pub const fn status_code(&self) -> i32 {
        self.status_code
    }

    /// Whether the command exited with status 0.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status_code == 0
    }

    /// Raw standard output.
    #[must_use]
    pub fn std_out(&self) -> &[u8] {
        &self.std_out
    }

    /// Raw standard error, if the transport reported one.
    #[must_use]
    pub fn std_err(&self) -> Option<&[u8]> {
        self.std_err.as_deref()
    }

    /// Standard output as text (lossy UTF-8).
    #[must_use]
    pub fn stdout_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.std_out)
    }

    /// Standard error as text (lossy UTF-8); an absent stream is empty.
    #[must_use]
    pub fn stderr_text(&self) -> Cow<'_, str> {
        self.std_err
            .as_deref()
            .map_or(Cow::Borrowed(""), String::from_utf8_lossy)
    }

    /// A copy of this result with its standard error replaced.
    #[must_use]
    pub fn with_std_err(self, std_err: Vec<u8>) -> Self {
        Self {
            std_err: Some(std_err),
            ..self
        }
    }

    /// Turn the result into text, failing on a non-zero exit status.
    ///
    /// # Errors
    /// Returns `ShellCommandError` if the status code is not 0.
    pub fn check(self) -> Result<CheckedOutput, ShellCommandError> {
        let stdout = self.stdout_text().into_owned();
        let stderr = self.stderr_text().into_owned();
        if self.status_code != 0 {
            return Err(ShellCommandError {
                status_code: self.status_code,
                stdout,
                stderr,
            });
        }
        Ok(CheckedOutput { stdout, stderr })
    }
}

/// Decoded output of a successful checked invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckedOutput {
    pub stdout: String,
    pub stderr: String,
}

/// A checked command exited with a non-zero status.
///
/// The display form previews each stream; the fields carry the full text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "shell command failed, code={status_code}\n{}\n{}",
    preview(.stdout),
    preview(.stderr)
)]
pub struct ShellCommandError {
    pub status_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Error from a checked shell invocation.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Command(#[from] ShellCommandError),
}

fn preview(text: &str) -> &str {
    text.char_indices()
        .nth(PREVIEW_CHARS)
        .map_or(text, |(end, _)| &text[..end])
}
