//! Transport contract consumed by the shell layer.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::CommandResult;

/// Opaque identifier of an open remote shell, issued by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShellId(String);

impl ShellId {
    /// Wrap a transport-issued shell token.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier of a command running inside a shell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(String);

impl CommandId {
    /// Wrap a transport-issued command token.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transport error.
///
/// Produced by the session stack underneath the shell layer and passed
/// through to callers unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Operation timed out")]
    Timeout,
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Shell not open: {0}")]
    ShellClosed(ShellId),
}

/// Remote shell verbs provided by the session stack.
///
/// Every call completes (or fails) before the next one is issued on the
/// same shell; implementations need not support overlapping commands.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a new remote shell.
    async fn open_shell(&self) -> Result<ShellId, TransportError>;

    /// Close a remote shell. Called exactly once per opened shell.
    async fn close_shell(&self, shell: &ShellId) -> Result<(), TransportError>;

    /// Start a command in the shell.
    async fn run_command(
        &self,
        shell: &ShellId,
        command: &str,
        args: &[&str],
    ) -> Result<CommandId, TransportError>;

    /// Wait for the command to finish and fetch its output.
    async fn get_command_output(
        &self,
        shell: &ShellId,
        command: &CommandId,
    ) -> Result<CommandResult, TransportError>;

    /// Release transport-side state held for a command.
    async fn cleanup_command(
        &self,
        shell: &ShellId,
        command: &CommandId,
    ) -> Result<(), TransportError>;
}
