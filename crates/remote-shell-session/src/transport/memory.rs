//! In-memory scripted transport.

use std::{
    collections::{HashSet, VecDeque},
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use remote_shell_core::{CommandId, CommandResult, ShellId, Transport, TransportError};

/// A transport verb, used to inject failures and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    OpenShell,
    CloseShell,
    RunCommand,
    GetCommandOutput,
    CleanupCommand,
}

/// A recorded transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    OpenShell(ShellId),
    CloseShell(ShellId),
    RunCommand {
        shell: ShellId,
        command: String,
        args: Vec<String>,
    },
    GetCommandOutput {
        shell: ShellId,
        command: CommandId,
    },
    CleanupCommand {
        shell: ShellId,
        command: CommandId,
    },
}

impl TransportCall {
    /// The verb this call invoked.
    #[must_use]
    pub const fn verb(&self) -> Verb {
        match self {
            Self::OpenShell(_) => Verb::OpenShell,
            Self::CloseShell(_) => Verb::CloseShell,
            Self::RunCommand { .. } => Verb::RunCommand,
            Self::GetCommandOutput { .. } => Verb::GetCommandOutput,
            Self::CleanupCommand { .. } => Verb::CleanupCommand,
        }
    }
}

#[derive(Default)]
struct Inner {
    calls: Vec<TransportCall>,
    open_shells: HashSet<ShellId>,
    results: VecDeque<CommandResult>,
    failures: Vec<(Verb, TransportError)>,
    next_shell: u64,
    next_command: u64,
}

impl Inner {
    fn take_failure(&mut self, verb: Verb) -> Result<(), TransportError> {
        match self.failures.iter().position(|(v, _)| *v == verb) {
            Some(index) => Err(self.failures.remove(index).1),
            None => Ok(()),
        }
    }

    fn ensure_open(&self, shell: &ShellId) -> Result<(), TransportError> {
        if self.open_shells.contains(shell) {
            Ok(())
        } else {
            Err(TransportError::ShellClosed(shell.clone()))
        }
    }
}

/// In-memory transport implementation.
///
/// Useful for tests and demos. Records every call, replays queued command
/// results in order (an empty queue yields a successful command with no
/// output) and fails the next call of a verb on request.
#[derive(Default)]
pub struct MemoryTransport {
    inner: Mutex<Inner>,
}

impl MemoryTransport {
    /// Create a new in-memory transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue the result of the next finished command.
    pub fn push_result(&self, result: CommandResult) {
        self.lock().results.push_back(result);
    }

    /// Fail the next call of `verb` with `error`.
    pub fn fail_next(&self, verb: Verb, error: TransportError) {
        self.lock().failures.push((verb, error));
    }

    /// Snapshot of every call made so far.
    #[must_use]
    pub fn calls(&self) -> Vec<TransportCall> {
        self.lock().calls.clone()
    }

    /// Number of calls made to `verb`.
    #[must_use]
    pub fn count(&self, verb: Verb) -> usize {
        self.lock().calls.iter().filter(|c| c.verb() == verb).count()
    }

    /// Number of shells currently open.
    #[must_use]
    pub fn open_shells(&self) -> usize {
        self.lock().open_shells.len()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn open_shell(&self) -> Result<ShellId, TransportError> {
        let mut inner = self.lock();
        inner.take_failure(Verb::OpenShell)?;

        inner.next_shell += 1;
        let shell = ShellId::new(format!("shell-{}", inner.next_shell));
        inner.calls.push(TransportCall::OpenShell(shell.clone()));
        inner.open_shells.insert(shell.clone());
        Ok(shell)
    }

    async fn close_shell(&self, shell: &ShellId) -> Result<(), TransportError> {
        let mut inner = self.lock();
        inner.calls.push(TransportCall::CloseShell(shell.clone()));
        inner.take_failure(Verb::CloseShell)?;
        inner.ensure_open(shell)?;

        inner.open_shells.remove(shell);
        Ok(())
    }

    async fn run_command(
        &self,
        shell: &ShellId,
        command: &str,
        args: &[&str],
    ) -> Result<CommandId, TransportError> {
        let mut inner = self.lock();
        inner.calls.push(TransportCall::RunCommand {
            shell: shell.clone(),
            command: command.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
        });
        inner.take_failure(Verb::RunCommand)?;
        inner.ensure_open(shell)?;

        inner.next_command += 1;
        Ok(CommandId::new(format!("command-{}", inner.next_command)))
    }

    async fn get_command_output(
        &self,
        shell: &ShellId,
        command: &CommandId,
    ) -> Result<CommandResult, TransportError> {
        let mut inner = self.lock();
        inner.calls.push(TransportCall::GetCommandOutput {
            shell: shell.clone(),
            command: command.clone(),
        });
        inner.take_failure(Verb::GetCommandOutput)?;
        inner.ensure_open(shell)?;

        Ok(inner
            .results
            .pop_front()
            .unwrap_or_else(|| CommandResult::new(0, Vec::new(), None)))
    }

    async fn cleanup_command(
        &self,
        shell: &ShellId,
        command: &CommandId,
    ) -> Result<(), TransportError> {
        let mut inner = self.lock();
        inner.calls.push(TransportCall::CleanupCommand {
            shell: shell.clone(),
            command: command.clone(),
        });
        inner.take_failure(Verb::CleanupCommand)?;
        inner.ensure_open(shell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_issues_sequential_ids() {
        let transport = MemoryTransport::new();
        let first = transport.open_shell().await.unwrap();
        let second = transport.open_shell().await.unwrap();
        assert_eq!(first.as_str(), "shell-1");
        assert_eq!(second.as_str(), "shell-2");

        let command = transport.run_command(&first, "dir", &[]).await.unwrap();
        assert_eq!(command.as_str(), "command-1");
        assert_eq!(transport.open_shells(), 2);
    }

    #[tokio::test]
    async fn test_replays_results_in_order() {
        let transport = MemoryTransport::new();
        transport.push_result(CommandResult::new(1, b"a".to_vec(), None));
        let shell = transport.open_shell().await.unwrap();
        let command = transport.run_command(&shell, "x", &[]).await.unwrap();

        let first = transport.get_command_output(&shell, &command).await.unwrap();
        let second = transport.get_command_output(&shell, &command).await.unwrap();
        assert_eq!(first.status_code(), 1);
        assert_eq!(second, CommandResult::new(0, Vec::new(), None));
    }

    #[tokio::test]
    async fn test_closed_shell_rejects_commands() {
        let transport = MemoryTransport::new();
        let shell = transport.open_shell().await.unwrap();
        transport.close_shell(&shell).await.unwrap();

        let err = transport.run_command(&shell, "dir", &[]).await.unwrap_err();
        assert_eq!(err, TransportError::ShellClosed(shell.clone()));
        assert!(transport.close_shell(&shell).await.is_err());
        assert_eq!(transport.count(Verb::CloseShell), 2);
    }

    #[tokio::test]
    async fn test_injected_failure_applies_once() {
        let transport = MemoryTransport::new();
        transport.fail_next(Verb::OpenShell, TransportError::Timeout);

        assert_eq!(transport.open_shell().await, Err(TransportError::Timeout));
        assert!(transport.open_shell().await.is_ok());
    }
}
