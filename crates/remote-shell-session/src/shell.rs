//! Command and script invocation on one open remote shell.

use std::{ops::Deref, sync::Arc};

use remote_shell_clixml::clean_error_message;
use remote_shell_core::{
    CheckedOutput, CommandResult, ShellConfig, ShellError, ShellId, Transport, TransportError,
};
use tokio::sync::Mutex;

use crate::{lease::Lease, script::encode_script};

/// An open remote shell.
///
/// Only reachable by reference from the scope that opened it, so a closed
/// shell cannot be used again. Commands on one shell run one at a time.
pub struct Shell {
    transport: Arc<dyn Transport>,
    id: ShellId,
    config: Arc<ShellConfig>,
    busy: Mutex<()>,
}

impl Shell {
    pub(crate) fn new(transport: Arc<dyn Transport>, id: ShellId, config: Arc<ShellConfig>) -> Self {
        Self {
            transport,
            id,
            config,
            busy: Mutex::new(()),
        }
    }

    /// Transport-issued identifier of this shell.
    #[must_use]
    pub const fn id(&self) -> &ShellId {
        &self.id
    }

    /// Run a command and return its raw result.
    ///
    /// The transport-side command state is cleaned up even when fetching
    /// the output fails.
    ///
    /// # Errors
    /// Returns the transport error unchanged.
    pub async fn run_command(
        &self,
        command: &str,
        args: &[&str],
    ) -> Result<CommandResult, TransportError> {
        let _turn = self.busy.lock().await;

        let command_id = self.transport.run_command(&self.id, command, args).await?;
        tracing::debug!(shell_id = %self.id, %command_id, command, "Started remote command");

        let lease = Lease::command(Arc::clone(&self.transport), self.id.clone(), command_id.clone());
        let output = self.transport.get_command_output(&self.id, &command_id).await;
        let cleanup = lease.release().await;

        let result = match (output, cleanup) {
            (Ok(result), Ok(())) => result,
            (Ok(_), Err(e)) => return Err(e),
            (Err(e), cleanup) => {
                if let Err(cleanup_err) = cleanup {
                    tracing::warn!(
                        shell_id = %self.id,
                        %command_id,
                        "Failed to clean up command after output error: {cleanup_err}"
                    );
                }
                return Err(e);
            }
        };

        tracing::debug!(
            shell_id = %self.id,
            %command_id,
            status_code = result.status_code(),
            "Remote command finished"
        );
        Ok(result)
    }

    /// Run a command, failing on a non-zero exit status.
    ///
    /// # Errors
    /// Returns `ShellError::Command` on a non-zero status, or the transport error.
    pub async fn check_command(&self, command: &str, args: &[&str]) -> Result<CheckedOutput, ShellError> {
        Ok(self.run_command(command, args).await?.check()?)
    }

    /// Run a script through the script host.
    ///
    /// A non-empty error stream is decoded from CLIXML into readable text.
    ///
    /// # Errors
    /// Returns the transport error unchanged.
    pub async fn run_script(&self, script: &str) -> Result<CommandResult, TransportError> {
        let payload = encode_script(script);
        let result = self
            .run_command(
                &self.config.script_host,
                &[self.config.encoded_command_flag.as_str(), payload.as_str()],
            )
            .await?;

        let cleaned = result
            .std_err()
            .filter(|raw| !raw.is_empty())
            .map(clean_error_message);

        Ok(match cleaned {
            Some(std_err) => result.with_std_err(std_err),
            None => result,
        })
    }

    /// Run a script, failing on a non-zero exit status.
    ///
    /// # Errors
    /// Returns `ShellError::Command` on a non-zero status, or the transport error.
    pub async fn check_script(&self, script: &str) -> Result<CheckedOutput, ShellError> {
        Ok(self.run_script(script).await?.check()?)
    }
}

/// A shell that is closed when released or dropped.
///
/// Prefer `close` so close failures are observed; dropping the guard
/// closes the shell in the background.
pub struct ScopedShell {
    shell: Shell,
    lease: Lease,
}

impl ScopedShell {
    pub(crate) const fn new(shell: Shell, lease: Lease) -> Self {
        Self { shell, lease }
    }

    /// Close the remote shell.
    ///
    /// # Errors
    /// Returns the transport error unchanged.
    pub async fn close(self) -> Result<(), TransportError> {
        self.lease.release().await
    }
}

impl Deref for ScopedShell {
    type Target = Shell;

    fn deref(&self) -> &Shell {
        &self.shell
    }
}
