//! Release-exactly-once guards for remote resources.

use std::sync::Arc;

use remote_shell_core::{CommandId, ShellId, Transport, TransportError};
use tokio::runtime::Handle;

#[derive(Debug)]
enum Resource {
    Shell(ShellId),
    Command { shell: ShellId, command: CommandId },
}

impl Resource {
    async fn release(&self, transport: &dyn Transport) -> Result<(), TransportError> {
        match self {
            Self::Shell(shell) => {
                transport.close_shell(shell).await?;
                tracing::debug!(shell_id = %shell, "Closed remote shell");
            }
            Self::Command { shell, command } => {
                transport.cleanup_command(shell, command).await?;
                tracing::debug!(shell_id = %shell, command_id = %command, "Cleaned up remote command");
            }
        }
        Ok(())
    }
}

/// Holds a remote resource until it is released.
///
/// `release` hands the resource back to the transport. A lease dropped
/// without being released (early return, panic, cancelled future) schedules
/// the release on the current runtime instead. Either way the transport
/// sees at most one release call.
pub(crate) struct Lease {
    transport: Arc<dyn Transport>,
    resource: Option<Resource>,
}

impl Lease {
    pub(crate) fn shell(transport: Arc<dyn Transport>, shell: ShellId) -> Self {
        Self {
            transport,
            resource: Some(Resource::Shell(shell)),
        }
    }

    pub(crate) fn command(transport: Arc<dyn Transport>, shell: ShellId, command: CommandId) -> Self {
        Self {
            transport,
            resource: Some(Resource::Command { shell, command }),
        }
    }

    /// Release the resource now.
    pub(crate) async fn release(mut self) -> Result<(), TransportError> {
        match self.resource.take() {
            Some(resource) => resource.release(self.transport.as_ref()).await,
            None => Ok(()),
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        let Some(resource) = self.resource.take() else {
            return;
        };

        let Ok(handle) = Handle::try_current() else {
            tracing::error!(?resource, "Remote resource dropped outside a runtime and was not released");
            return;
        };

        tracing::debug!(?resource, "Releasing abandoned remote resource in background");
        let transport = Arc::clone(&self.transport);
        handle.spawn(async move {
            if let Err(e) = resource.release(transport.as_ref()).await {
                tracing::warn!(?resource, "Failed to release abandoned remote resource: {e}");
            }
        });
    }
}
