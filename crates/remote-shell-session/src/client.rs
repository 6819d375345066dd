//! Client owning the transport session.

use std::sync::Arc;

use remote_shell_core::{ShellConfig, Transport, TransportError};

use crate::{
    copy::{CopyError, CopySource, Copier},
    lease::Lease,
    shell::{ScopedShell, Shell},
};

/// Remote shell client.
///
/// Hands out shells that are closed when their scope ends, and forwards
/// file copies to the configured `Copier`.
pub struct Client {
    transport: Arc<dyn Transport>,
    config: Arc<ShellConfig>,
    copier: Option<Arc<dyn Copier>>,
}

impl Client {
    /// Create a client over an established transport session.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            config: Arc::new(ShellConfig::default()),
            copier: None,
        }
    }

    /// Use the given shell configuration.
    #[must_use]
    pub fn with_config(mut self, config: ShellConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    /// Use the given copier for `copy`.
    #[must_use]
    pub fn with_copier(mut self, copier: Arc<dyn Copier>) -> Self {
        self.copier = Some(copier);
        self
    }

    /// Active shell configuration.
    #[must_use]
    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Open a remote shell that is closed by `ScopedShell::close` or on drop.
    ///
    /// # Errors
    /// Returns the transport error if the shell cannot be opened.
    pub async fn shell(&self) -> Result<ScopedShell, TransportError> {
        let id = self.transport.open_shell().await?;
        tracing::debug!(shell_id = %id, "Opened remote shell");

        let lease = Lease::shell(Arc::clone(&self.transport), id.clone());
        let shell = Shell::new(Arc::clone(&self.transport), id, Arc::clone(&self.config));
        Ok(ScopedShell::new(shell, lease))
    }

    /// Run `body` with a freshly opened shell, closing it afterwards.
    ///
    /// The shell is closed exactly once whether `body` succeeds or fails.
    /// A failing body's error takes precedence over a close failure, which
    /// is then only logged.
    ///
    /// # Errors
    /// Returns the body's error, or the transport error from opening or
    /// closing the shell.
    pub async fn with_shell<F, T, E>(&self, body: F) -> Result<T, E>
    where
        F: AsyncFnOnce(&Shell) -> Result<T, E>,
        E: From<TransportError>,
    {
        let scoped = self.shell().await?;
        let shell_id = scoped.id().clone();

        let outcome = body(&*scoped).await;
        let closed = scoped.close().await;

        match (outcome, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e.into()),
            (Err(e), closed) => {
                if let Err(close_err) = closed {
                    tracing::warn!(%shell_id, "Failed to close shell after error: {close_err}");
                }
                Err(e)
            }
        }
    }

    /// Copy a local source to `destination` on the remote host.
    ///
    /// A path source is opened here and closed when the copy finishes,
    /// whatever its outcome.
    ///
    /// # Errors
    /// Returns error if no copier is configured, the file cannot be opened,
    /// or the copier fails.
    pub async fn copy(&self, source: CopySource, destination: &str) -> Result<(), CopyError> {
        let copier = self.copier.as_ref().ok_or(CopyError::CopierUnavailable)?;
        let max_operations_per_shell = self.config.max_operations_per_shell;

        match source {
            CopySource::Stream(mut reader) => {
                tracing::debug!(destination, "Copying stream");
                copier
                    .copy(self, &mut *reader, destination, max_operations_per_shell)
                    .await
            }
            CopySource::Path(path) => {
                let mut file = tokio::fs::File::open(&path).await?;
                tracing::debug!(path = %path.display(), destination, "Copying local file");
                copier
                    .copy(self, &mut file, destination, max_operations_per_shell)
                    .await
            }
        }
    }
}
