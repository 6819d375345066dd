//! File copy entry point and the copier contract.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use remote_shell_core::{ShellError, TransportError};
use thiserror::Error;
use tokio::io::AsyncRead;

use crate::Client;

/// Copy error.
#[derive(Debug, Error)]
pub enum CopyError {
    #[error("No copier configured")]
    CopierUnavailable,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Shell(#[from] ShellError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Copy failed: {0}")]
    Failed(String),
}

/// Source of a file copy.
pub enum CopySource {
    /// An already-open byte stream, handed to the copier as is.
    Stream(Box<dyn AsyncRead + Send + Unpin>),
    /// A local file, opened for the duration of the copy.
    Path(PathBuf),
}

impl CopySource {
    /// Copy from an open stream.
    #[must_use]
    pub fn stream(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self::Stream(Box::new(reader))
    }

    /// Copy from a local file.
    #[must_use]
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }
}

impl From<PathBuf> for CopySource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for CopySource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl fmt::Debug for CopySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream(_) => f.write_str("Stream(..)"),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
        }
    }
}

/// Streams a local source to a remote path through the client's shells.
///
/// Implementations open shells with `Client::with_shell` and must not run
/// more than `max_operations_per_shell` commands through a single shell.
#[async_trait(?Send)]
pub trait Copier: Send + Sync {
    /// Copy everything readable from `source` to `destination`.
    async fn copy(
        &self,
        client: &Client,
        source: &mut (dyn AsyncRead + Send + Unpin),
        destination: &str,
        max_operations_per_shell: usize,
    ) -> Result<(), CopyError>;
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use std::{io::Write as _, sync::Arc};

    use remote_shell_core::{CommandResult, ShellConfig};
    use tokio::{io::AsyncReadExt as _, sync::Mutex};

    use super::*;
    use crate::transport::{MemoryTransport, TransportCall, Verb};

    /// Appends fixed-size chunks with one command each, recycling shells.
    #[derive(Default)]
    struct ChunkCopier {
        seen: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait(?Send)]
    impl Copier for ChunkCopier {
        async fn copy(
            &self,
            client: &Client,
            source: &mut (dyn AsyncRead + Send + Unpin),
            destination: &str,
            max_operations_per_shell: usize,
        ) -> Result<(), CopyError> {
            self.seen
                .lock()
                .await
                .push((destination.to_string(), max_operations_per_shell));

            let mut data = Vec::new();
            source.read_to_end(&mut data).await?;
            let chunks: Vec<String> = data
                .chunks(4)
                .map(|c| String::from_utf8_lossy(c).into_owned())
                .collect();

            for batch in chunks.chunks(max_operations_per_shell) {
                client
                    .with_shell(async |shell| {
                        for chunk in batch {
                            shell.check_command("append", &[destination, chunk.as_str()]).await?;
                        }
                        Ok::<_, CopyError>(())
                    })
                    .await?;
            }
            Ok(())
        }
    }

    struct FailingCopier;

    #[async_trait(?Send)]
    impl Copier for FailingCopier {
        async fn copy(
            &self,
            _client: &Client,
            _source: &mut (dyn AsyncRead + Send + Unpin),
            _destination: &str,
            _max_operations_per_shell: usize,
        ) -> Result<(), CopyError> {
            Err(CopyError::Failed("disk full".into()))
        }
    }

    fn appended(transport: &MemoryTransport) -> String {
        transport
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                TransportCall::RunCommand { args, .. } => args.get(1).cloned(),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_copy_from_path_passes_default_budget() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello remote world").unwrap();

        let transport = Arc::new(MemoryTransport::new());
        let copier = Arc::new(ChunkCopier::default());
        let client = Client::new(Arc::clone(&transport) as _).with_copier(Arc::clone(&copier) as _);

        client
            .copy(CopySource::path(file.path()), "C:\\temp\\out.txt")
            .await
            .unwrap();

        assert_eq!(
            *copier.seen.lock().await,
            vec![("C:\\temp\\out.txt".to_string(), 15)]
        );
        assert_eq!(appended(&transport), "hello remote world");
    }

    #[tokio::test]
    async fn test_copy_recycles_shells_at_budget() {
        let transport = Arc::new(MemoryTransport::new());
        let client = Client::new(Arc::clone(&transport) as _)
            .with_config(ShellConfig::default().max_operations_per_shell(2))
            .with_copier(Arc::new(ChunkCopier::default()));

        // 5 chunks of 4 bytes -> 3 shells at 2 commands each
        let source = CopySource::stream(&b"aaaabbbbccccddddeeee"[..]);
        client.copy(source, "/tmp/out").await.unwrap();

        assert_eq!(transport.count(Verb::OpenShell), 3);
        assert_eq!(transport.count(Verb::CloseShell), 3);
        assert_eq!(transport.count(Verb::RunCommand), 5);
        assert_eq!(transport.open_shells(), 0);
        assert_eq!(appended(&transport), "aaaabbbbccccddddeeee");
    }

    #[tokio::test]
    async fn test_copy_failure_still_closes_shells() {
        let transport = Arc::new(MemoryTransport::new());
        transport.push_result(CommandResult::new(1, Vec::new(), Some(b"denied".to_vec())));
        let client = Client::new(Arc::clone(&transport) as _)
            .with_copier(Arc::new(ChunkCopier::default()));

        let err = client
            .copy(CopySource::stream(&b"data"[..]), "C:\\locked")
            .await
            .unwrap_err();

        assert!(matches!(err, CopyError::Shell(ShellError::Command(_))));
        assert_eq!(transport.count(Verb::CloseShell), 1);
        assert_eq!(transport.open_shells(), 0);
    }

    #[tokio::test]
    async fn test_copier_error_is_returned() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let transport = Arc::new(MemoryTransport::new());
        let client = Client::new(transport).with_copier(Arc::new(FailingCopier));

        let err = client
            .copy(CopySource::from(file.path()), "C:\\out")
            .await
            .unwrap_err();
        assert!(matches!(err, CopyError::Failed(msg) if msg == "disk full"));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let copier = Arc::new(ChunkCopier::default());
        let client = Client::new(Arc::new(MemoryTransport::new()))
            .with_copier(Arc::clone(&copier) as _);

        let err = client
            .copy(CopySource::path(dir.path().join("missing.bin")), "C:\\out")
            .await
            .unwrap_err();
        assert!(matches!(err, CopyError::Io(_)));
        assert!(copier.seen.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_copy_without_copier() {
        let client = Client::new(Arc::new(MemoryTransport::new()));
        let err = client
            .copy(CopySource::stream(&b""[..]), "C:\\out")
            .await
            .unwrap_err();
        assert!(matches!(err, CopyError::CopierUnavailable));
    }
}
