//! Remote shell sessions.
//!
//! Provides:
//! - `Client` - Scoped shell acquisition and the file copy entry point
//! - `Shell` - Command and script invocation on one open shell
//! - Script payload encoding for the remote script host
//! - Transport implementations (memory)

mod lease;

pub mod client;
pub mod copy;
pub mod script;
pub mod shell;
pub mod transport;

pub use client::Client;
pub use copy::{CopyError, CopySource, Copier};
pub use script::{ScriptDecodeError, decode_script, encode_script};
pub use shell::{ScopedShell, Shell};

#[cfg(feature = "memory")]
pub use transport::MemoryTransport;
