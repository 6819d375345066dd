//! Core types for remote shell sessions.
//!
//! This crate provides the fundamental building blocks:
//! - `Transport` - The RPC verbs a remote shell is driven through
//! - `CommandResult` - Raw outcome of one remote command
//! - `ShellCommandError` - Failure of a checked invocation
//! - `ShellConfig` - Script host and shell budget settings

pub mod config;
pub mod result;
pub mod traits;

pub use config::ShellConfig;
pub use result::{CheckedOutput, CommandResult, ShellCommandError, ShellError};
pub use traits::{CommandId, ShellId, Transport, TransportError};
