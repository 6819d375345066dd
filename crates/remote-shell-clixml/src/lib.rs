//! Decoder for CLIXML diagnostic streams.
//!
//! Remote script hosts report errors as a serialized object log even for
//! plain text messages. This crate recovers the readable text and falls
//! back to the raw bytes whenever the stream does not decode cleanly.
//!
//! Provides:
//! - `decode` - Tagged decode result (plain, messages, degraded)
//! - `clean_error_message` - Bytes-in, bytes-out convenience wrapper

pub mod decoder;

pub use decoder::{CLIXML_MARKER, CRLF_ESCAPE, DecodeError, Decoded, clean_error_message, decode};
