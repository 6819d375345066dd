//! CLIXML stream decoding.

use quick_xml::{Reader, events::Event};
use thiserror::Error;

/// First line of a CLIXML stream.
pub const CLIXML_MARKER: &[u8] = b"#< CLIXML";

/// Escaped CR/LF pair inside a message fragment.
pub const CRLF_ESCAPE: &str = "_x000D__x000A_";

/// Local name of a message fragment element.
const MESSAGE_TAG: &[u8] = b"S";

/// Why a CLIXML stream could not be turned into a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed CLIXML body: {0}")]
    Malformed(String),
    #[error("CLIXML body contains no message text")]
    NoMessages,
}

/// Outcome of decoding a diagnostic stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded<'a> {
    /// The stream is not CLIXML and is already readable.
    Plain(&'a [u8]),
    /// Message text recovered from the CLIXML body.
    Messages(String),
    /// The stream looked like CLIXML but did not decode; keep the raw bytes.
    Degraded { raw: &'a [u8], reason: DecodeError },
}

impl Decoded<'_> {
    /// Whether decoding fell back to the raw stream.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// The readable bytes: decoded text when available, otherwise the input.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Plain(raw) | Self::Degraded { raw, .. } => raw.to_vec(),
            Self::Messages(text) => text.into_bytes(),
        }
    }
}

/// Decode a diagnostic stream.
///
/// Never fails: input without the marker line is returned as `Plain`, and
/// a CLIXML body that cannot be parsed or holds no text is `Degraded`.
#[must_use]
pub fn decode(raw: &[u8]) -> Decoded<'_> {
    let Some(body) = strip_marker(raw) else {
        return Decoded::Plain(raw);
    };

    let reason = match collect_messages(body) {
        Ok(text) => {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                return Decoded::Messages(trimmed.to_string());
            }
            DecodeError::NoMessages
        }
        Err(reason) => reason,
    };

    Decoded::Degraded { raw, reason }
}

/// Convert a possibly-CLIXML error stream into readable bytes.
///
/// A degraded decode is logged and the original bytes are returned.
#[must_use]
pub fn clean_error_message(raw: &[u8]) -> Vec<u8> {
    let decoded = decode(raw);
    if let Decoded::Degraded { reason, .. } = &decoded {
        match reason {
            DecodeError::Malformed(_) => {
                tracing::warn!(%reason, "Failed to convert script error message, keeping raw text");
            }
            DecodeError::NoMessages => {
                tracing::debug!("CLIXML error stream had no message text, keeping raw text");
            }
        }
    }
    decoded.into_bytes()
}

/// Return the body after the marker line, or `None` if there is no marker line.
fn strip_marker(raw: &[u8]) -> Option<&[u8]> {
    let rest = raw.strip_prefix(CLIXML_MARKER)?;
    rest.strip_prefix(b"\r\n")
        .or_else(|| rest.strip_prefix(b"\n"))
}

/// Concatenate the text of every message element directly under the root.
///
/// Elements are matched by local name, so a default namespace declaration
/// on the root does not affect lookup.
fn collect_messages(body: &[u8]) -> Result<String, DecodeError> {
    let mut reader = Reader::from_reader(body);
    let mut messages = String::new();
    let mut depth = 0usize;
    let mut seen_root = false;
    let mut in_message = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;

        match event {
            Event::Start(start) => {
                if depth == 0 {
                    if seen_root {
                        return Err(DecodeError::Malformed("multiple root elements".into()));
                    }
                    seen_root = true;
                }
                depth += 1;
                if depth == 2 && start.local_name().as_ref() == MESSAGE_TAG {
                    in_message = true;
                }
            }
            Event::End(_) => {
                if depth == 2 {
                    in_message = false;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Empty(_) => {
                if depth == 0 {
                    if seen_root {
                        return Err(DecodeError::Malformed("multiple root elements".into()));
                    }
                    seen_root = true;
                }
            }
            Event::Text(text) => {
                if depth == 0 {
                    if !text.iter().all(u8::is_ascii_whitespace) {
                        return Err(DecodeError::Malformed("text outside root element".into()));
                    }
                } else if depth == 2 && in_message {
                    let fragment = text
                        .unescape()
                        .map_err(|e| DecodeError::Malformed(e.to_string()))?;
                    messages.push_str(&fragment.replace(CRLF_ESCAPE, "\n"));
                }
            }
            Event::CData(cdata) => {
                if depth == 2 && in_message {
                    let fragment = std::str::from_utf8(&cdata.into_inner())
                        .map_err(|e| DecodeError::Malformed(e.to_string()))?
                        .replace(CRLF_ESCAPE, "\n");
                    messages.push_str(&fragment);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(DecodeError::Malformed("no root element".into()));
    }
    if depth != 0 {
        return Err(DecodeError::Malformed("unclosed element".into()));
    }
    Ok(messages)
}
