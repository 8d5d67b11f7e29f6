use std::time::Duration;

use thiserror::Error;

use crate::sentence::Sentence;

/// Top-level error type for the `guestwire-api` crate.
///
/// Covers every failure mode of the protocol client: framing, deadlines,
/// login, and the router's own `!trap` / `!fatal` replies.
/// `guestwire-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Wire ────────────────────────────────────────────────────────
    /// Malformed length prefix, oversized word, or a frame cut short by EOF.
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Socket-level failure (connection refused, reset, broken pipe, ...).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configured address could not be resolved.
    #[error("Invalid router address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    // ── Deadlines ───────────────────────────────────────────────────
    /// Deadline exceeded before a single reply sentence arrived.
    #[error("Timed out after {}ms waiting for {waiting_for}", timeout.as_millis())]
    Timeout {
        waiting_for: &'static str,
        timeout: Duration,
    },

    /// Deadline exceeded after part of the reply batch was received.
    /// The collected sentences are handed back for the caller to inspect.
    #[error(
        "Timed out after {}ms with a partial reply ({} sentence(s) received)",
        timeout.as_millis(),
        partial.len()
    )]
    PartialTimeout {
        timeout: Duration,
        partial: Vec<Sentence>,
    },

    /// The peer kept sending sentences past the reply ceiling without a terminator.
    #[error("Reply exceeded {limit} sentences without a terminal marker")]
    ReplyLimitExceeded { limit: usize, partial: Vec<Sentence> },

    // ── Session ─────────────────────────────────────────────────────
    /// Every credential candidate was rejected.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// A command was issued without an authenticated connection.
    #[error("Not connected -- connect or reconnect before issuing commands")]
    NotConnected,

    // ── Router replies ──────────────────────────────────────────────
    /// The router answered with `!trap`. The connection stays usable.
    #[error("Router rejected command: {message}")]
    RemoteTrap {
        message: String,
        category: Option<u32>,
    },

    /// The router answered with `!fatal` and closed the session.
    #[error("Router reported fatal error: {message}")]
    RemoteFatal { message: String },
}

impl Error {
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Returns `true` if the connection can no longer be trusted and a
    /// reconnect is required before the next command.
    pub fn is_connection_level(&self) -> bool {
        matches!(
            self,
            Self::Protocol { .. }
                | Self::Io(_)
                | Self::Timeout { .. }
                | Self::PartialTimeout { .. }
                | Self::ReplyLimitExceeded { .. }
                | Self::NotConnected
                | Self::RemoteFatal { .. }
        )
    }

    /// Returns `true` if the command may be repeated automatically on a fresh
    /// connection. Deadline and reply-ceiling aborts also drop the connection,
    /// but the router may already have applied the command, so those are
    /// left to the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Protocol { .. } | Self::Io(_) | Self::NotConnected | Self::RemoteFatal { .. }
        )
    }

    /// Returns `true` for any deadline-related failure, with or without data.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::PartialTimeout { .. })
    }

    /// The router's message text for a `!trap` reply.
    pub fn trap_message(&self) -> Option<&str> {
        match self {
            Self::RemoteTrap { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Sentences received before a timeout or reply-ceiling abort.
    pub fn partial_reply(&self) -> Option<&[Sentence]> {
        match self {
            Self::PartialTimeout { partial, .. } | Self::ReplyLimitExceeded { partial, .. } => {
                Some(partial)
            }
            _ => None,
        }
    }
}
