// ── Core error types ──
//
// User-facing errors from guestwire-core. Consumers never see length
// prefixes or reply markers; the `From<guestwire_api::Error>` impl
// translates protocol failures into domain variants while keeping the
// router's own message text.

use std::time::Duration;

use strum::{Display, IntoStaticStr};
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot communicate with router: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Router did not answer within {}ms{}", timeout.as_millis(), partial_suffix(*partial_rows))]
    Timeout {
        timeout: Duration,
        /// Sentences received before the deadline.
        partial_rows: usize,
    },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Hotspot user not found: {name}")]
    UserNotFound { name: String },

    #[error("Hotspot user '{name}' already exists: {message}")]
    AlreadyExists { name: String, message: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Could not create hotspot user '{name}': {message}")]
    UserCreationFailed { name: String, message: String },

    #[error("Router rejected command: {message}")]
    Rejected { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

fn partial_suffix(rows: usize) -> String {
    if rows == 0 {
        String::new()
    } else {
        format!(" ({rows} partial reply sentence(s) discarded)")
    }
}

/// Coarse category an operator-facing layer can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    Rejected,
    Authentication,
    CommunicationFailure,
    Configuration,
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConnectionFailed { .. } | Self::Timeout { .. } => ErrorKind::CommunicationFailure,
            Self::AuthenticationFailed { .. } => ErrorKind::Authentication,
            Self::UserNotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::UserCreationFailed { message, .. } | Self::Rejected { message } => {
                classify_trap(message)
            }
            Self::Config { .. } => ErrorKind::Configuration,
        }
    }

    /// Text the router itself sent, when the failure came from a `!trap`.
    pub fn router_message(&self) -> Option<&str> {
        match self {
            Self::AlreadyExists { message, .. }
            | Self::UserCreationFailed { message, .. }
            | Self::Rejected { message } => Some(message),
            _ => None,
        }
    }
}

/// Map `!trap` message text onto a category.
pub(crate) fn classify_trap(message: &str) -> ErrorKind {
    let lower = message.to_ascii_lowercase();
    if lower.contains("no such item") || lower.contains("not found") {
        ErrorKind::NotFound
    } else if lower.contains("already have") || lower.contains("already exists") {
        ErrorKind::AlreadyExists
    } else {
        ErrorKind::Rejected
    }
}

// ── Conversion from protocol-layer errors ────────────────────────────

impl From<guestwire_api::Error> for CoreError {
    fn from(err: guestwire_api::Error) -> Self {
        use guestwire_api::Error as Api;

        match err {
            Api::AuthenticationFailed { message } => CoreError::AuthenticationFailed { message },
            Api::Timeout { timeout, .. } => CoreError::Timeout {
                timeout,
                partial_rows: 0,
            },
            Api::PartialTimeout { timeout, partial } => CoreError::Timeout {
                timeout,
                partial_rows: partial.len(),
            },
            Api::RemoteTrap { message, .. } => CoreError::Rejected { message },
            Api::RemoteFatal { message } => CoreError::ConnectionFailed {
                reason: format!("router closed the session: {message}"),
            },
            Api::InvalidAddress { address, reason } => CoreError::Config {
                message: format!("invalid router address '{address}': {reason}"),
            },
            other @ (Api::Protocol { .. }
            | Api::Io(_)
            | Api::ReplyLimitExceeded { .. }
            | Api::NotConnected) => CoreError::ConnectionFailed {
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trap_text_drives_kind() {
        let not_found = CoreError::Rejected {
            message: "no such item".into(),
        };
        let exists = CoreError::UserCreationFailed {
            name: "guest".into(),
            message: "failure: already have user with this name".into(),
        };
        let other = CoreError::Rejected {
            message: "input does not match any value of profile".into(),
        };

        assert_eq!(not_found.kind(), ErrorKind::NotFound);
        assert_eq!(exists.kind(), ErrorKind::AlreadyExists);
        assert_eq!(other.kind(), ErrorKind::Rejected);
        assert_eq!(
            exists.router_message(),
            Some("failure: already have user with this name")
        );
    }

    #[test]
    fn protocol_failures_are_communication_failures() {
        let err: CoreError = guestwire_api::Error::RemoteFatal {
            message: "too many commands before login".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::CommunicationFailure);
        assert!(err.to_string().contains("too many commands before login"));

        let err: CoreError = guestwire_api::Error::NotConnected.into();
        assert_eq!(err.kind(), ErrorKind::CommunicationFailure);
    }

    #[test]
    fn partial_timeouts_keep_the_row_count() {
        let err: CoreError = guestwire_api::Error::PartialTimeout {
            timeout: Duration::from_secs(2),
            partial: vec![guestwire_api::Sentence::new("!re")],
        }
        .into();
        assert!(matches!(err, CoreError::Timeout { partial_rows: 1, .. }));
        assert!(err.to_string().contains("1 partial"));
    }

    #[test]
    fn kind_renders_snake_case() {
        assert_eq!(ErrorKind::CommunicationFailure.to_string(), "communication_failure");
    }
}
