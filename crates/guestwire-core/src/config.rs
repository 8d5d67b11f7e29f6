// ── Runtime connection configuration ──
//
// These types describe *how* to reach a router and how long each kind of
// operation may take. They carry credential data but never touch disk;
// the CLI (or any embedding app) builds a `RouterConfig` and hands it in.

use std::time::Duration;

use guestwire_api::{Credential, DEFAULT_PORT, TransportConfig};

/// Deadlines per operation kind.
///
/// Listing can take far longer than a single add on a loaded router, so
/// each class gets its own budget instead of one global timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationTimeouts {
    /// Adding a user. Default: 10s.
    pub create: Duration,
    /// Both phases of user removal. Default: 10s.
    pub remove: Duration,
    /// User and active-session listings. Default: 30s.
    pub list: Duration,
    /// Active-session lookup and removal. Default: 10s.
    pub disconnect: Duration,
    /// Caller-supplied raw commands. Default: 30s.
    pub raw: Duration,
}

impl Default for OperationTimeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(10),
            remove: Duration::from_secs(10),
            list: Duration::from_secs(30),
            disconnect: Duration::from_secs(10),
            raw: Duration::from_secs(30),
        }
    }
}

impl OperationTimeouts {
    /// Same deadline for every operation kind.
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            create: timeout,
            remove: timeout,
            list: timeout,
            disconnect: timeout,
            raw: timeout,
        }
    }
}

/// Configuration for talking to a single router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Router host name or IP address.
    pub host: String,
    /// Management port (defaults to 8728).
    pub port: u16,
    /// Login candidates, tried in order.
    pub credentials: Vec<Credential>,
    /// Connection-level tuning.
    pub transport: TransportConfig,
    /// Per-operation deadlines.
    pub timeouts: OperationTimeouts,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            host: "192.168.88.1".into(),
            port: DEFAULT_PORT,
            credentials: Vec::new(),
            transport: TransportConfig::default(),
            timeouts: OperationTimeouts::default(),
        }
    }
}
