// Shared transport configuration for router sessions.
//
// Connection-level tuning lives here so every session built from the same
// config agrees on deadlines, framing limits and cache lifetime.
// Per-command timeouts are chosen by the caller at execute time.

use std::time::Duration;

use crate::codec::{DEFAULT_MAX_WORD_LEN, WireTap};

/// Default plaintext management port.
pub const DEFAULT_PORT: u16 = 8728;

/// Transport configuration for a [`Session`](crate::Session).
#[derive(Clone)]
pub struct TransportConfig {
    /// Deadline for the TCP connect. Default: 5s.
    pub connect_timeout: Duration,
    /// Deadline for each login exchange of each credential candidate. Default: 5s.
    pub login_timeout: Duration,
    /// Largest word accepted from the peer before the frame is rejected. Default: 16 MiB.
    pub max_word_len: usize,
    /// Hard ceiling on sentences read for one command. Default: 100 000.
    pub max_reply_sentences: usize,
    /// How long an authenticated connection is reused without a new handshake. Default: 30s.
    pub cache_ttl: Duration,
    /// Optional observer of raw inbound bytes. Default: none.
    pub tap: Option<WireTap>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            login_timeout: Duration::from_secs(5),
            max_word_len: DEFAULT_MAX_WORD_LEN,
            max_reply_sentences: 100_000,
            cache_ttl: Duration::from_secs(30),
            tap: None,
        }
    }
}

impl std::fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportConfig")
            .field("connect_timeout", &self.connect_timeout)
            .field("login_timeout", &self.login_timeout)
            .field("max_word_len", &self.max_word_len)
            .field("max_reply_sentences", &self.max_reply_sentences)
            .field("cache_ttl", &self.cache_ttl)
            .field("tap", &self.tap.is_some())
            .finish()
    }
}

impl TransportConfig {
    /// Install a wire tap that receives every inbound word's raw bytes.
    pub fn with_tap(mut self, tap: WireTap) -> Self {
        self.tap = Some(tap);
        self
    }
}
