// Router session management
//
// One `Session` owns one TCP connection: it opens the socket, runs the
// login handshake against an ordered list of credential candidates, and
// keeps the authenticated connection around for `cache_ttl` so consecutive
// operations skip the handshake. Command execution lives in `executor.rs`.

use secrecy::{ExposeSecret, SecretString};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::{Instant, timeout};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::codec::SentenceCodec;
use crate::error::Error;
use crate::executor::round_trip;
use crate::sentence::Sentence;
use crate::transport::{DEFAULT_PORT, TransportConfig};

pub(crate) type Transport = Framed<TcpStream, SentenceCodec>;

/// One username/password pair to try during login.
#[derive(Debug, Clone)]
pub struct Credential {
    pub username: String,
    pub password: SecretString,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Connection lifecycle of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Authenticated,
    /// A command is in flight. A session left here had its reply abandoned
    /// mid-stream, so the socket position is unknown and `connect()` starts over.
    Busy,
}

/// A single authenticated connection to a router.
///
/// Not shareable: every method takes `&mut self`, which keeps the
/// protocol's one-command-at-a-time rule enforced by the borrow checker.
/// Wrap it in a mutex to share it between tasks.
pub struct Session {
    host: String,
    port: u16,
    credentials: Vec<Credential>,
    pub(crate) config: TransportConfig,
    pub(crate) transport: Option<Transport>,
    pub(crate) state: ConnectionState,
    cache_valid_until: Option<Instant>,
}

impl Session {
    /// Create a disconnected session. Nothing touches the network until
    /// [`connect`](Self::connect).
    pub fn new(
        host: impl Into<String>,
        port: u16,
        credentials: Vec<Credential>,
        config: TransportConfig,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            credentials,
            config,
            transport: None,
            state: ConnectionState::Disconnected,
            cache_valid_until: None,
        }
    }

    /// Session on the default management port with default tuning.
    pub fn with_defaults(host: impl Into<String>, credentials: Vec<Credential>) -> Self {
        Self::new(host, DEFAULT_PORT, credentials, TransportConfig::default())
    }

    /// `host:port` of the router.
    pub fn peer(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == ConnectionState::Authenticated && self.transport.is_some()
    }

    /// `true` while an authenticated connection may be reused without a handshake.
    pub fn is_cached(&self) -> bool {
        self.is_authenticated()
            && self
                .cache_valid_until
                .is_some_and(|until| Instant::now() < until)
    }

    /// Connect and authenticate, or reuse the cached connection.
    ///
    /// Candidates are tried in order. A `!trap` moves on to the next
    /// candidate over the same socket; a connection-level failure drops
    /// the socket and the next candidate opens a fresh one.
    pub async fn connect(&mut self) -> Result<(), Error> {
        if self.is_cached() {
            debug!(peer = %self.peer(), "reusing cached connection");
            return Ok(());
        }

        self.disconnect().await;

        if self.credentials.is_empty() {
            return Err(Error::AuthenticationFailed {
                message: "no credential candidates configured".into(),
            });
        }

        self.state = ConnectionState::Connecting;
        let mut last_failure = String::new();

        for credential in &self.credentials {
            if self.transport.is_none() {
                match self.open().await {
                    Ok(transport) => self.transport = Some(transport),
                    Err(e) => {
                        self.state = ConnectionState::Disconnected;
                        return Err(e);
                    }
                }
            }
            let Some(transport) = self.transport.as_mut() else {
                continue;
            };

            match login(transport, credential, &self.config).await {
                Ok(()) => {
                    self.state = ConnectionState::Authenticated;
                    self.cache_valid_until = Some(Instant::now() + self.config.cache_ttl);
                    info!(peer = %self.peer(), username = %credential.username, "authenticated");
                    return Ok(());
                }
                Err(Error::RemoteTrap { message, .. }) => {
                    warn!(username = %credential.username, %message, "login rejected");
                    last_failure = message;
                }
                Err(e) => {
                    warn!(username = %credential.username, error = %e, "login attempt failed");
                    self.transport = None;
                    last_failure = e.to_string();
                }
            }
        }

        let tried = self.credentials.len();
        self.disconnect().await;
        Err(Error::AuthenticationFailed {
            message: format!("all {tried} credential candidate(s) rejected (last: {last_failure})"),
        })
    }

    /// Close the socket and forget the cached login. Safe to call repeatedly.
    pub async fn disconnect(&mut self) {
        if let Some(transport) = self.transport.take() {
            let mut stream = transport.into_inner();
            if let Err(e) = stream.shutdown().await {
                debug!(error = %e, "socket shutdown failed");
            }
            debug!(peer = %self.peer(), "disconnected");
        }
        self.state = ConnectionState::Disconnected;
        self.cache_valid_until = None;
    }

    /// Drop the connection and log in again with the same candidates.
    pub async fn reconnect(&mut self) -> Result<(), Error> {
        info!(peer = %self.peer(), "reconnecting");
        self.disconnect().await;
        self.connect().await
    }

    /// Forget the connection without a graceful shutdown. Used after
    /// failures that leave the stream in an unknown position.
    pub(crate) fn invalidate(&mut self) {
        self.transport = None;
        self.state = ConnectionState::Disconnected;
        self.cache_valid_until = None;
    }

    async fn open(&self) -> Result<Transport, Error> {
        if self.host.trim().is_empty() {
            return Err(Error::InvalidAddress {
                address: self.peer(),
                reason: "host is empty".into(),
            });
        }

        let peer = self.peer();
        debug!(%peer, "opening connection");
        let stream = timeout(self.config.connect_timeout, TcpStream::connect(&peer))
            .await
            .map_err(|_| Error::Timeout {
                waiting_for: "TCP connect",
                timeout: self.config.connect_timeout,
            })??;
        stream.set_nodelay(true)?;

        let codec =
            SentenceCodec::new(self.config.max_word_len).with_tap(self.config.tap.clone());
        Ok(Framed::new(stream, codec))
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("peer", &self.peer())
            .field("state", &self.state)
            .field("candidates", &self.credentials.len())
            .field("cached", &self.is_cached())
            .finish_non_exhaustive()
    }
}

/// Two-step login: an empty `/login` to confirm the peer speaks the
/// protocol, then `/login` with the name and password attributes.
async fn login(
    transport: &mut Transport,
    credential: &Credential,
    config: &TransportConfig,
) -> Result<(), Error> {
    let limit = config.max_reply_sentences;

    round_trip(transport, &Sentence::new("/login"), config.login_timeout, limit)
        .await?
        .into_result()?;

    // Plaintext password, as the router expects on this port.
    let request = Sentence::new("/login")
        .with_attribute("name", &credential.username)
        .with_attribute("password", credential.password.expose_secret());
    round_trip(transport, &request, config.login_timeout, limit)
        .await?
        .into_result()?;
    Ok(())
}
