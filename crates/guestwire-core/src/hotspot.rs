// ── Hotspot operations ──
//
// The public domain API: add, remove and list hotspot users, list and
// kick active sessions. Each entry point takes the session lock for its
// whole duration, so commands never interleave on the connection, and
// gets exactly one reconnect-and-retry when the connection breaks.

use std::time::Duration;

use guestwire_api::{AttributeRecord, ConnectionState, Error as ApiError, Sentence, Session, parse};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{OperationTimeouts, RouterConfig};
use crate::error::{CoreError, ErrorKind, classify_trap};
use crate::model::{ActiveSession, HotspotUser, NewHotspotUser, format_router_duration};

const USER_ADD: &str = "/ip/hotspot/user/add";
const USER_REMOVE: &str = "/ip/hotspot/user/remove";
const USER_PRINT: &str = "/ip/hotspot/user/print";
const ACTIVE_PRINT: &str = "/ip/hotspot/active/print";
const ACTIVE_REMOVE: &str = "/ip/hotspot/active/remove";

/// Hotspot management client for one router.
///
/// Holds a single connection; concurrent callers queue on its lock. Use
/// one client per router (or several, for parallel independent work).
pub struct HotspotClient {
    session: Mutex<Session>,
    timeouts: OperationTimeouts,
}

impl HotspotClient {
    pub fn new(config: RouterConfig) -> Self {
        let session = Session::new(config.host, config.port, config.credentials, config.transport);
        Self::from_session(session, config.timeouts)
    }

    /// Wrap an existing (possibly already connected) session.
    pub fn from_session(session: Session, timeouts: OperationTimeouts) -> Self {
        Self {
            session: Mutex::new(session),
            timeouts,
        }
    }

    pub fn timeouts(&self) -> &OperationTimeouts {
        &self.timeouts
    }

    pub async fn connection_state(&self) -> ConnectionState {
        self.session.lock().await.state()
    }

    /// Connect eagerly (operations connect on demand otherwise).
    pub async fn connect(&self) -> Result<(), CoreError> {
        Ok(self.session.lock().await.connect().await?)
    }

    /// Close the connection. Further operations reconnect.
    pub async fn close(&self) {
        self.session.lock().await.disconnect().await;
    }

    // ── Users ────────────────────────────────────────────────────────

    /// Add a hotspot user. Returns the router's id for it when reported.
    pub async fn create_user(&self, user: &NewHotspotUser) -> Result<Option<String>, CoreError> {
        let mut request = Sentence::new(USER_ADD)
            .with_attribute("name", &user.name)
            .with_attribute("password", &user.password);
        if let Some(profile) = &user.profile {
            request = request.with_attribute("profile", profile);
        }
        if let Some(limit) = user.time_limit {
            request = request.with_attribute("limit-uptime", &format_router_duration(limit));
        }
        if let Some(comment) = &user.comment {
            request = request.with_attribute("comment", comment);
        }
        let timeout = self.timeouts.create;

        let result = self
            .with_reconnect("create_user", async |session: &mut Session| {
                let batch = session.execute(&request, timeout).await?;
                Ok::<_, ApiError>(batch.ret().map(str::to_owned))
            })
            .await;

        match result {
            Ok(id) => {
                info!(name = %user.name, id = ?id, "hotspot user created");
                Ok(id)
            }
            Err(ApiError::RemoteTrap { message, .. }) => {
                warn!(name = %user.name, %message, "router refused new user");
                Err(if classify_trap(&message) == ErrorKind::AlreadyExists {
                    CoreError::AlreadyExists {
                        name: user.name.clone(),
                        message,
                    }
                } else {
                    CoreError::UserCreationFailed {
                        name: user.name.clone(),
                        message,
                    }
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a hotspot user by name.
    ///
    /// Tries a direct removal by name first; if the router refuses it,
    /// looks the user up to recover its id and removes by id.
    pub async fn remove_user(&self, name: &str) -> Result<(), CoreError> {
        let timeout = self.timeouts.remove;
        let removed = self
            .with_reconnect("remove_user", async |session: &mut Session| {
                remove_user_once(session, name, timeout).await
            })
            .await?;

        if removed {
            info!(name, "hotspot user removed");
            Ok(())
        } else {
            Err(CoreError::UserNotFound { name: name.into() })
        }
    }

    pub async fn list_users(&self) -> Result<Vec<HotspotUser>, CoreError> {
        let records = self.print(Sentence::new(USER_PRINT), "list_users").await?;
        Ok(records.iter().map(HotspotUser::from).collect())
    }

    /// Look up a single user by name. `Ok(None)` when the router has no such user.
    pub async fn find_user(&self, name: &str) -> Result<Option<HotspotUser>, CoreError> {
        let request = Sentence::new(USER_PRINT).with_query("name", name);
        let records = self.print(request, "find_user").await?;
        Ok(records.first().map(HotspotUser::from))
    }

    // ── Active sessions ──────────────────────────────────────────────

    pub async fn list_active_sessions(&self) -> Result<Vec<ActiveSession>, CoreError> {
        let records = self
            .print(Sentence::new(ACTIVE_PRINT), "list_active_sessions")
            .await?;
        Ok(records.iter().map(ActiveSession::from).collect())
    }

    /// Kick every active session of `user`.
    ///
    /// Returns `false` when the user had no active session; that is not an error.
    pub async fn disconnect_active_session(&self, user: &str) -> Result<bool, CoreError> {
        let timeout = self.timeouts.disconnect;
        let kicked = self
            .with_reconnect("disconnect_active_session", async |session: &mut Session| {
                disconnect_once(session, user, timeout).await
            })
            .await?;

        if kicked > 0 {
            info!(user, sessions = kicked, "active session(s) disconnected");
        } else {
            debug!(user, "no active session to disconnect");
        }
        Ok(kicked > 0)
    }

    // ── Passthrough ──────────────────────────────────────────────────

    /// Run an arbitrary command and return its rows. Paths are not validated.
    pub async fn run_raw(&self, command: Sentence) -> Result<Vec<AttributeRecord>, CoreError> {
        let timeout = self.timeouts.raw;
        let batch = self
            .with_reconnect("run_raw", async |session: &mut Session| {
                session.execute(&command, timeout).await
            })
            .await?;
        Ok(parse(&batch))
    }

    // ── Internals ────────────────────────────────────────────────────

    async fn print(
        &self,
        request: Sentence,
        operation: &'static str,
    ) -> Result<Vec<AttributeRecord>, CoreError> {
        let timeout = self.timeouts.list;
        let batch = self
            .with_reconnect(operation, async |session: &mut Session| {
                session.execute(&request, timeout).await
            })
            .await?;
        let records = parse(&batch);
        debug!(operation, rows = records.len(), "listing parsed");
        Ok(records)
    }

    /// Run `op` on a connected session, with one reconnect and one retry
    /// if the first attempt loses the link (I/O, framing, `!fatal`).
    ///
    /// Timeouts are returned without a retry; the failed attempt has
    /// already dropped the connection, so the next operation reconnects.
    /// `!trap` replies and authentication failures are returned as-is.
    async fn with_reconnect<T>(
        &self,
        operation: &'static str,
        mut op: impl AsyncFnMut(&mut Session) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let mut session = self.session.lock().await;

        let first = match session.connect().await {
            Ok(()) => op(&mut *session).await,
            Err(e) => Err(e),
        };

        match first {
            Err(e) if e.is_retryable() => {
                warn!(operation, error = %e, "connection-level failure, reconnecting once");
                session.reconnect().await?;
                op(&mut *session).await
            }
            other => other,
        }
    }
}

impl std::fmt::Debug for HotspotClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotspotClient")
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

/// One attempt at the two-phase removal. `Ok(false)` means the user does
/// not exist.
async fn remove_user_once(
    session: &mut Session,
    name: &str,
    timeout: Duration,
) -> Result<bool, ApiError> {
    let direct = Sentence::new(USER_REMOVE).with_attribute("numbers", name);
    match session.execute(&direct, timeout).await {
        Ok(_) => return Ok(true),
        Err(ApiError::RemoteTrap { message, .. }) => {
            debug!(name, %message, "direct removal refused, looking up id");
        }
        Err(e) => return Err(e),
    }

    let lookup = Sentence::new(USER_PRINT).with_query("name", name);
    let batch = session.execute(&lookup, timeout).await?;
    let Some(id) = parse(&batch)
        .iter()
        .find_map(|r| r.get(".id").map(str::to_owned))
    else {
        return Ok(false);
    };

    let by_id = Sentence::new(USER_REMOVE).with_attribute(".id", &id);
    session.execute(&by_id, timeout).await?;
    Ok(true)
}

/// One attempt at kicking `user`. Returns how many sessions were removed.
async fn disconnect_once(
    session: &mut Session,
    user: &str,
    timeout: Duration,
) -> Result<usize, ApiError> {
    let lookup = Sentence::new(ACTIVE_PRINT).with_query("user", user);
    let batch = session.execute(&lookup, timeout).await?;
    let ids: Vec<String> = parse(&batch)
        .iter()
        .filter_map(|r| r.get(".id").map(str::to_owned))
        .collect();

    let mut removed = 0;
    for id in &ids {
        let remove = Sentence::new(ACTIVE_REMOVE).with_attribute(".id", id);
        match session.execute(&remove, timeout).await {
            Ok(_) => removed += 1,
            // The session logged out between lookup and removal.
            Err(ApiError::RemoteTrap { message, .. }) => {
                debug!(user, id, %message, "active session already gone");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(removed)
}
