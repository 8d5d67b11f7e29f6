// Command execution
//
// Writes one command sentence and drains its reply batch. The read loop is
// bounded twice: by an absolute deadline and by a sentence ceiling, so a
// peer that never sends `!done` cannot hold a caller forever.

use std::io;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

use crate::error::Error;
use crate::sentence::{ReplyBatch, ReplyKind, Sentence};
use crate::session::{ConnectionState, Session, Transport};

impl Session {
    /// Send `command` and collect its reply batch within `timeout`.
    ///
    /// `!trap` replies come back as [`Error::RemoteTrap`] and leave the
    /// connection usable. Every connection-level failure (timeout, `!fatal`,
    /// I/O, framing) drops the connection; call [`reconnect`](Self::reconnect)
    /// before issuing more commands. Dropping the returned future mid-reply
    /// leaves the session [`Busy`](ConnectionState::Busy), which forces a
    /// fresh handshake on the next [`connect`](Self::connect).
    pub async fn execute(
        &mut self,
        command: &Sentence,
        timeout: Duration,
    ) -> Result<ReplyBatch, Error> {
        if self.state != ConnectionState::Authenticated {
            return Err(Error::NotConnected);
        }
        let limit = self.config.max_reply_sentences;
        let Some(transport) = self.transport.as_mut() else {
            return Err(Error::NotConnected);
        };

        debug!(%command, timeout_ms = timeout.as_millis(), "executing command");

        // Stays `Busy` if this future is dropped before the batch is drained.
        self.state = ConnectionState::Busy;
        let result = match round_trip(transport, command, timeout, limit).await {
            Ok(batch) => batch.into_result(),
            Err(e) => Err(e),
        };

        match result {
            Ok(batch) => {
                self.state = ConnectionState::Authenticated;
                debug!(rows = batch.row_count(), "command completed");
                Ok(batch)
            }
            Err(e) if e.is_connection_level() => {
                warn!(error = %e, command = ?command.command(), "dropping connection");
                self.invalidate();
                Err(e)
            }
            Err(e) => {
                self.state = ConnectionState::Authenticated;
                debug!(error = %e, "command rejected by router");
                Err(e)
            }
        }
    }
}

/// Write `command`, then read sentences until `!done` / `!fatal`, the
/// deadline, or `max_sentences`, whichever comes first.
pub(crate) async fn round_trip(
    transport: &mut Transport,
    command: &Sentence,
    timeout: Duration,
    max_sentences: usize,
) -> Result<ReplyBatch, Error> {
    let deadline = Instant::now() + timeout;

    timeout_at(deadline, transport.send(command))
        .await
        .map_err(|_| Error::Timeout {
            waiting_for: "command write",
            timeout,
        })??;

    let mut sentences: Vec<Sentence> = Vec::new();
    while sentences.len() < max_sentences {
        let Ok(next) = timeout_at(deadline, transport.next()).await else {
            return Err(if sentences.is_empty() {
                Error::Timeout {
                    waiting_for: "reply",
                    timeout,
                }
            } else {
                Error::PartialTimeout {
                    timeout,
                    partial: sentences,
                }
            });
        };

        let sentence = match next {
            Some(decoded) => decoded?,
            None => {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed by router",
                )));
            }
        };

        let kind = sentence.reply_kind();
        if kind.is_none() {
            debug!(%sentence, "reply sentence without a marker");
        }
        sentences.push(sentence);
        if kind.is_some_and(ReplyKind::ends_batch) {
            return Ok(ReplyBatch::new(sentences));
        }
    }

    Err(Error::ReplyLimitExceeded {
        limit: max_sentences,
        partial: sentences,
    })
}
