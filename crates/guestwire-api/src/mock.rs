// Scripted in-process router for tests
//
// Speaks the real wire format over a loopback socket. Login is handled
// here against a fixed account list; every other command is logged and
// answered by the caller's handler.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;

use crate::codec::SentenceCodec;
use crate::sentence::Sentence;

/// What the mock router does with one request.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Write these sentences, terminator or not.
    Send(Vec<Sentence>),
    /// Wait, then write these sentences.
    Delayed(Duration, Vec<Sentence>),
    /// Write nothing and keep the connection open.
    Silence,
    /// Drop the connection.
    Close,
}

/// Per-connection facts handed to the handler.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    /// Zero-based index of the accepted connection.
    pub connection: usize,
}

pub type Handler = Arc<dyn Fn(&RequestContext, &Sentence) -> Reply + Send + Sync>;

pub struct MockRouter {
    addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    commands: Arc<Mutex<Vec<Sentence>>>,
    task: JoinHandle<()>,
}

impl MockRouter {
    /// Listen on an ephemeral loopback port.
    ///
    /// `accounts` are the `(name, password)` pairs accepted by `/login`.
    pub async fn start(
        accounts: &[(&str, &str)],
        handler: impl Fn(&RequestContext, &Sentence) -> Reply + Send + Sync + 'static,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let accounts: Arc<Vec<(String, String)>> = Arc::new(
            accounts
                .iter()
                .map(|(n, p)| ((*n).to_owned(), (*p).to_owned()))
                .collect(),
        );
        let handler: Handler = Arc::new(handler);
        let connections = Arc::new(AtomicUsize::new(0));
        let commands = Arc::new(Mutex::new(Vec::new()));

        let task = {
            let connections = Arc::clone(&connections);
            let commands = Arc::clone(&commands);
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let ctx = RequestContext {
                        connection: connections.fetch_add(1, Ordering::SeqCst),
                    };
                    tokio::spawn(serve(
                        stream,
                        ctx,
                        Arc::clone(&accounts),
                        Arc::clone(&handler),
                        Arc::clone(&commands),
                    ));
                }
            })
        };

        Ok(Self {
            addr,
            connections,
            commands,
            task,
        })
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Number of TCP connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Every non-login command received, in order.
    pub fn commands(&self) -> Vec<Sentence> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Drop for MockRouter {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    stream: TcpStream,
    ctx: RequestContext,
    accounts: Arc<Vec<(String, String)>>,
    handler: Handler,
    commands: Arc<Mutex<Vec<Sentence>>>,
) {
    let mut framed = Framed::new(stream, SentenceCodec::default());
    let mut authenticated = false;

    while let Some(Ok(request)) = framed.next().await {
        let reply = if request.command() == Some("/login") {
            match (request.attribute("name"), request.attribute("password")) {
                (None, _) => Reply::Send(vec![done()]),
                (Some(name), Some(password))
                    if accounts.iter().any(|(n, p)| n == name && p == password) =>
                {
                    authenticated = true;
                    Reply::Send(vec![done()])
                }
                _ => Reply::Send(vec![trap("invalid user name or password (6)"), done()]),
            }
        } else {
            commands
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request.clone());
            if authenticated {
                handler(&ctx, &request)
            } else {
                Reply::Send(vec![trap("not logged in"), done()])
            }
        };

        let sentences = match reply {
            Reply::Send(sentences) => sentences,
            Reply::Delayed(pause, sentences) => {
                tokio::time::sleep(pause).await;
                sentences
            }
            Reply::Silence => continue,
            Reply::Close => return,
        };
        for sentence in &sentences {
            if framed.send(sentence).await.is_err() {
                return;
            }
        }
    }
}

/// `!done`
pub fn done() -> Sentence {
    Sentence::new("!done")
}

/// `!trap =message=...`
pub fn trap(message: &str) -> Sentence {
    Sentence::new("!trap").with_attribute("message", message)
}

/// `!fatal <message>`
pub fn fatal(message: &str) -> Sentence {
    Sentence::new("!fatal").with_word(message)
}

/// `!re` with the given attributes.
pub fn row(fields: &[(&str, &str)]) -> Sentence {
    fields
        .iter()
        .fold(Sentence::new("!re"), |s, (k, v)| s.with_attribute(k, v))
}
