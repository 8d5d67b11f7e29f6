#![allow(clippy::unwrap_used)]
// Integration tests for `Session` against the scripted mock router.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;

use guestwire_api::mock::{MockRouter, Reply, done, fatal, row, trap};
use guestwire_api::{
    ConnectionState, Credential, Error, Sentence, Session, TransportConfig, WireTap, parse,
};

// ── Helpers ─────────────────────────────────────────────────────────

const ACCOUNTS: &[(&str, &str)] = &[("api", "s3cret")];

fn session_for(router: &MockRouter, credentials: Vec<Credential>, config: TransportConfig) -> Session {
    Session::new(router.host(), router.port(), credentials, config)
}

fn good() -> Vec<Credential> {
    vec![Credential::new("api", "s3cret")]
}

fn print_users() -> Sentence {
    Sentence::new("/ip/hotspot/user/print")
}

const SHORT: Duration = Duration::from_millis(300);

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_connect_with_valid_credentials() {
    let router = MockRouter::start(ACCOUNTS, |_, _| Reply::Send(vec![done()]))
        .await
        .unwrap();
    let mut session = session_for(&router, good(), TransportConfig::default());

    assert_eq!(session.state(), ConnectionState::Disconnected);
    session.connect().await.unwrap();
    assert_eq!(session.state(), ConnectionState::Authenticated);
    assert!(session.is_cached());
}

#[tokio::test]
async fn test_connect_falls_through_candidates_on_one_socket() {
    let router = MockRouter::start(ACCOUNTS, |_, _| Reply::Send(vec![done()]))
        .await
        .unwrap();
    let candidates = vec![
        Credential::new("admin", ""),
        Credential::new("admin", "admin"),
        Credential::new("api", "s3cret"),
    ];
    let mut session = session_for(&router, candidates, TransportConfig::default());

    session.connect().await.unwrap();
    assert_eq!(session.state(), ConnectionState::Authenticated);
    assert_eq!(router.connections(), 1);
}

#[tokio::test]
async fn test_connect_exhausts_candidates() {
    let router = MockRouter::start(ACCOUNTS, |_, _| Reply::Send(vec![done()]))
        .await
        .unwrap();
    let candidates = vec![Credential::new("admin", ""), Credential::new("guest", "guest")];
    let mut session = session_for(&router, candidates, TransportConfig::default());

    let result = session.connect().await;
    match result {
        Err(Error::AuthenticationFailed { message }) => {
            assert!(message.contains("2 credential candidate(s)"), "{message}");
            assert!(message.contains("invalid user name or password"), "{message}");
        }
        other => panic!("expected AuthenticationFailed, got: {other:?}"),
    }
    assert_eq!(session.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_connect_without_candidates_fails_fast() {
    let mut session = Session::with_defaults("127.0.0.1", Vec::new());
    let result = session.connect().await;
    assert!(
        matches!(result, Err(Error::AuthenticationFailed { .. })),
        "expected AuthenticationFailed, got: {result:?}"
    );
}

#[tokio::test]
async fn test_connect_refused_is_not_an_auth_failure() {
    // Bind then drop to get a port nobody listens on.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let mut session = Session::new("127.0.0.1", port, good(), TransportConfig::default());

    let result = session.connect().await;
    assert!(
        matches!(result, Err(Error::Io(_) | Error::Timeout { .. })),
        "expected a connection error, got: {result:?}"
    );
    assert_eq!(session.state(), ConnectionState::Disconnected);
}

// ── Connection cache ────────────────────────────────────────────────

#[tokio::test]
async fn test_cached_connection_is_reused() {
    let router = MockRouter::start(ACCOUNTS, |_, _| Reply::Send(vec![done()]))
        .await
        .unwrap();
    let mut session = session_for(&router, good(), TransportConfig::default());

    session.connect().await.unwrap();
    session.connect().await.unwrap();
    assert_eq!(router.connections(), 1);

    session.disconnect().await;
    assert!(!session.is_cached());
    session.connect().await.unwrap();
    assert_eq!(router.connections(), 2);
}

#[tokio::test]
async fn test_expired_cache_triggers_new_handshake() {
    let router = MockRouter::start(ACCOUNTS, |_, _| Reply::Send(vec![done()]))
        .await
        .unwrap();
    let config = TransportConfig {
        cache_ttl: Duration::ZERO,
        ..TransportConfig::default()
    };
    let mut session = session_for(&router, good(), config);

    session.connect().await.unwrap();
    session.connect().await.unwrap();
    assert_eq!(router.connections(), 2);
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let router = MockRouter::start(ACCOUNTS, |_, _| Reply::Send(vec![done()]))
        .await
        .unwrap();
    let mut session = session_for(&router, good(), TransportConfig::default());
    session.connect().await.unwrap();

    session.disconnect().await;
    session.disconnect().await;
    assert_eq!(session.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_reconnect_opens_a_fresh_connection() {
    let router = MockRouter::start(ACCOUNTS, |_, _| Reply::Send(vec![done()]))
        .await
        .unwrap();
    let mut session = session_for(&router, good(), TransportConfig::default());
    session.connect().await.unwrap();

    session.reconnect().await.unwrap();
    assert_eq!(router.connections(), 2);
    assert_eq!(session.state(), ConnectionState::Authenticated);
}

// ── Execute ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_execute_requires_connection() {
    let mut session = Session::with_defaults("127.0.0.1", good());
    let result = session.execute(&print_users(), SHORT).await;
    assert!(matches!(result, Err(Error::NotConnected)), "got: {result:?}");
}

#[tokio::test]
async fn test_execute_collects_rows() {
    let router = MockRouter::start(ACCOUNTS, |_, _| {
        Reply::Send(vec![
            row(&[(".id", "*1"), ("name", "guest-1"), ("profile", "default")]),
            row(&[(".id", "*2"), ("name", "guest-2")]),
            done(),
        ])
    })
    .await
    .unwrap();
    let mut session = session_for(&router, good(), TransportConfig::default());
    session.connect().await.unwrap();

    let batch = session.execute(&print_users(), SHORT).await.unwrap();
    let records = parse(&batch);

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get("name"), Some("guest-1"));
    assert_eq!(records[1].get(".id"), Some("*2"));
    assert_eq!(router.commands(), vec![print_users()]);
}

#[tokio::test]
async fn test_trap_keeps_connection_usable() {
    let router = MockRouter::start(ACCOUNTS, |_, req| {
        if req.command() == Some("/ip/hotspot/user/remove") {
            Reply::Send(vec![trap("no such item"), done()])
        } else {
            Reply::Send(vec![done()])
        }
    })
    .await
    .unwrap();
    let mut session = session_for(&router, good(), TransportConfig::default());
    session.connect().await.unwrap();

    let remove = Sentence::new("/ip/hotspot/user/remove").with_attribute("numbers", "ghost");
    let result = session.execute(&remove, SHORT).await;
    match result {
        Err(Error::RemoteTrap { message, .. }) => assert_eq!(message, "no such item"),
        other => panic!("expected RemoteTrap, got: {other:?}"),
    }

    assert_eq!(session.state(), ConnectionState::Authenticated);
    session.execute(&print_users(), SHORT).await.unwrap();
    assert_eq!(router.connections(), 1);
}

#[tokio::test]
async fn test_fatal_drops_connection() {
    let router = MockRouter::start(ACCOUNTS, |_, _| {
        Reply::Send(vec![fatal("session terminated on request")])
    })
    .await
    .unwrap();
    let mut session = session_for(&router, good(), TransportConfig::default());
    session.connect().await.unwrap();

    let result = session.execute(&print_users(), SHORT).await;
    assert!(matches!(result, Err(Error::RemoteFatal { .. })), "got: {result:?}");
    assert_eq!(session.state(), ConnectionState::Disconnected);

    let again = session.execute(&print_users(), SHORT).await;
    assert!(matches!(again, Err(Error::NotConnected)), "got: {again:?}");
}

#[tokio::test]
async fn test_peer_close_mid_batch_is_connection_error() {
    let router = MockRouter::start(ACCOUNTS, |_, _| Reply::Close).await.unwrap();
    let mut session = session_for(&router, good(), TransportConfig::default());
    session.connect().await.unwrap();

    let err = session.execute(&print_users(), SHORT).await.unwrap_err();
    assert!(err.is_connection_level(), "got: {err:?}");
    assert_eq!(session.state(), ConnectionState::Disconnected);
}

// ── Boundedness ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_dropped_execute_forces_a_fresh_handshake() {
    let router = MockRouter::start(ACCOUNTS, |_, req| {
        if req.command() == Some("/ip/hotspot/active/print") {
            Reply::Delayed(
                Duration::from_millis(300),
                vec![row(&[(".id", "*A"), ("user", "guest-1")]), done()],
            )
        } else {
            Reply::Send(vec![row(&[("name", "guest-2")]), done()])
        }
    })
    .await
    .unwrap();
    let mut session = session_for(&router, good(), TransportConfig::default());
    session.connect().await.unwrap();

    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        session.execute(&Sentence::new("/ip/hotspot/active/print"), SHORT),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(session.state(), ConnectionState::Busy);
    assert!(!session.is_cached());
    assert!(matches!(
        session.execute(&print_users(), SHORT).await,
        Err(Error::NotConnected)
    ));

    session.connect().await.unwrap();
    let batch = session.execute(&print_users(), SHORT).await.unwrap();

    assert_eq!(parse(&batch)[0].get("name"), Some("guest-2"));
    assert_eq!(router.connections(), 2);
    assert_eq!(session.state(), ConnectionState::Authenticated);
}

#[tokio::test]
async fn test_silent_peer_times_out_without_data() {
    let router = MockRouter::start(ACCOUNTS, |_, _| Reply::Silence).await.unwrap();
    let mut session = session_for(&router, good(), TransportConfig::default());
    session.connect().await.unwrap();

    let started = Instant::now();
    let result = session.execute(&print_users(), SHORT).await;
    let elapsed = started.elapsed();

    assert!(matches!(result, Err(Error::Timeout { .. })), "got: {result:?}");
    assert!(elapsed < SHORT + Duration::from_secs(1), "took {elapsed:?}");
    assert_eq!(session.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_unterminated_reply_times_out_with_partial_data() {
    let router = MockRouter::start(ACCOUNTS, |_, _| {
        Reply::Send(vec![row(&[("name", "a")]), row(&[("name", "b")])])
    })
    .await
    .unwrap();
    let mut session = session_for(&router, good(), TransportConfig::default());
    session.connect().await.unwrap();

    let started = Instant::now();
    let result = session.execute(&print_users(), SHORT).await;
    let elapsed = started.elapsed();

    match result {
        Err(Error::PartialTimeout { partial, .. }) => assert_eq!(partial.len(), 2),
        other => panic!("expected PartialTimeout, got: {other:?}"),
    }
    assert!(elapsed < SHORT + Duration::from_secs(1), "took {elapsed:?}");
}

#[tokio::test]
async fn test_reply_ceiling_bounds_the_read_loop() {
    let router = MockRouter::start(ACCOUNTS, |_, _| {
        Reply::Send((0..10).map(|_| row(&[("name", "x")])).collect())
    })
    .await
    .unwrap();
    let config = TransportConfig {
        max_reply_sentences: 5,
        ..TransportConfig::default()
    };
    let mut session = session_for(&router, good(), config);
    session.connect().await.unwrap();

    let result = session
        .execute(&print_users(), Duration::from_secs(5))
        .await;
    match result {
        Err(Error::ReplyLimitExceeded { limit, partial }) => {
            assert_eq!(limit, 5);
            assert_eq!(partial.len(), 5);
        }
        other => panic!("expected ReplyLimitExceeded, got: {other:?}"),
    }
    assert_eq!(session.state(), ConnectionState::Disconnected);
}

// ── Wire tap ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_wire_tap_observes_inbound_bytes() {
    let router = MockRouter::start(ACCOUNTS, |_, _| Reply::Send(vec![done()]))
        .await
        .unwrap();
    let seen = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&seen);
    let tap: WireTap = Arc::new(move |bytes: &[u8]| {
        *counter.lock().unwrap() += bytes.len();
    });
    let config = TransportConfig::default().with_tap(tap);
    let mut session = session_for(&router, good(), config);

    session.connect().await.unwrap();
    session.execute(&print_users(), SHORT).await.unwrap();

    // Two login replies and one command reply, each `!done` + terminator.
    assert_eq!(*seen.lock().unwrap(), 3 * (1 + 5 + 1));
}
