// guestwire-core: Hotspot user and session management over the router protocol.

pub mod config;
pub mod error;
pub mod hotspot;
pub mod model;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{OperationTimeouts, RouterConfig};
pub use error::{CoreError, ErrorKind};
pub use hotspot::HotspotClient;
pub use model::{
    ActiveSession, HotspotUser, NewHotspotUser, format_router_duration, parse_router_duration,
};

pub use guestwire_api::{
    AttributeRecord, ConnectionState, Credential, DEFAULT_PORT, Sentence, Session, TransportConfig,
};
