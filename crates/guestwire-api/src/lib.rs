// guestwire-api: Async client for the router's binary management protocol

pub mod codec;
pub mod error;
pub mod executor;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod parser;
pub mod sentence;
pub mod session;
pub mod transport;

pub use codec::{SentenceCodec, WireTap, decode_length, encode_length};
pub use error::Error;
pub use parser::{AttributeRecord, extract_field, parse, parse_words};
pub use sentence::{BatchStatus, ReplyBatch, ReplyKind, Sentence};
pub use session::{ConnectionState, Credential, Session};
pub use transport::{DEFAULT_PORT, TransportConfig};
