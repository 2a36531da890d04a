//! Chat transport lifecycle, connection, and supervision.
//!
//! This crate owns the live pub/sub connection: opening the WebSocket,
//! subscribing to a room topic, publishing frames, and reporting unexpected
//! loss. Nothing above this crate touches the socket directly; consumers
//! speak through [`TransportSupervisor`] or inject their own
//! [`transport::Connector`] (see [`fake`]) for tests.

pub mod error;
pub mod fake;
pub mod supervisor;
pub mod transport;

pub use error::{Result, TransportError};
pub use supervisor::{ConnectionState, TransportSupervisor};
pub use transport::{Connector, Transport, TransportParts, TransportReceiver, WebSocketConnector, WebSocketTransport};
