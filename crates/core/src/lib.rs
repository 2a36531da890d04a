//! Realtime room chat client engine.
//!
//! The engine owns room-membership state, supervises the pub/sub
//! transport, orders incoming messages, and restores or destroys session
//! state across restarts. The presentation layer talks only to
//! [`ChatSession`] and observes [`SessionEvent`]s and the timeline; it
//! never touches the socket.
//!
//! # Components
//!
//! * [`directory`] - room registry and history client (request/response)
//! * [`store`] - durable session snapshot, injectable for tests
//! * [`timeline`] - ordered, append-only message view for one room
//! * [`session`] - the facade enforcing the session state machine
//!
//! The transport itself lives in `roomchat-runtime`; wire shapes in
//! `roomchat-protocol` (re-exported as [`protocol`]).

pub mod config;
pub mod directory;
pub mod error;
pub mod session;
pub mod store;
pub mod timeline;

pub use config::{ChatConfig, ReconnectPolicy};
pub use directory::{HttpRoomDirectory, RoomDirectory};
pub use error::{ChatError, Result};
pub use session::{ChatSession, SessionEvent, SessionState};
pub use store::{FsSessionStore, MemorySessionStore, Session, SessionSnapshot, SessionStore};
pub use timeline::Timeline;

pub use roomchat_protocol as protocol;
pub use roomchat_runtime as runtime;
