//! Wire types for the room chat protocol.
//!
//! This crate contains the serde-serializable types used for communication
//! with the chat server: room registry responses, message bodies, and the
//! pub/sub frames exchanged over the transport. These types represent the
//! "protocol layer" - the shapes of data as they appear on the wire.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization
//! * 1:1 with protocol: Match the server's wire schema (camelCase fields)
//! * Stable: Changes only when the wire protocol changes
//!
//! Higher-level ergonomic APIs are built on top of these types in
//! `roomchat-rs`.

pub mod frame;
pub mod message;
pub mod room;

pub use frame::*;
pub use message::*;
pub use room::*;
