//! Pub/sub frames exchanged over the transport.
//!
//! Frames are JSON text messages tagged by a `type` field. The transport
//! guarantees no stronger than at-least-once, in-order-per-topic delivery;
//! consumers must tolerate duplicate `message` frames.

use serde::{Deserialize, Serialize};

use crate::message::{ChatMessage, OutboundMessage};

/// Client-to-server control and publish frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
	Subscribe { topic: String },
	Unsubscribe { topic: String },
	Publish { destination: String, body: OutboundMessage },
}

/// Server-to-client frames delivered on subscribed topics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
	Message { topic: String, body: ChatMessage },
	Error { code: String, message: String },
}
