//! Chat message wire shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message as returned by the history endpoint and broadcast on a room
/// topic.
///
/// ```json
/// {
///   "sender": "alice",
///   "content": "hi there",
///   "timeStamp": "2026-08-30T18:04:11Z",
///   "roomId": "rust-club"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
	/// Display name of the author.
	pub sender: String,
	/// Message text as typed.
	pub content: String,
	/// Assigned server-side on receipt; absent from outbound publishes.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub time_stamp: Option<DateTime<Utc>>,
	/// Room this message belongs to.
	pub room_id: String,
}

/// Outbound publish payload.
///
/// The timestamp is deliberately absent: the server stamps messages on
/// receipt, so the client never claims a send time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
	pub sender: String,
	pub content: String,
	pub room_id: String,
}

impl OutboundMessage {
	/// Builds the publish payload for `content` from `sender` in `room_id`.
	pub fn new(sender: impl Into<String>, content: impl Into<String>, room_id: impl Into<String>) -> Self {
		Self {
			sender: sender.into(),
			content: content.into(),
			room_id: room_id.into(),
		}
	}
}
