//! Ordered, append-only message timeline for the active room.

use roomchat_protocol::ChatMessage;

/// In-memory view of one room's messages: history first, in returned
/// order, then live messages in subscription-arrival order.
#[derive(Debug, Default)]
pub struct Timeline {
	room_id: String,
	messages: Vec<ChatMessage>,
}

impl Timeline {
	/// Creates an empty timeline scoped to `room_id`.
	pub fn new(room_id: impl Into<String>) -> Self {
		Self {
			room_id: room_id.into(),
			messages: Vec::new(),
		}
	}

	/// Room this timeline belongs to.
	pub fn room_id(&self) -> &str {
		&self.room_id
	}

	/// Inserts an ordered history fetch result ahead of any messages
	/// appended while the fetch was in flight.
	pub fn seed(&mut self, mut history: Vec<ChatMessage>) {
		history.append(&mut self.messages);
		self.messages = history;
	}

	/// Appends one live message.
	///
	/// No dedup by identity: the transport is at-least-once per topic,
	/// so a reconnect racing a teardown can deliver duplicates, and the
	/// wire format carries no identity to dedup on. Accepted tradeoff.
	pub fn append(&mut self, message: ChatMessage) {
		self.messages.push(message);
	}

	/// Read-only copy for rendering.
	pub fn snapshot(&self) -> Vec<ChatMessage> {
		self.messages.clone()
	}

	pub fn len(&self) -> usize {
		self.messages.len()
	}

	pub fn is_empty(&self) -> bool {
		self.messages.is_empty()
	}
}
