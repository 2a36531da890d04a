//! Room registry and history client.
//!
//! Pure request/response against the server's room endpoints; no state,
//! no retries. Callers decide whether a [`ChatError::Transient`] failure
//! is worth re-invoking.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use roomchat_protocol::{ChatMessage, RoomDescriptor};
use serde_json::json;

use crate::error::{ChatError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Seam for the remote room registry.
#[async_trait]
pub trait RoomDirectory: Send + Sync {
	/// Requests creation of a room with the given id.
	async fn create_room(&self, room_id: &str) -> Result<RoomDescriptor>;
	/// Requests an existing room.
	async fn join_room(&self, room_id: &str) -> Result<RoomDescriptor>;
	/// Fetches prior messages for a room; an empty sequence is valid.
	async fn history(&self, room_id: &str) -> Result<Vec<ChatMessage>>;
}

/// HTTP implementation over the server's room API.
pub struct HttpRoomDirectory {
	client: reqwest::Client,
	base_url: String,
}

impl HttpRoomDirectory {
	/// Creates a directory client against `base_url`.
	pub fn new(base_url: impl Into<String>) -> Result<Self> {
		let client = reqwest::Client::builder()
			.timeout(REQUEST_TIMEOUT)
			.build()
			.map_err(|err| ChatError::Transient(format!("failed to create HTTP client: {err}")))?;
		Ok(Self {
			client,
			base_url: base_url.into().trim_end_matches('/').to_string(),
		})
	}

	fn rooms_url(&self) -> String {
		format!("{}/api/v1/rooms", self.base_url)
	}

	fn room_url(&self, room_id: &str) -> String {
		format!("{}/api/v1/rooms/{room_id}", self.base_url)
	}

	fn messages_url(&self, room_id: &str) -> String {
		format!("{}/api/v1/rooms/{room_id}/messages", self.base_url)
	}
}

#[async_trait]
impl RoomDirectory for HttpRoomDirectory {
	async fn create_room(&self, room_id: &str) -> Result<RoomDescriptor> {
		let response = self
			.client
			.post(self.rooms_url())
			.json(&json!({ "roomId": room_id }))
			.send()
			.await?;

		let status = response.status();
		if let Some(err) = classify_create_status(status, room_id) {
			return Err(err);
		}
		Ok(response.json().await?)
	}

	async fn join_room(&self, room_id: &str) -> Result<RoomDescriptor> {
		let response = self.client.get(self.room_url(room_id)).send().await?;

		let status = response.status();
		if let Some(err) = classify_join_status(status, room_id) {
			return Err(err);
		}
		Ok(response.json().await?)
	}

	async fn history(&self, room_id: &str) -> Result<Vec<ChatMessage>> {
		let response = self.client.get(self.messages_url(room_id)).send().await?;

		let status = response.status();
		if !status.is_success() {
			return Err(ChatError::Transient(format!("history fetch returned {status}")));
		}
		Ok(response.json().await?)
	}
}

/// Maps a create-room response status onto the error taxonomy.
///
/// A 4xx means the registry rejected the id (room exists); anything else
/// non-2xx is a server/network problem worth retrying.
fn classify_create_status(status: StatusCode, room_id: &str) -> Option<ChatError> {
	if status.is_success() {
		None
	} else if status.is_client_error() {
		Some(ChatError::AlreadyExists(room_id.to_string()))
	} else {
		Some(ChatError::Transient(format!("create room returned {status}")))
	}
}

/// Maps a join-room response status onto the error taxonomy.
fn classify_join_status(status: StatusCode, room_id: &str) -> Option<ChatError> {
	if status.is_success() {
		None
	} else if status.is_client_error() {
		Some(ChatError::NotFound(room_id.to_string()))
	} else {
		Some(ChatError::Transient(format!("join room returned {status}")))
	}
}
