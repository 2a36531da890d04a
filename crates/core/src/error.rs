//! Error taxonomy for the chat session engine.
//!
//! Every error a caller can see maps onto one of these variants; none is
//! fatal to the process. The facade recovers them at its boundary and
//! turns them into a single surfaced notification.

use roomchat_runtime::TransportError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChatError>;

/// Errors surfaced by the chat session engine.
#[derive(Debug, Error)]
pub enum ChatError {
	/// Caller-correctable input problem; never reaches the network.
	#[error("invalid input: {0}")]
	Validation(String),

	/// The requested room does not exist.
	#[error("room not found: {0}")]
	NotFound(String),

	/// A room with that id already exists.
	#[error("room already exists: {0}")]
	AlreadyExists(String),

	/// Network or server failure; retryable by re-invoking the same
	/// operation.
	#[error("transient failure: {0}")]
	Transient(String),

	/// A publish was attempted while disconnected; surfaced, not queued.
	#[error("not connected to the room")]
	NotConnected,

	/// Connect/subscribe failure; the session stays active.
	#[error("connection failed: {0}")]
	Connection(String),

	/// Durable snapshot storage failure.
	#[error("session storage failed: {0}")]
	Storage(#[from] std::io::Error),
}

impl ChatError {
	/// Stable machine-readable code for surfaced notifications.
	pub fn code(&self) -> &'static str {
		match self {
			ChatError::Validation(_) => "VALIDATION",
			ChatError::NotFound(_) => "NOT_FOUND",
			ChatError::AlreadyExists(_) => "ALREADY_EXISTS",
			ChatError::Transient(_) => "TRANSIENT",
			ChatError::NotConnected => "NOT_CONNECTED",
			ChatError::Connection(_) => "CONNECTION_FAILED",
			ChatError::Storage(_) => "STORAGE",
		}
	}

	/// Whether re-invoking the failed operation can succeed unchanged.
	pub fn is_transient(&self) -> bool {
		matches!(self, ChatError::Transient(_) | ChatError::Connection(_) | ChatError::NotConnected)
	}
}

impl From<reqwest::Error> for ChatError {
	fn from(err: reqwest::Error) -> Self {
		ChatError::Transient(err.to_string())
	}
}

impl From<TransportError> for ChatError {
	fn from(err: TransportError) -> Self {
		match err {
			TransportError::NotConnected => ChatError::NotConnected,
			TransportError::Closed => ChatError::NotConnected,
			other => ChatError::Connection(other.to_string()),
		}
	}
}
