//! Transport-level error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors surfaced by the transport layer.
#[derive(Debug, Error)]
pub enum TransportError {
	/// Opening the connection or subscribing failed.
	#[error("connection failed: {0}")]
	Connect(String),

	/// A publish was attempted outside the `Connected` state.
	#[error("not connected")]
	NotConnected,

	/// The underlying connection went away mid-operation.
	#[error("transport closed")]
	Closed,

	/// A frame could not be encoded or decoded.
	#[error("frame serialization failed: {0}")]
	Serde(#[from] serde_json::Error),
}
