//! Engine configuration.

/// Policy applied by the facade after unexpected transport loss.
///
/// The supervisor itself never reconnects; blind resumption could rejoin
/// a stale room after logout, so the decision is made here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconnectPolicy {
	/// Only surface the loss; the user re-joins explicitly.
	#[default]
	Manual,
	/// Re-invoke `connect` once per loss event while the session is
	/// active, surfacing failure as a notice.
	Auto,
}

/// Configuration for a [`ChatSession`](crate::session::ChatSession).
#[derive(Debug, Clone)]
pub struct ChatConfig {
	/// Base URL of the room registry and history endpoints.
	pub api_base_url: String,
	/// WebSocket endpoint of the pub/sub transport.
	pub ws_url: String,
	/// What to do after unexpected transport loss.
	pub reconnect: ReconnectPolicy,
}

impl ChatConfig {
	/// Builds a config for `api_base_url`/`ws_url` with the default
	/// reconnect policy.
	pub fn new(api_base_url: impl Into<String>, ws_url: impl Into<String>) -> Self {
		Self {
			api_base_url: api_base_url.into(),
			ws_url: ws_url.into(),
			reconnect: ReconnectPolicy::default(),
		}
	}

	/// Sets the reconnect policy.
	pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
		self.reconnect = reconnect;
		self
	}
}
