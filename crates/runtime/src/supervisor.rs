//! Connection lifecycle supervision for the pub/sub transport.
//!
//! One supervisor owns at most one live connection. The state machine is
//! `Disconnected -> Connecting -> Connected`, cycling back to
//! `Disconnected` on teardown or loss. The supervisor never reconnects on
//! its own; it reports unexpected loss through [`TransportSupervisor::on_disconnect`]
//! and leaves the retry decision to its owner.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use roomchat_protocol::{ClientFrame, OutboundMessage, ServerFrame};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::transport::{Connector, Transport};

/// Observable connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
	Disconnected,
	Connecting,
	Connected,
}

type MessageHandler = Arc<dyn Fn(ServerFrame) + Send + Sync>;
type DisconnectHandler = Arc<dyn Fn() + Send + Sync>;

/// Owns the live pub/sub connection and its read loop.
///
/// Inbound frames are delivered to the single registered handler in
/// arrival order, from one pump task; handlers must not block. No
/// cross-thread marshaling is performed here.
pub struct TransportSupervisor {
	connector: Arc<dyn Connector>,
	url: String,
	state: Mutex<ConnectionState>,
	sender: AsyncMutex<Option<Box<dyn Transport>>>,
	/// Serializes connection attempts so concurrent `connect` calls
	/// coalesce onto one underlying connection.
	connect_gate: AsyncMutex<()>,
	topic: Mutex<Option<String>>,
	handler: Mutex<Option<MessageHandler>>,
	disconnect_handler: Mutex<Option<DisconnectHandler>>,
	/// Bumped per established connection; pump tasks from torn-down
	/// connections compare against it before reporting loss.
	generation: AtomicU64,
	closing: AtomicBool,
}

impl TransportSupervisor {
	/// Creates a supervisor dialing `url` through `connector`.
	pub fn new(connector: Arc<dyn Connector>, url: impl Into<String>) -> Self {
		Self {
			connector,
			url: url.into(),
			state: Mutex::new(ConnectionState::Disconnected),
			sender: AsyncMutex::new(None),
			connect_gate: AsyncMutex::new(()),
			topic: Mutex::new(None),
			handler: Mutex::new(None),
			disconnect_handler: Mutex::new(None),
			generation: AtomicU64::new(0),
			closing: AtomicBool::new(false),
		}
	}

	/// Current connection state.
	pub fn state(&self) -> ConnectionState {
		*self.state.lock()
	}

	/// Whether publishes are currently valid.
	pub fn is_connected(&self) -> bool {
		self.state() == ConnectionState::Connected
	}

	/// Registers the single inbound frame handler; re-registration
	/// replaces the previous one.
	pub fn on_message(&self, handler: impl Fn(ServerFrame) + Send + Sync + 'static) {
		*self.handler.lock() = Some(Arc::new(handler));
	}

	/// Registers the handler invoked once per unexpected connection loss.
	pub fn on_disconnect(&self, handler: impl Fn() + Send + Sync + 'static) {
		*self.disconnect_handler.lock() = Some(Arc::new(handler));
	}

	/// Opens the connection and subscribes to `topic`.
	///
	/// Idempotent: while already `Connected`, or while a concurrent
	/// attempt is in flight, this resolves to the established state
	/// without opening a second connection. Switching topics requires an
	/// explicit [`disconnect`](Self::disconnect) first.
	pub async fn connect(self: &Arc<Self>, topic: &str) -> Result<ConnectionState> {
		if self.is_connected() {
			return Ok(ConnectionState::Connected);
		}

		let _gate = self.connect_gate.lock().await;
		if self.is_connected() {
			// A racing call finished the handshake while we waited.
			return Ok(ConnectionState::Connected);
		}

		// Bumped before dialing: a pump from a superseded connection
		// must not report loss mid-attempt.
		let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
		*self.state.lock() = ConnectionState::Connecting;
		debug!(target: "chat.transport", url = %self.url, %topic, "connecting");

		let parts = match self.connector.connect(&self.url).await {
			Ok(parts) => parts,
			Err(err) => {
				*self.state.lock() = ConnectionState::Disconnected;
				return Err(err);
			}
		};
		let mut sender = parts.sender;
		let receiver = parts.receiver;
		let mut frame_rx = parts.frame_rx;

		if let Err(err) = sender
			.send(ClientFrame::Subscribe {
				topic: topic.to_string(),
			})
			.await
		{
			*self.state.lock() = ConnectionState::Disconnected;
			return Err(err);
		}

		self.closing.store(false, Ordering::SeqCst);
		*self.topic.lock() = Some(topic.to_string());
		*self.sender.lock().await = Some(sender);
		*self.state.lock() = ConnectionState::Connected;

		tokio::spawn(async move {
			if let Err(err) = receiver.run().await {
				debug!(target: "chat.transport", error = %err, "receiver loop ended");
			}
		});

		let this = Arc::clone(self);
		tokio::spawn(async move {
			while let Some(frame) = frame_rx.recv().await {
				let handler = this.handler.lock().clone();
				if let Some(handler) = handler {
					handler(frame);
				}
			}
			this.handle_loss(generation);
		});

		info!(target: "chat.transport", %topic, "subscribed");
		Ok(ConnectionState::Connected)
	}

	/// Publishes `body` to `destination`.
	///
	/// Valid only while `Connected`; never queues or silently drops.
	pub async fn publish(&self, destination: &str, body: OutboundMessage) -> Result<()> {
		if !self.is_connected() {
			return Err(TransportError::NotConnected);
		}
		let mut slot = self.sender.lock().await;
		let sender = slot.as_mut().ok_or(TransportError::NotConnected)?;
		sender
			.send(ClientFrame::Publish {
				destination: destination.to_string(),
				body,
			})
			.await
	}

	/// Tears down the subscription and connection.
	///
	/// Idempotent, and always leaves the supervisor `Disconnected`;
	/// teardown errors are logged and swallowed.
	pub async fn disconnect(&self) {
		self.closing.store(true, Ordering::SeqCst);
		let topic = self.topic.lock().take();
		let mut slot = self.sender.lock().await;
		if let Some(mut sender) = slot.take() {
			if let Some(topic) = topic {
				// Best effort; the connection may already be gone.
				if let Err(err) = sender.send(ClientFrame::Unsubscribe { topic }).await {
					debug!(target: "chat.transport", error = %err, "unsubscribe failed during teardown");
				}
			}
		}
		drop(slot);
		*self.state.lock() = ConnectionState::Disconnected;
		debug!(target: "chat.transport", "disconnected");
	}

	/// Called by the pump task when the inbound channel closes.
	fn handle_loss(&self, generation: u64) {
		if self.closing.load(Ordering::SeqCst) {
			return;
		}
		if self.generation.load(Ordering::SeqCst) != generation {
			// A newer connection replaced this one.
			return;
		}
		*self.state.lock() = ConnectionState::Disconnected;
		warn!(target: "chat.transport", "connection lost");
		let handler = self.disconnect_handler.lock().clone();
		if let Some(handler) = handler {
			handler();
		}
	}
}
