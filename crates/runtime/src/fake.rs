//! Fake transport for unit testing the supervisor and the session engine.
//!
//! Provides an in-memory [`Connector`] so engine behavior can be exercised
//! without a server.
//!
//! # Example
//!
//! ```ignore
//! let (connector, controller) = FakeConnector::new();
//! let supervisor = Arc::new(TransportSupervisor::new(connector, "ws://unused"));
//! supervisor.connect("/topic/room/r1").await?;
//!
//! controller.inject_room_message("r1", "alice", "hi");
//! let sent = controller.take_sent();
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use roomchat_protocol::{ChatMessage, ClientFrame, ServerFrame, room_topic};
use tokio::sync::mpsc;

use crate::error::{Result, TransportError};
use crate::transport::{Connector, Transport, TransportParts, TransportReceiver};

struct FakeShared {
	sent: Mutex<Vec<ClientFrame>>,
	inbound_tx: Mutex<Option<mpsc::UnboundedSender<ServerFrame>>>,
	connects: AtomicUsize,
	fail_next: AtomicBool,
}

/// In-memory [`Connector`] producing transports wired to a controller.
pub struct FakeConnector {
	shared: Arc<FakeShared>,
}

impl FakeConnector {
	/// Creates the connector and its paired controller.
	pub fn new() -> (Arc<Self>, FakeTransportController) {
		let shared = Arc::new(FakeShared {
			sent: Mutex::new(Vec::new()),
			inbound_tx: Mutex::new(None),
			connects: AtomicUsize::new(0),
			fail_next: AtomicBool::new(false),
		});
		let connector = Arc::new(Self {
			shared: Arc::clone(&shared),
		});
		(connector, FakeTransportController { shared })
	}
}

impl Connector for FakeConnector {
	fn connect(&self, _url: &str) -> Pin<Box<dyn Future<Output = Result<TransportParts>> + Send + '_>> {
		let shared = Arc::clone(&self.shared);
		Box::pin(async move {
			if shared.fail_next.swap(false, Ordering::SeqCst) {
				return Err(TransportError::Connect("simulated connect failure".to_string()));
			}
			shared.connects.fetch_add(1, Ordering::SeqCst);

			let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
			let (frame_tx, frame_rx) = mpsc::unbounded_channel();
			*shared.inbound_tx.lock() = Some(inbound_tx);

			Ok(TransportParts {
				sender: Box::new(FakeSender {
					shared: Arc::clone(&shared),
				}),
				receiver: Box::new(FakeReceiver { inbound_rx, frame_tx }),
				frame_rx,
			})
		})
	}
}

/// Controller for injecting inbound frames and inspecting sent ones.
pub struct FakeTransportController {
	shared: Arc<FakeShared>,
}

impl FakeTransportController {
	/// Injects a raw frame as if the server had pushed it.
	pub fn inject_frame(&self, frame: ServerFrame) {
		if let Some(tx) = self.shared.inbound_tx.lock().as_ref() {
			let _ = tx.send(frame);
		}
	}

	/// Injects a chat message on the room topic for `room_id`.
	pub fn inject_room_message(&self, room_id: &str, sender: &str, content: &str) {
		self.inject_frame(ServerFrame::Message {
			topic: room_topic(room_id),
			body: ChatMessage {
				sender: sender.to_string(),
				content: content.to_string(),
				time_stamp: None,
				room_id: room_id.to_string(),
			},
		});
	}

	/// Takes all frames sent by the client, clearing the buffer.
	pub fn take_sent(&self) -> Vec<ClientFrame> {
		std::mem::take(&mut *self.shared.sent.lock())
	}

	/// Simulates unexpected connection loss.
	pub fn drop_connection(&self) {
		self.shared.inbound_tx.lock().take();
	}

	/// Makes the next `connect` attempt fail.
	pub fn fail_next_connect(&self) {
		self.shared.fail_next.store(true, Ordering::SeqCst);
	}

	/// Number of successfully opened connections so far.
	pub fn connect_count(&self) -> usize {
		self.shared.connects.load(Ordering::SeqCst)
	}
}

struct FakeSender {
	shared: Arc<FakeShared>,
}

impl Transport for FakeSender {
	fn send(&mut self, frame: ClientFrame) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		let shared = Arc::clone(&self.shared);
		Box::pin(async move {
			shared.sent.lock().push(frame);
			Ok(())
		})
	}
}

struct FakeReceiver {
	inbound_rx: mpsc::UnboundedReceiver<ServerFrame>,
	frame_tx: mpsc::UnboundedSender<ServerFrame>,
}

impl TransportReceiver for FakeReceiver {
	fn run(mut self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
		Box::pin(async move {
			while let Some(frame) = self.inbound_rx.recv().await {
				if self.frame_tx.send(frame).is_err() {
					break;
				}
			}
			Ok(())
		})
	}
}
