//! Session facade: the single entry point for the presentation layer.
//!
//! Composes the room directory, session store, transport supervisor, and
//! timeline, and enforces the session state machine. Presentation-side
//! effects (navigation, toasts) subscribe to [`SessionEvent`]s instead of
//! being called directly from here.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use roomchat_protocol::{ChatMessage, OutboundMessage, ServerFrame, room_destination, room_topic};
use roomchat_runtime::{ConnectionState, Connector, TransportSupervisor, WebSocketConnector};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::{ChatConfig, ReconnectPolicy};
use crate::directory::{HttpRoomDirectory, RoomDirectory};
use crate::error::{ChatError, Result};
use crate::store::{FsSessionStore, Session, SessionStore};
use crate::timeline::Timeline;

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
	Unjoined,
	Joining,
	Active,
	LeavingCleanup,
}

/// Events observable by the presentation layer.
#[derive(Debug, Clone)]
pub enum SessionEvent {
	StateChanged(SessionState),
	/// The transport reached the room topic.
	Connected,
	/// The transport dropped unexpectedly while the session was active.
	ConnectionLost,
	/// A recovered, non-fatal error worth showing to the user.
	Notice { code: String, message: String },
}

enum EnterMode {
	Join,
	Create,
}

/// Orchestrator over {Unjoined, Joining, Active, LeavingCleanup}.
///
/// Single writer for the timeline and the session store; the transport's
/// pump delivers inbound messages through the one handler registered at
/// construction, so appends stay in receipt order.
pub struct ChatSession {
	directory: Arc<dyn RoomDirectory>,
	store: Arc<dyn SessionStore>,
	supervisor: Arc<TransportSupervisor>,
	timeline: Mutex<Timeline>,
	state: Mutex<SessionState>,
	session: Mutex<Option<Session>>,
	subscribers: Mutex<Vec<mpsc::UnboundedSender<SessionEvent>>>,
	reconnect: ReconnectPolicy,
	ready: AtomicBool,
}

impl ChatSession {
	/// Builds an engine with the production HTTP directory, file-backed
	/// store, and WebSocket transport.
	pub fn new(config: &ChatConfig) -> Result<Arc<Self>> {
		let directory = Arc::new(HttpRoomDirectory::new(&config.api_base_url)?);
		Ok(Self::with_parts(directory, Arc::new(FsSessionStore::default()), Arc::new(WebSocketConnector), config))
	}

	/// Builds an engine from injected collaborators; used by tests and
	/// embedders that bring their own storage or transport.
	pub fn with_parts(
		directory: Arc<dyn RoomDirectory>,
		store: Arc<dyn SessionStore>,
		connector: Arc<dyn Connector>,
		config: &ChatConfig,
	) -> Arc<Self> {
		let supervisor = Arc::new(TransportSupervisor::new(connector, config.ws_url.clone()));
		let this = Arc::new(Self {
			directory,
			store,
			supervisor,
			timeline: Mutex::new(Timeline::default()),
			state: Mutex::new(SessionState::Unjoined),
			session: Mutex::new(None),
			subscribers: Mutex::new(Vec::new()),
			reconnect: config.reconnect,
			ready: AtomicBool::new(false),
		});
		this.wire_transport();
		this
	}

	fn wire_transport(self: &Arc<Self>) {
		let weak = Arc::downgrade(self);
		self.supervisor.on_message(move |frame| {
			if let Some(this) = weak.upgrade() {
				this.handle_frame(frame);
			}
		});
		let weak = Arc::downgrade(self);
		self.supervisor.on_disconnect(move || {
			if let Some(this) = weak.upgrade() {
				this.handle_disconnect();
			}
		});
	}

	/// Current lifecycle state.
	pub fn state(&self) -> SessionState {
		*self.state.lock()
	}

	/// Copy of the active session identity, if any.
	pub fn session(&self) -> Option<Session> {
		self.session.lock().clone()
	}

	/// Ordered copy of the active room's messages.
	pub fn timeline_snapshot(&self) -> Vec<ChatMessage> {
		self.timeline.lock().snapshot()
	}

	/// Live transport state, for presentation affordances.
	pub fn connection_state(&self) -> ConnectionState {
		self.supervisor.state()
	}

	/// Whether startup establishment (connect + history) has settled.
	pub fn is_ready(&self) -> bool {
		self.ready.load(Ordering::SeqCst)
	}

	/// Subscribes an observer to state transitions and notices.
	pub fn subscribe_events(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
		let (tx, rx) = mpsc::unbounded_channel();
		self.subscribers.lock().push(tx);
		rx
	}

	/// Restores a persisted session on startup.
	///
	/// Without a complete, connected snapshot the engine stays
	/// `Unjoined` and the caller should route to the join screen. With
	/// one, the identity is adopted, the state goes `Active`, and
	/// connect + history run concurrently; either failing surfaces a
	/// notice but does not revert the session.
	pub async fn try_restore_on_startup(self: &Arc<Self>) -> Result<SessionState> {
		let restored = match self.store.restore() {
			Ok(restored) => restored,
			Err(err) => {
				warn!(target: "chat.session", error = %err, "snapshot restore failed");
				None
			}
		};
		let Some(session) = restored else {
			return Ok(SessionState::Unjoined);
		};

		let room_id = session.room_id.clone();
		info!(target: "chat.session", room = %room_id, user = %session.user_name, "restoring session");
		*self.session.lock() = Some(session);
		*self.timeline.lock() = Timeline::new(&room_id);
		self.set_state(SessionState::Active);
		self.establish(&room_id).await;
		Ok(SessionState::Active)
	}

	/// Joins an existing room under `user_name`.
	pub async fn join(self: &Arc<Self>, room_id: &str, user_name: &str) -> Result<()> {
		self.enter(room_id, user_name, EnterMode::Join).await
	}

	/// Creates a room and joins it under `user_name`.
	pub async fn create(self: &Arc<Self>, room_id: &str, user_name: &str) -> Result<()> {
		self.enter(room_id, user_name, EnterMode::Create).await
	}

	async fn enter(self: &Arc<Self>, room_id: &str, user_name: &str, mode: EnterMode) -> Result<()> {
		let room_id = room_id.trim();
		let user_name = user_name.trim();
		if room_id.is_empty() || user_name.is_empty() {
			return Err(ChatError::Validation("room id and user name are required".to_string()));
		}

		self.set_state(SessionState::Joining);
		let result = match mode {
			EnterMode::Join => self.directory.join_room(room_id).await,
			EnterMode::Create => self.directory.create_room(room_id).await,
		};
		let descriptor = match result {
			Ok(descriptor) => descriptor,
			Err(err) => {
				self.set_state(SessionState::Unjoined);
				return Err(err);
			}
		};

		let session = Session::joined(descriptor.room_id.clone(), user_name);
		if let Err(err) = self.store.save(&session) {
			// Persistence is best effort; the live session still works.
			warn!(target: "chat.session", error = %err, "failed to persist session snapshot");
		}
		info!(target: "chat.session", room = %descriptor.room_id, user = %user_name, "joined room");
		*self.session.lock() = Some(session);
		*self.timeline.lock() = Timeline::new(&descriptor.room_id);
		self.set_state(SessionState::Active);
		self.establish(&descriptor.room_id).await;
		Ok(())
	}

	/// Runs connect and history fetch concurrently; both settle before
	/// the engine reports ready. Failures surface as notices only.
	async fn establish(self: &Arc<Self>, room_id: &str) {
		// Switching rooms reuses the supervisor; any previous
		// subscription must be torn down or `connect` would no-op and
		// leave the transport on the old topic.
		if self.supervisor.state() != ConnectionState::Disconnected {
			self.supervisor.disconnect().await;
		}
		let topic = room_topic(room_id);
		let (connect_result, history_result) = tokio::join!(self.supervisor.connect(&topic), self.directory.history(room_id));

		match history_result {
			Ok(messages) => {
				debug!(target: "chat.session", count = messages.len(), "seeded history");
				self.timeline.lock().seed(messages);
			}
			Err(err) => {
				warn!(target: "chat.session", error = %err, "history fetch failed");
				self.notify_error(&err);
			}
		}

		match connect_result {
			Ok(_) => self.emit(SessionEvent::Connected),
			Err(err) => {
				let err = ChatError::from(err);
				warn!(target: "chat.session", error = %err, "connect failed");
				self.notify_error(&err);
			}
		}

		self.ready.store(true, Ordering::SeqCst);
	}

	/// Publishes `text` to the active room.
	///
	/// Blank input (after trimming) is a silent no-op. While
	/// disconnected this surfaces [`ChatError::NotConnected`] instead of
	/// queuing.
	pub async fn send_message(&self, text: &str) -> Result<()> {
		if text.trim().is_empty() {
			return Ok(());
		}
		let (sender, room_id) = {
			let session = self.session.lock();
			match session.as_ref() {
				Some(session) => (session.user_name.clone(), session.room_id.clone()),
				None => return Err(ChatError::NotConnected),
			}
		};

		let body = OutboundMessage::new(sender, text, room_id.clone());
		self.supervisor.publish(&room_destination(&room_id), body).await?;
		Ok(())
	}

	/// Leaves the room: tears down the transport, clears the session
	/// and its durable snapshot. Never fails.
	pub async fn leave(&self) {
		self.set_state(SessionState::LeavingCleanup);
		self.supervisor.disconnect().await;
		*self.session.lock() = None;
		*self.timeline.lock() = Timeline::default();
		if let Err(err) = self.store.clear() {
			warn!(target: "chat.session", error = %err, "failed to clear session snapshot");
		}
		self.ready.store(false, Ordering::SeqCst);
		self.set_state(SessionState::Unjoined);
	}

	fn handle_frame(&self, frame: ServerFrame) {
		match frame {
			ServerFrame::Message { body, .. } => {
				let active_room = self.session.lock().as_ref().map(|s| s.room_id.clone());
				match active_room {
					Some(room_id) if room_id == body.room_id => {
						self.timeline.lock().append(body);
					}
					_ => {
						debug!(target: "chat.session", room = %body.room_id, "dropping message for inactive room");
					}
				}
			}
			ServerFrame::Error { code, message } => {
				warn!(target: "chat.session", %code, %message, "server error frame");
				self.emit(SessionEvent::Notice { code, message });
			}
		}
	}

	fn handle_disconnect(self: Arc<Self>) {
		if self.state() != SessionState::Active {
			return;
		}
		self.emit(SessionEvent::ConnectionLost);
		if self.reconnect == ReconnectPolicy::Auto {
			let this = Arc::clone(&self);
			tokio::spawn(async move {
				let Some(room_id) = this.session.lock().as_ref().map(|s| s.room_id.clone()) else {
					return;
				};
				info!(target: "chat.session", room = %room_id, "reconnecting after loss");
				match this.supervisor.connect(&room_topic(&room_id)).await {
					Ok(_) => this.emit(SessionEvent::Connected),
					Err(err) => this.notify_error(&ChatError::from(err)),
				}
			});
		}
	}

	fn set_state(&self, next: SessionState) {
		{
			let mut state = self.state.lock();
			if *state == next {
				return;
			}
			*state = next;
		}
		debug!(target: "chat.session", state = ?next, "state changed");
		self.emit(SessionEvent::StateChanged(next));
	}

	fn emit(&self, event: SessionEvent) {
		self.subscribers.lock().retain(|tx| tx.send(event.clone()).is_ok());
	}

	fn notify_error(&self, err: &ChatError) {
		self.emit(SessionEvent::Notice {
			code: err.code().to_string(),
			message: err.to_string(),
		});
	}
}
