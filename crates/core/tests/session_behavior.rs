//! Behavior tests for the session facade against fake collaborators.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use roomchat::protocol::{ChatMessage, ClientFrame, RoomDescriptor};
use roomchat::runtime::fake::{FakeConnector, FakeTransportController};
use roomchat::{
	ChatConfig, ChatError, ChatSession, MemorySessionStore, ReconnectPolicy, RoomDirectory, SessionEvent, SessionSnapshot, SessionState,
};
use tokio::sync::mpsc;

struct FakeDirectory {
	rooms: Mutex<Vec<String>>,
	history: Mutex<Vec<ChatMessage>>,
	history_delay: Mutex<Option<Duration>>,
	history_fails: AtomicBool,
	calls: AtomicUsize,
}

impl FakeDirectory {
	fn new() -> Arc<Self> {
		Arc::new(Self {
			rooms: Mutex::new(Vec::new()),
			history: Mutex::new(Vec::new()),
			history_delay: Mutex::new(None),
			history_fails: AtomicBool::new(false),
			calls: AtomicUsize::new(0),
		})
	}

	fn add_room(&self, room_id: &str) {
		self.rooms.lock().push(room_id.to_string());
	}

	fn set_history(&self, messages: Vec<ChatMessage>) {
		*self.history.lock() = messages;
	}

	fn fail_history(&self) {
		self.history_fails.store(true, Ordering::SeqCst);
	}

	fn delay_history(&self, delay: Duration) {
		*self.history_delay.lock() = Some(delay);
	}

	fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl RoomDirectory for FakeDirectory {
	async fn create_room(&self, room_id: &str) -> roomchat::Result<RoomDescriptor> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		let mut rooms = self.rooms.lock();
		if rooms.iter().any(|r| r == room_id) {
			return Err(ChatError::AlreadyExists(room_id.to_string()));
		}
		rooms.push(room_id.to_string());
		Ok(RoomDescriptor {
			room_id: room_id.to_string(),
		})
	}

	async fn join_room(&self, room_id: &str) -> roomchat::Result<RoomDescriptor> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		if self.rooms.lock().iter().any(|r| r == room_id) {
			Ok(RoomDescriptor {
				room_id: room_id.to_string(),
			})
		} else {
			Err(ChatError::NotFound(room_id.to_string()))
		}
	}

	async fn history(&self, _room_id: &str) -> roomchat::Result<Vec<ChatMessage>> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		let delay = *self.history_delay.lock();
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}
		if self.history_fails.load(Ordering::SeqCst) {
			return Err(ChatError::Transient("history endpoint unavailable".to_string()));
		}
		Ok(self.history.lock().clone())
	}
}

fn engine(
	directory: Arc<FakeDirectory>,
	store: Arc<MemorySessionStore>,
	policy: ReconnectPolicy,
) -> (Arc<ChatSession>, FakeTransportController) {
	let (connector, controller) = FakeConnector::new();
	let config = ChatConfig::new("http://unused", "ws://unused").with_reconnect(policy);
	(ChatSession::with_parts(directory, store, connector, &config), controller)
}

fn message(sender: &str, content: &str, room_id: &str) -> ChatMessage {
	ChatMessage {
		sender: sender.to_string(),
		content: content.to_string(),
		time_stamp: None,
		room_id: room_id.to_string(),
	}
}

fn drain(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
	let mut events = Vec::new();
	while let Ok(event) = rx.try_recv() {
		events.push(event);
	}
	events
}

#[tokio::test]
async fn blank_inputs_fail_validation_without_network() {
	let directory = FakeDirectory::new();
	let (session, _controller) = engine(Arc::clone(&directory), Arc::new(MemorySessionStore::new()), ReconnectPolicy::Manual);

	for (room, user) in [("", "alice"), ("r1", ""), ("   ", "alice"), ("r1", "   "), ("", "")] {
		assert!(matches!(session.join(room, user).await, Err(ChatError::Validation(_))));
		assert!(matches!(session.create(room, user).await, Err(ChatError::Validation(_))));
	}

	assert_eq!(directory.calls(), 0);
	assert_eq!(session.state(), SessionState::Unjoined);
}

#[tokio::test]
async fn join_missing_room_surfaces_not_found() {
	let directory = FakeDirectory::new();
	let (session, _controller) = engine(directory, Arc::new(MemorySessionStore::new()), ReconnectPolicy::Manual);

	let result = session.join("nowhere", "alice").await;
	assert!(matches!(result, Err(ChatError::NotFound(_))));
	assert_eq!(session.state(), SessionState::Unjoined);
	assert!(session.session().is_none());
}

#[tokio::test]
async fn create_existing_room_surfaces_already_exists() {
	let directory = FakeDirectory::new();
	directory.add_room("r1");
	let (session, _controller) = engine(directory, Arc::new(MemorySessionStore::new()), ReconnectPolicy::Manual);

	let result = session.create("r1", "alice").await;
	assert!(matches!(result, Err(ChatError::AlreadyExists(_))));
	assert_eq!(session.state(), SessionState::Unjoined);
}

#[tokio::test]
async fn create_joins_room_and_persists_snapshot() {
	let directory = FakeDirectory::new();
	let store = Arc::new(MemorySessionStore::new());
	let (session, controller) = engine(directory, Arc::clone(&store), ReconnectPolicy::Manual);
	let mut events = session.subscribe_events();

	session.create("r1", "alice").await.unwrap();

	assert_eq!(session.state(), SessionState::Active);
	let identity = session.session().unwrap();
	assert_eq!(identity.room_id, "r1");
	assert_eq!(identity.user_name, "alice");
	assert!(identity.connected);
	assert!(session.is_ready());

	let snapshot = store.snapshot().unwrap();
	assert_eq!(snapshot.room_id.as_deref(), Some("r1"));
	assert_eq!(snapshot.current_user.as_deref(), Some("alice"));
	assert_eq!(snapshot.connected.as_deref(), Some("true"));

	let sent = controller.take_sent();
	assert!(sent.iter().any(|f| matches!(f, ClientFrame::Subscribe { topic } if topic == "/topic/room/r1")));

	let events = drain(&mut events);
	assert!(events.iter().any(|e| matches!(e, SessionEvent::StateChanged(SessionState::Joining))));
	assert!(events.iter().any(|e| matches!(e, SessionEvent::StateChanged(SessionState::Active))));
	assert!(events.iter().any(|e| matches!(e, SessionEvent::Connected)));
}

#[tokio::test]
async fn restore_with_connected_true_goes_active() {
	let directory = FakeDirectory::new();
	directory.add_room("r1");
	let store = Arc::new(MemorySessionStore::with_snapshot(SessionSnapshot {
		room_id: Some("r1".to_string()),
		current_user: Some("alice".to_string()),
		connected: Some("true".to_string()),
	}));
	let (session, controller) = engine(directory, store, ReconnectPolicy::Manual);

	let state = session.try_restore_on_startup().await.unwrap();

	assert_eq!(state, SessionState::Active);
	assert_eq!(session.state(), SessionState::Active);
	let identity = session.session().unwrap();
	assert_eq!(identity.room_id, "r1");
	assert_eq!(identity.user_name, "alice");
	assert!(identity.connected);
	assert_eq!(controller.connect_count(), 1);
}

#[tokio::test]
async fn restore_with_connected_false_stays_unjoined() {
	let directory = FakeDirectory::new();
	let store = Arc::new(MemorySessionStore::with_snapshot(SessionSnapshot {
		room_id: Some("r1".to_string()),
		current_user: Some("alice".to_string()),
		connected: Some("false".to_string()),
	}));
	let (session, controller) = engine(directory, store, ReconnectPolicy::Manual);

	let state = session.try_restore_on_startup().await.unwrap();

	assert_eq!(state, SessionState::Unjoined);
	assert!(session.session().is_none());
	assert_eq!(controller.connect_count(), 0);
}

#[tokio::test]
async fn restore_with_partial_snapshot_stays_unjoined() {
	let directory = FakeDirectory::new();
	let store = Arc::new(MemorySessionStore::with_snapshot(SessionSnapshot {
		room_id: Some("r1".to_string()),
		current_user: None,
		connected: Some("true".to_string()),
	}));
	let (session, _controller) = engine(directory, store, ReconnectPolicy::Manual);

	let state = session.try_restore_on_startup().await.unwrap();
	assert_eq!(state, SessionState::Unjoined);
}

#[tokio::test]
async fn history_seeds_timeline_then_live_appends() {
	let directory = FakeDirectory::new();
	directory.add_room("r1");
	directory.set_history(vec![message("alice", "m1", "r1"), message("bob", "m2", "r1")]);
	let (session, controller) = engine(directory, Arc::new(MemorySessionStore::new()), ReconnectPolicy::Manual);

	session.join("r1", "carol").await.unwrap();
	let contents: Vec<_> = session.timeline_snapshot().into_iter().map(|m| m.content).collect();
	assert_eq!(contents, vec!["m1", "m2"]);

	controller.inject_room_message("r1", "alice", "m3");
	tokio::time::sleep(Duration::from_millis(20)).await;

	let contents: Vec<_> = session.timeline_snapshot().into_iter().map(|m| m.content).collect();
	assert_eq!(contents, vec!["m1", "m2", "m3"]);
}

#[tokio::test]
async fn switching_rooms_resubscribes_transport() {
	let directory = FakeDirectory::new();
	directory.add_room("r1");
	directory.add_room("r2");
	let (session, controller) = engine(directory, Arc::new(MemorySessionStore::new()), ReconnectPolicy::Manual);

	session.join("r1", "alice").await.unwrap();
	controller.take_sent();

	session.join("r2", "alice").await.unwrap();

	assert_eq!(controller.connect_count(), 2);
	let sent = controller.take_sent();
	assert!(sent.iter().any(|f| matches!(f, ClientFrame::Unsubscribe { topic } if topic == "/topic/room/r1")));
	assert!(sent.iter().any(|f| matches!(f, ClientFrame::Subscribe { topic } if topic == "/topic/room/r2")));

	controller.inject_room_message("r2", "bob", "hello");
	controller.inject_room_message("r1", "mallory", "stale");
	tokio::time::sleep(Duration::from_millis(20)).await;

	let contents: Vec<_> = session.timeline_snapshot().into_iter().map(|m| m.content).collect();
	assert_eq!(contents, vec!["hello"]);
}

#[tokio::test]
async fn live_frames_during_history_fetch_are_kept() {
	let directory = FakeDirectory::new();
	directory.add_room("r1");
	directory.set_history(vec![message("alice", "h1", "r1")]);
	directory.delay_history(Duration::from_millis(50));
	let (session, controller) = engine(directory, Arc::new(MemorySessionStore::new()), ReconnectPolicy::Manual);

	let joining = {
		let session = Arc::clone(&session);
		tokio::spawn(async move { session.join("r1", "bob").await })
	};
	// Land a live message on the topic while the history fetch is
	// still in flight.
	tokio::time::sleep(Duration::from_millis(20)).await;
	controller.inject_room_message("r1", "carol", "live");
	joining.await.unwrap().unwrap();

	let contents: Vec<_> = session.timeline_snapshot().into_iter().map(|m| m.content).collect();
	assert_eq!(contents, vec!["h1", "live"]);
}

#[tokio::test]
async fn history_failure_keeps_session_active_with_notice() {
	let directory = FakeDirectory::new();
	directory.add_room("r1");
	directory.fail_history();
	let (session, _controller) = engine(directory, Arc::new(MemorySessionStore::new()), ReconnectPolicy::Manual);
	let mut events = session.subscribe_events();

	session.join("r1", "alice").await.unwrap();

	assert_eq!(session.state(), SessionState::Active);
	assert!(session.timeline_snapshot().is_empty());
	let events = drain(&mut events);
	assert!(events.iter().any(|e| matches!(e, SessionEvent::Notice { code, .. } if code == "TRANSIENT")));
}

#[tokio::test]
async fn connect_failure_keeps_session_active() {
	let directory = FakeDirectory::new();
	directory.add_room("r1");
	let (session, controller) = engine(directory, Arc::new(MemorySessionStore::new()), ReconnectPolicy::Manual);
	controller.fail_next_connect();
	let mut events = session.subscribe_events();

	session.join("r1", "alice").await.unwrap();

	assert_eq!(session.state(), SessionState::Active);
	let events = drain(&mut events);
	assert!(events.iter().any(|e| matches!(e, SessionEvent::Notice { code, .. } if code == "CONNECTION_FAILED")));

	let result = session.send_message("hi").await;
	assert!(matches!(result, Err(ChatError::NotConnected)));
}

#[tokio::test]
async fn blank_send_is_a_noop() {
	let directory = FakeDirectory::new();
	directory.add_room("r1");
	let (session, controller) = engine(directory, Arc::new(MemorySessionStore::new()), ReconnectPolicy::Manual);
	session.join("r1", "alice").await.unwrap();
	controller.take_sent();

	session.send_message("").await.unwrap();
	session.send_message("   ").await.unwrap();

	assert!(controller.take_sent().is_empty());
}

#[tokio::test]
async fn send_without_session_is_not_connected() {
	let directory = FakeDirectory::new();
	let (session, _controller) = engine(directory, Arc::new(MemorySessionStore::new()), ReconnectPolicy::Manual);

	let result = session.send_message("hi").await;
	assert!(matches!(result, Err(ChatError::NotConnected)));
}

#[tokio::test]
async fn send_publishes_to_room_destination() {
	let directory = FakeDirectory::new();
	directory.add_room("r1");
	let (session, controller) = engine(directory, Arc::new(MemorySessionStore::new()), ReconnectPolicy::Manual);
	session.join("r1", "alice").await.unwrap();
	controller.take_sent();

	session.send_message("hello room").await.unwrap();

	let sent = controller.take_sent();
	assert_eq!(sent.len(), 1);
	match &sent[0] {
		ClientFrame::Publish { destination, body } => {
			assert_eq!(destination, "/app/sendMessage/r1");
			assert_eq!(body.sender, "alice");
			assert_eq!(body.content, "hello room");
			assert_eq!(body.room_id, "r1");
		}
		other => panic!("expected publish frame, got {other:?}"),
	}
}

#[tokio::test]
async fn leave_clears_session_and_snapshot_even_with_dead_transport() {
	let directory = FakeDirectory::new();
	directory.add_room("r1");
	let store = Arc::new(MemorySessionStore::new());
	let (session, controller) = engine(directory, Arc::clone(&store), ReconnectPolicy::Manual);
	session.join("r1", "alice").await.unwrap();

	// Kill the transport out from under the facade before leaving.
	controller.drop_connection();
	tokio::time::sleep(Duration::from_millis(20)).await;

	session.leave().await;

	assert_eq!(session.state(), SessionState::Unjoined);
	assert!(session.session().is_none());
	assert!(session.timeline_snapshot().is_empty());
	assert!(store.snapshot().is_none());
}

#[tokio::test]
async fn duplicate_deliveries_are_retained() {
	let directory = FakeDirectory::new();
	directory.add_room("r1");
	let (session, controller) = engine(directory, Arc::new(MemorySessionStore::new()), ReconnectPolicy::Manual);
	session.join("r1", "alice").await.unwrap();

	controller.inject_room_message("r1", "bob", "dup");
	controller.inject_room_message("r1", "bob", "dup");
	tokio::time::sleep(Duration::from_millis(20)).await;

	assert_eq!(session.timeline_snapshot().len(), 2);
}

#[tokio::test]
async fn messages_for_other_rooms_are_dropped() {
	let directory = FakeDirectory::new();
	directory.add_room("r1");
	let (session, controller) = engine(directory, Arc::new(MemorySessionStore::new()), ReconnectPolicy::Manual);
	session.join("r1", "alice").await.unwrap();

	controller.inject_room_message("r2", "mallory", "wrong room");
	tokio::time::sleep(Duration::from_millis(20)).await;

	assert!(session.timeline_snapshot().is_empty());
}

#[tokio::test]
async fn manual_policy_only_reports_loss() {
	let directory = FakeDirectory::new();
	directory.add_room("r1");
	let (session, controller) = engine(directory, Arc::new(MemorySessionStore::new()), ReconnectPolicy::Manual);
	let mut events = session.subscribe_events();
	session.join("r1", "alice").await.unwrap();

	controller.drop_connection();
	tokio::time::sleep(Duration::from_millis(50)).await;

	assert_eq!(controller.connect_count(), 1);
	assert_eq!(session.state(), SessionState::Active);
	let events = drain(&mut events);
	assert!(events.iter().any(|e| matches!(e, SessionEvent::ConnectionLost)));
}

#[tokio::test]
async fn auto_policy_reestablishes_subscription() {
	let directory = FakeDirectory::new();
	directory.add_room("r1");
	let (session, controller) = engine(directory, Arc::new(MemorySessionStore::new()), ReconnectPolicy::Auto);
	let mut events = session.subscribe_events();
	session.join("r1", "alice").await.unwrap();
	controller.take_sent();

	controller.drop_connection();
	tokio::time::sleep(Duration::from_millis(50)).await;

	assert_eq!(controller.connect_count(), 2);
	let sent = controller.take_sent();
	assert!(sent.iter().any(|f| matches!(f, ClientFrame::Subscribe { topic } if topic == "/topic/room/r1")));
	let events = drain(&mut events);
	assert!(events.iter().any(|e| matches!(e, SessionEvent::ConnectionLost)));
	assert!(events.iter().any(|e| matches!(e, SessionEvent::Connected)));
}
