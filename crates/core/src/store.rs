//! Durable session snapshot storage.
//!
//! The store holds the canonical session identity across page-reload
//! equivalents (process restarts). The snapshot is a serialized copy of
//! the session, never a live reference, keyed by the original client's
//! three storage keys: `roomId`, `currentUser`, and `connected`
//! (boolean-as-string). Restoration succeeds only when all three are
//! present and `connected` is `"true"`; any incomplete subset restores
//! to nothing.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The local client's record of which room and display name it is
/// active under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
	pub room_id: String,
	pub user_name: String,
	pub connected: bool,
}

impl Session {
	/// Builds a connected session for `room_id` under `user_name`.
	pub fn joined(room_id: impl Into<String>, user_name: impl Into<String>) -> Self {
		Self {
			room_id: room_id.into(),
			user_name: user_name.into(),
			connected: true,
		}
	}
}

/// On-disk snapshot format; fields mirror the original storage keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
	#[serde(default)]
	pub room_id: Option<String>,
	#[serde(default)]
	pub current_user: Option<String>,
	#[serde(default)]
	pub connected: Option<String>,
}

impl SessionSnapshot {
	/// Serializes `session` into the stored key set.
	pub fn of(session: &Session) -> Self {
		Self {
			room_id: Some(session.room_id.clone()),
			current_user: Some(session.user_name.clone()),
			connected: Some(session.connected.to_string()),
		}
	}

	/// Restores a session, or `None` unless every key is present,
	/// non-empty, and `connected` is `"true"`.
	pub fn into_session(self) -> Option<Session> {
		let room_id = self.room_id.filter(|v| !v.is_empty())?;
		let user_name = self.current_user.filter(|v| !v.is_empty())?;
		if self.connected.as_deref() != Some("true") {
			return None;
		}
		Some(Session {
			room_id,
			user_name,
			connected: true,
		})
	}
}

/// Seam for durable session persistence; injectable for tests.
pub trait SessionStore: Send + Sync {
	/// Writes a snapshot, overwriting any prior one.
	fn save(&self, session: &Session) -> Result<()>;
	/// Reads the snapshot; `None` when absent, incomplete, or not
	/// marked connected.
	fn restore(&self) -> Result<Option<Session>>;
	/// Removes the snapshot, reporting whether one existed.
	fn clear(&self) -> Result<bool>;
}

/// File-backed store writing pretty JSON under the user config dir.
#[derive(Debug, Clone)]
pub struct FsSessionStore {
	path: PathBuf,
}

impl FsSessionStore {
	/// Creates a store at an explicit path.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// Default snapshot location: `<config dir>/roomchat/session.json`.
	pub fn default_path() -> PathBuf {
		dirs::config_dir()
			.unwrap_or_else(|| PathBuf::from("."))
			.join("roomchat")
			.join("session.json")
	}

	/// Snapshot file path.
	pub fn path(&self) -> &Path {
		&self.path
	}
}

impl Default for FsSessionStore {
	fn default() -> Self {
		Self::new(Self::default_path())
	}
}

impl SessionStore for FsSessionStore {
	fn save(&self, session: &Session) -> Result<()> {
		if let Some(parent) = self.path.parent() {
			fs::create_dir_all(parent)?;
		}
		let json = serde_json::to_string_pretty(&SessionSnapshot::of(session))
			.map_err(|err| std::io::Error::other(err.to_string()))?;
		fs::write(&self.path, json)?;
		Ok(())
	}

	fn restore(&self) -> Result<Option<Session>> {
		// Missing or corrupt snapshots restore to nothing rather than
		// failing startup.
		let snapshot: SessionSnapshot = match fs::read_to_string(&self.path) {
			Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(err) => return Err(err.into()),
		};
		Ok(snapshot.into_session())
	}

	fn clear(&self) -> Result<bool> {
		match fs::remove_file(&self.path) {
			Ok(()) => Ok(true),
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
			Err(err) => Err(err.into()),
		}
	}
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
	slot: Mutex<Option<SessionSnapshot>>,
}

impl MemorySessionStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Seeds the store with a raw snapshot, bypassing `save`.
	pub fn with_snapshot(snapshot: SessionSnapshot) -> Self {
		Self {
			slot: Mutex::new(Some(snapshot)),
		}
	}

	/// Raw snapshot currently held, if any.
	pub fn snapshot(&self) -> Option<SessionSnapshot> {
		self.slot.lock().clone()
	}
}

impl SessionStore for MemorySessionStore {
	fn save(&self, session: &Session) -> Result<()> {
		*self.slot.lock() = Some(SessionSnapshot::of(session));
		Ok(())
	}

	fn restore(&self) -> Result<Option<Session>> {
		Ok(self.slot.lock().clone().and_then(SessionSnapshot::into_session))
	}

	fn clear(&self) -> Result<bool> {
		Ok(self.slot.lock().take().is_some())
	}
}
