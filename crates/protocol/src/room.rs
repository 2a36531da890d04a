//! Room registry wire shapes and topic naming.

use serde::{Deserialize, Serialize};

/// Room registry response for create/join requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDescriptor {
	pub room_id: String,
}

/// Subscription topic carrying inbound messages for `room_id`.
pub fn room_topic(room_id: &str) -> String {
	format!("/topic/room/{room_id}")
}

/// Publish destination for outbound messages to `room_id`.
pub fn room_destination(room_id: &str) -> String {
	format!("/app/sendMessage/{room_id}")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn descriptor_round_trips_room_id() {
		let descriptor: RoomDescriptor = serde_json::from_str(r#"{"roomId": "r1"}"#).unwrap();
		assert_eq!(descriptor.room_id, "r1");
	}

	#[test]
	fn topic_and_destination_are_room_scoped() {
		assert_eq!(room_topic("r1"), "/topic/room/r1");
		assert_eq!(room_destination("r1"), "/app/sendMessage/r1");
	}
}
