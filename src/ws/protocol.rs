//! Wire protocol for the realtime channel.
//!
//! Frames are JSON text of the form `{"event": ..., "data": ...}` with three
//! events: `chat message`, `typing`, and `stop typing`. The server relays and
//! never persists; identity rides in the event payloads and is not verified
//! beyond what the page load already implies.

use serde::{Deserialize, Serialize};

/// One chat message, client-generated id and timestamp included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub user_id: String,
    pub display_name: String,
    pub avatar_initials: String,
    pub text: String,
    /// Milliseconds since epoch
    pub timestamp: i64,
}

/// The identity attached to typing presence events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUser {
    pub user_id: String,
    pub display_name: String,
    pub avatar_initials: String,
}

/// A frame on the realtime channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ChannelEvent {
    #[serde(rename = "chat message")]
    Chat(ChatMessage),
    #[serde(rename = "typing")]
    Typing(PresenceUser),
    #[serde(rename = "stop typing")]
    StopTyping(PresenceUser),
}

impl ChannelEvent {
    /// Encode this event as a JSON text frame.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a JSON text frame.
    pub fn from_frame(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_use_the_event_data_envelope() {
        let event = ChannelEvent::Typing(PresenceUser {
            user_id: "u1".to_string(),
            display_name: "Ada".to_string(),
            avatar_initials: "AL".to_string(),
        });
        let frame = event.to_frame().unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["event"], "typing");
        assert_eq!(value["data"]["userId"], "u1");
        assert_eq!(ChannelEvent::from_frame(&frame).unwrap(), event);
    }

    #[test]
    fn chat_message_round_trips_with_camel_case_fields() {
        let event = ChannelEvent::Chat(ChatMessage {
            id: "m1".to_string(),
            user_id: "u1".to_string(),
            display_name: "Ada".to_string(),
            avatar_initials: "AL".to_string(),
            text: "hello".to_string(),
            timestamp: 1700000000000,
        });
        let frame = event.to_frame().unwrap();
        assert!(frame.contains("\"chat message\""));
        assert!(frame.contains("\"displayName\""));
        assert_eq!(ChannelEvent::from_frame(&frame).unwrap(), event);
    }
}
