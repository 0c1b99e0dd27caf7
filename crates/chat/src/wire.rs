//! Long-poll update payloads and their normalization into [`InboundEvent`].
//!
//! Only the fields the router actually consumes are modeled; everything else
//! in the platform payload is ignored by serde.

use serde::Deserialize;

use forumbot_core::{ChatId, InboundEvent, UserId};

pub const DISPLAY_NAME_FALLBACK: &str = "Неизвестный";

#[derive(Debug, Deserialize)]
pub struct UpdatePage {
    #[serde(default)]
    pub updates: Vec<Update>,
    pub marker: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_type: String,
    pub message: Option<WireMessage>,
    pub callback: Option<WireCallback>,
}

#[derive(Debug, Deserialize)]
pub struct WireMessage {
    pub sender: Option<WireUser>,
    pub recipient: Option<WireRecipient>,
    pub body: Option<WireBody>,
}

#[derive(Debug, Deserialize)]
pub struct WireBody {
    pub mid: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireUser {
    pub user_id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl WireUser {
    pub fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("");
        let last = self.last_name.as_deref().unwrap_or("");
        let full = format!("{first} {last}");
        let full = full.trim();
        if full.is_empty() {
            DISPLAY_NAME_FALLBACK.to_owned()
        } else {
            full.to_owned()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WireRecipient {
    pub chat_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct WireCallback {
    pub callback_id: Option<String>,
    pub payload: Option<String>,
    pub user: Option<WireUser>,
}

/// Converts one raw update into the router's event shape. Update types the
/// bot does not react to (including `bot_started`, which is followed by a
/// regular message anyway) normalize to `None`.
pub fn normalize(update: Update) -> Option<InboundEvent> {
    match update.update_type.as_str() {
        "message_created" => {
            let message = update.message?;
            let sender = message.sender?;
            let body = message.body?;
            let text = body.text?;

            let mut event =
                InboundEvent::text_message(UserId(sender.user_id), sender.display_name(), text);
            if let Some(mid) = body.mid {
                event = event.with_message_ref(mid);
            }
            if let Some(chat_id) = message.recipient.and_then(|r| r.chat_id) {
                event = event.with_chat(ChatId(chat_id));
            }
            Some(event)
        }
        "message_callback" => {
            let callback = update.callback?;
            let user = callback.user?;
            let intent = callback.payload?;

            let mut event = InboundEvent::button_press(
                UserId(user.user_id),
                user.display_name(),
                intent,
                callback.callback_id,
            );
            // delivery address: the chat the pressed message lives in, or the
            // user's own id when the platform reports no usable chat
            let chat_id = update
                .message
                .as_ref()
                .and_then(|m| m.recipient.as_ref())
                .and_then(|r| r.chat_id)
                .filter(|id| *id != 0)
                .unwrap_or(user.user_id);
            event = event.with_chat(ChatId(chat_id));

            if let Some(mid) = update.message.and_then(|m| m.body).and_then(|b| b.mid) {
                event = event.with_message_ref(mid);
            }
            Some(event)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use forumbot_core::{ChatId, UserId};

    use super::{normalize, Update, DISPLAY_NAME_FALLBACK};

    fn parse(raw: &str) -> Update {
        serde_json::from_str(raw).expect("valid update json")
    }

    #[test]
    fn message_created_becomes_a_text_event() {
        let update = parse(
            r#"{
                "update_type": "message_created",
                "message": {
                    "sender": { "user_id": 10, "first_name": "Анна", "last_name": "Ким" },
                    "recipient": { "chat_id": 500 },
                    "body": { "mid": "mid.1", "text": "/start" }
                }
            }"#,
        );

        let event = normalize(update).expect("event");
        assert_eq!(event.sender, UserId(10));
        assert_eq!(event.display_name, "Анна Ким");
        assert_eq!(event.chat_id, Some(ChatId(500)));
        assert_eq!(event.text.as_deref(), Some("/start"));
        assert_eq!(event.message_ref.as_deref(), Some("mid.1"));
        assert_eq!(event.intent, None);
    }

    #[test]
    fn callback_becomes_a_button_press_with_event_id() {
        let update = parse(
            r#"{
                "update_type": "message_callback",
                "callback": {
                    "callback_id": "cb-77",
                    "payload": "track_ai",
                    "user": { "user_id": 11, "first_name": "Олег" }
                },
                "message": {
                    "recipient": { "chat_id": 600 },
                    "body": { "mid": "mid.2" }
                }
            }"#,
        );

        let event = normalize(update).expect("event");
        assert_eq!(event.intent.as_deref(), Some("track_ai"));
        assert_eq!(event.event_id.as_deref(), Some("cb-77"));
        assert_eq!(event.chat_id, Some(ChatId(600)));
        assert_eq!(event.message_ref.as_deref(), Some("mid.2"));
    }

    #[test]
    fn callback_without_a_chat_falls_back_to_the_user_id() {
        let update = parse(
            r#"{
                "update_type": "message_callback",
                "callback": {
                    "payload": "show_menu",
                    "user": { "user_id": 12 }
                }
            }"#,
        );

        let event = normalize(update).expect("event");
        assert_eq!(event.chat_id, Some(ChatId(12)));
        assert_eq!(event.display_name, DISPLAY_NAME_FALLBACK);
        assert_eq!(event.event_id, None);
    }

    #[test]
    fn unhandled_update_types_are_dropped() {
        let update = parse(r#"{ "update_type": "bot_started" }"#);
        assert!(normalize(update).is_none());
    }

    #[test]
    fn callback_without_a_payload_is_dropped() {
        let update = parse(
            r#"{
                "update_type": "message_callback",
                "callback": { "user": { "user_id": 13 } }
            }"#,
        );
        assert!(normalize(update).is_none());
    }
}
