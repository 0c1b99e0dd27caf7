use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque platform user identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Delivery address for outbound messages to one user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Normalized inbound event, produced once at the platform boundary.
///
/// Downstream handlers never re-derive fields from the raw wire payload:
/// a button press carries `intent` and usually `event_id`, a plain message
/// carries `text`, and either may carry the id of the message it arrived in
/// (`message_ref`, used to delete the pressed menu message).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundEvent {
    pub sender: UserId,
    pub display_name: String,
    /// Platform-unique event id, when the platform supplies one. Events
    /// without an id cannot be deduplicated and are always processed.
    pub event_id: Option<String>,
    pub chat_id: Option<ChatId>,
    pub text: Option<String>,
    pub intent: Option<String>,
    pub message_ref: Option<String>,
}

impl InboundEvent {
    pub fn text_message(sender: UserId, display_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender,
            display_name: display_name.into(),
            event_id: None,
            chat_id: None,
            text: Some(text.into()),
            intent: None,
            message_ref: None,
        }
    }

    pub fn button_press(
        sender: UserId,
        display_name: impl Into<String>,
        intent: impl Into<String>,
        event_id: Option<String>,
    ) -> Self {
        Self {
            sender,
            display_name: display_name.into(),
            event_id,
            chat_id: None,
            text: None,
            intent: Some(intent.into()),
            message_ref: None,
        }
    }

    pub fn with_chat(mut self, chat_id: ChatId) -> Self {
        self.chat_id = Some(chat_id);
        self
    }

    pub fn with_message_ref(mut self, message_ref: impl Into<String>) -> Self {
        self.message_ref = Some(message_ref.into());
        self
    }
}
