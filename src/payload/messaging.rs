//! One-to-one instant messaging payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tungstenite::protocol::Message as WsMessage;
use validator::{Validate, ValidationError};

use crate::client::CompleteIdentity;
use crate::hub::Hub;

/// Payload for `chat_message`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[validate(length(min = 1))]
    pub from: String,
    #[validate(length(min = 1))]
    pub to: String,
    #[validate(length(min = 1))]
    pub id: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[validate(length(min = 1))]
    pub body: String,
    pub send_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Every device of the recipient, plus the sender's other devices.
    /// Self-addressed messages only echo.
    pub fn deliver(&self, hub: &Hub, frame: &WsMessage, sender: &CompleteIdentity) {
        if self.to != self.from {
            hub.deliver_to_user(&self.to, frame, None);
        }
        hub.deliver_to_user(&self.from, frame, Some(sender.resource()));
    }
}

/// Payload for `typing_status`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TypingStatus {
    #[validate(length(min = 1))]
    pub from: String,
    #[validate(length(min = 1))]
    pub to: String,
}

impl TypingStatus {
    pub fn deliver(&self, hub: &Hub, frame: &WsMessage, _sender: &CompleteIdentity) {
        if self.to == self.from {
            return;
        }
        hub.deliver_to_user(&self.to, frame, None);
    }
}

/// Payload for `edit_message`. Older clients send `editedOn` instead of
/// `sendAt`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EditMessage {
    #[validate(length(min = 1))]
    pub from: String,
    #[validate(length(min = 1))]
    pub to: String,
    #[validate(length(min = 1))]
    pub id: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[validate(length(min = 1))]
    pub body: String,
    #[serde(alias = "editedOn")]
    pub send_at: DateTime<Utc>,
}

impl EditMessage {
    pub fn deliver(&self, hub: &Hub, frame: &WsMessage, sender: &CompleteIdentity) {
        if self.to != self.from {
            hub.deliver_to_user(&self.to, frame, None);
        }
        hub.deliver_to_user(&self.from, frame, Some(sender.resource()));
    }
}

/// A delete may target one message or a batch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MessageIds {
    One(String),
    Many(Vec<String>),
}

impl MessageIds {
    pub fn as_vec(&self) -> Vec<&str> {
        match self {
            MessageIds::One(id) => vec![id.as_str()],
            MessageIds::Many(ids) => ids.iter().map(String::as_str).collect(),
        }
    }
}

fn validate_message_ids(ids: &MessageIds) -> Result<(), ValidationError> {
    let ids = ids.as_vec();
    if ids.is_empty() || ids.iter().any(|id| id.is_empty()) {
        return Err(ValidationError::new("empty_message_id"));
    }
    Ok(())
}

/// Payload for `delete_message`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DeleteMessage {
    #[validate(length(min = 1))]
    pub from: String,
    #[validate(length(min = 1))]
    pub to: String,
    #[validate(custom(function = "validate_message_ids"))]
    pub id: MessageIds,
    /// Delete for both parties rather than only on the sender's devices.
    #[serde(default, deserialize_with = "bool_or_string")]
    pub everyone: bool,
}

impl DeleteMessage {
    pub fn deliver(&self, hub: &Hub, frame: &WsMessage, sender: &CompleteIdentity) {
        if self.everyone && self.to != self.from {
            hub.deliver_to_user(&self.to, frame, None);
        }
        hub.deliver_to_user(&self.from, frame, Some(sender.resource()));
    }
}

/// Accepts `true`/`false` as JSON booleans or strings.
fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(flag) => Ok(flag),
        Flag::Text(text) => text.parse().map_err(serde::de::Error::custom),
    }
}
