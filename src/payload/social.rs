//! Friend relation payloads.
//!
//! All three reject a relation with oneself and otherwise reach the other
//! party on every device and the actor on their remaining devices.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;
use tungstenite::protocol::Message as WsMessage;
use validator::Validate;

use crate::client::CompleteIdentity;
use crate::hub::Hub;

/// Payload for `user_send_friend_request` and `user_accepted_friend_request`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    #[validate(length(min = 1))]
    pub from: String,
    #[validate(length(min = 1))]
    pub to: String,
    #[validate(length(min = 1))]
    pub requested_by: String,
    pub added_on: DateTime<Utc>,
}

impl FriendRequest {
    pub fn deliver(&self, hub: &Hub, frame: &WsMessage, sender: &CompleteIdentity) {
        deliver_relation(hub, frame, sender, &self.from, &self.to);
    }
}

/// Payload for `user_removes_friend_relation`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RemoveFriendRelation {
    #[validate(length(min = 1))]
    pub from: String,
    #[validate(length(min = 1))]
    pub to: String,
}

impl RemoveFriendRelation {
    pub fn deliver(&self, hub: &Hub, frame: &WsMessage, sender: &CompleteIdentity) {
        deliver_relation(hub, frame, sender, &self.from, &self.to);
    }
}

fn deliver_relation(
    hub: &Hub,
    frame: &WsMessage,
    sender: &CompleteIdentity,
    from: &str,
    to: &str,
) {
    if from == to {
        debug!(user = from, "ignoring friend relation with oneself");
        return;
    }

    hub.deliver_to_user(from, frame, Some(sender.resource()));
    hub.deliver_to_user(to, frame, None);
}
