//! Poll payloads, routed through content topics.

use serde::Deserialize;
use tungstenite::protocol::Message as WsMessage;
use validator::Validate;

use crate::client::CompleteIdentity;
use crate::hub::{Hub, Topic};

/// Payload for `poll_subscription`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PollSubscription {
    #[validate(length(min = 1))]
    pub from: String,
    #[validate(length(min = 1))]
    pub poll_id: String,
}

impl PollSubscription {
    pub fn deliver(&self, hub: &Hub, _frame: &WsMessage, sender: &CompleteIdentity) {
        hub.subscribe(Topic::content(&self.poll_id), sender);
    }
}

/// Payload for `poll_votes_update`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PollVotesUpdate {
    #[validate(length(min = 1))]
    pub from: String,
    #[validate(length(min = 1))]
    pub poll_id: String,
    pub votes: Vec<i64>,
}

impl PollVotesUpdate {
    /// Every subscribed device except the voting one.
    pub fn deliver(&self, hub: &Hub, frame: &WsMessage, sender: &CompleteIdentity) {
        hub.publish_to_topic(&Topic::content(&self.poll_id), frame, Some(sender));
    }
}
