use serde::Deserialize;
use tungstenite::protocol::Message as WsMessage;
use validator::Validate;

use crate::client::CompleteIdentity;
use crate::hub::{Hub, Topic};

/// Payload for `user_presence_subscription`. `subscribe: false` (or absent)
/// unsubscribes.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PresenceSubscription {
    #[validate(length(min = 1))]
    pub from: String,
    #[validate(length(min = 1))]
    pub user: String,
    #[serde(default)]
    pub subscribe: bool,
}

impl PresenceSubscription {
    pub fn deliver(&self, hub: &Hub, _frame: &WsMessage, sender: &CompleteIdentity) {
        let topic = Topic::presence(&self.user);
        if self.subscribe {
            hub.subscribe(topic, sender);
        } else {
            hub.unsubscribe(&topic, sender);
        }
    }
}
