//! Profile and content-graph payloads.
//!
//! Root nodes (posts, discussions) hang off a single user. Secondary nodes
//! (comments, replies) hang off a user and a parent node, so they reach more
//! people: the parent's owner, anyone mentioned, and the author of the node
//! being replied to.

use serde::Deserialize;
use tungstenite::protocol::Message as WsMessage;
use validator::Validate;

use crate::client::CompleteIdentity;
use crate::hub::Hub;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ParentNode {
    #[validate(length(min = 1))]
    pub node_id: String,
    #[validate(length(min = 1))]
    pub node_type: String,
}

/// Payload for `user_update_profile`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfile {
    #[validate(length(min = 1))]
    pub from: String,
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

impl UpdateProfile {
    pub fn deliver(&self, hub: &Hub, frame: &WsMessage, sender: &CompleteIdentity) {
        hub.deliver_to_user(&self.from, frame, Some(sender.resource()));
    }
}

/// Payload for `user_create_root_node`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRootNode {
    #[validate(length(min = 1))]
    pub from: String,
    #[validate(length(min = 1))]
    pub id: String,
    #[validate(length(min = 1))]
    pub node_type: String,
}

impl CreateRootNode {
    pub fn deliver(&self, hub: &Hub, frame: &WsMessage, sender: &CompleteIdentity) {
        hub.deliver_to_user(&self.from, frame, Some(sender.resource()));
    }
}

/// Payload for `user_node_like_action`. `to` is the node's owner.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NodeLikeAction {
    #[validate(length(min = 1))]
    pub from: String,
    #[validate(length(min = 1))]
    pub to: String,
    #[serde(default)]
    pub is_like: bool,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub comment_count: i64,
    #[validate(length(min = 1))]
    pub node_id: String,
    #[validate(length(min = 1))]
    pub node_type: String,
    #[validate(nested)]
    pub parents: Vec<ParentNode>,
}

impl NodeLikeAction {
    pub fn deliver(&self, hub: &Hub, frame: &WsMessage, sender: &CompleteIdentity) {
        if self.to != self.from {
            hub.deliver_to_user(&self.to, frame, None);
        }
        hub.deliver_to_user(&self.from, frame, Some(sender.resource()));
    }
}

/// Payload for `user_create_secondary_node`. `to` is the parent node's owner.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSecondaryNode {
    #[validate(length(min = 1))]
    pub from: String,
    #[validate(length(min = 1))]
    pub to: String,
    #[validate(length(min = 1))]
    pub node_id: String,
    #[validate(length(min = 1))]
    pub node_type: String,
    #[serde(default)]
    pub mentions: Vec<String>,
    #[serde(default)]
    pub reply_on_node_created_by: Option<String>,
    #[validate(nested)]
    pub parents: Vec<ParentNode>,
}

impl CreateSecondaryNode {
    /// Unlike the other multi-device rules this one includes the creator's
    /// originating device.
    pub fn deliver(&self, hub: &Hub, frame: &WsMessage, _sender: &CompleteIdentity) {
        let creator = self.from.as_str();
        let parent_owner = self.to.as_str();

        if creator != parent_owner {
            hub.deliver_to_user(parent_owner, frame, None);
        }
        hub.deliver_to_user(creator, frame, None);

        // one delivery per listed mention, repeats included
        for user in &self.mentions {
            if user != creator && user != parent_owner {
                hub.deliver_to_user(user, frame, None);
            }
        }

        if let Some(author) = self.reply_on_node_created_by.as_deref() {
            if author != creator && author != parent_owner {
                hub.deliver_to_user(author, frame, None);
            }
        }
    }
}
