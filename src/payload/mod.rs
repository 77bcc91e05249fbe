//! Inbound payloads
//!
//! Every client frame is a JSON object carrying at least `type` and `from`.
//! The set of types is closed: each one has a struct here, a decoder in
//! `PayloadDecoders`, and a delivery rule reached through the single match in
//! `Payload::deliver`.
//!
//! Nothing in this module ever answers the client. Frames that fail to
//! decode, fail validation, claim somebody else's username or carry an
//! unknown type are dropped and logged by the caller.

pub mod content;
pub mod dispatch;
pub mod messaging;
pub mod poll;
pub mod presence;
pub mod social;

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use validator::Validate;

pub use content::{CreateRootNode, CreateSecondaryNode, NodeLikeAction, ParentNode, UpdateProfile};
pub use dispatch::dispatch;
pub use messaging::{ChatMessage, DeleteMessage, EditMessage, MessageIds, TypingStatus};
pub use poll::{PollSubscription, PollVotesUpdate};
pub use presence::PresenceSubscription;
pub use social::{FriendRequest, RemoveFriendRelation};

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("only text and binary frames carry payloads")]
    UnsupportedFrame,
    #[error("invalid payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("missing required field in payload: {0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error("payload from {claimed:?} on a connection of {actual:?}")]
    IdentityMismatch { claimed: String, actual: String },
    #[error("unknown payload type {0:?}")]
    UnknownType(String),
}

/// Wire tags of every payload a client may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadType {
    ChatMessage,
    TypingStatus,
    EditMessage,
    DeleteMessage,
    SendFriendRequest,
    AcceptedFriendRequest,
    RemovesFriendRelation,
    UpdateProfile,
    CreateRootNode,
    NodeLikeAction,
    CreateSecondaryNode,
    PollSubscription,
    PollVotesUpdate,
    PresenceSubscription,
}

impl PayloadType {
    pub const ALL: [PayloadType; 14] = [
        PayloadType::ChatMessage,
        PayloadType::TypingStatus,
        PayloadType::EditMessage,
        PayloadType::DeleteMessage,
        PayloadType::SendFriendRequest,
        PayloadType::AcceptedFriendRequest,
        PayloadType::RemovesFriendRelation,
        PayloadType::UpdateProfile,
        PayloadType::CreateRootNode,
        PayloadType::NodeLikeAction,
        PayloadType::CreateSecondaryNode,
        PayloadType::PollSubscription,
        PayloadType::PollVotesUpdate,
        PayloadType::PresenceSubscription,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PayloadType::ChatMessage => "chat_message",
            PayloadType::TypingStatus => "typing_status",
            PayloadType::EditMessage => "edit_message",
            PayloadType::DeleteMessage => "delete_message",
            PayloadType::SendFriendRequest => "user_send_friend_request",
            PayloadType::AcceptedFriendRequest => "user_accepted_friend_request",
            PayloadType::RemovesFriendRelation => "user_removes_friend_relation",
            PayloadType::UpdateProfile => "user_update_profile",
            PayloadType::CreateRootNode => "user_create_root_node",
            PayloadType::NodeLikeAction => "user_node_like_action",
            PayloadType::CreateSecondaryNode => "user_create_secondary_node",
            PayloadType::PollSubscription => "poll_subscription",
            PayloadType::PollVotesUpdate => "poll_votes_update",
            PayloadType::PresenceSubscription => "user_presence_subscription",
        }
    }
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fields every payload carries; decoded first to authenticate and
/// route the frame before the variant itself is decoded.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Envelope {
    #[serde(rename = "type")]
    #[validate(length(min = 1))]
    pub kind: String,
    #[validate(length(min = 1))]
    pub from: String,
}

#[derive(Debug, Clone)]
pub enum Payload {
    ChatMessage(ChatMessage),
    TypingStatus(TypingStatus),
    EditMessage(EditMessage),
    DeleteMessage(DeleteMessage),
    SendFriendRequest(FriendRequest),
    AcceptedFriendRequest(FriendRequest),
    RemovesFriendRelation(RemoveFriendRelation),
    UpdateProfile(UpdateProfile),
    CreateRootNode(CreateRootNode),
    NodeLikeAction(NodeLikeAction),
    CreateSecondaryNode(CreateSecondaryNode),
    PollSubscription(PollSubscription),
    PollVotesUpdate(PollVotesUpdate),
    PresenceSubscription(PresenceSubscription),
}

impl Payload {
    pub fn kind(&self) -> PayloadType {
        match self {
            Payload::ChatMessage(_) => PayloadType::ChatMessage,
            Payload::TypingStatus(_) => PayloadType::TypingStatus,
            Payload::EditMessage(_) => PayloadType::EditMessage,
            Payload::DeleteMessage(_) => PayloadType::DeleteMessage,
            Payload::SendFriendRequest(_) => PayloadType::SendFriendRequest,
            Payload::AcceptedFriendRequest(_) => PayloadType::AcceptedFriendRequest,
            Payload::RemovesFriendRelation(_) => PayloadType::RemovesFriendRelation,
            Payload::UpdateProfile(_) => PayloadType::UpdateProfile,
            Payload::CreateRootNode(_) => PayloadType::CreateRootNode,
            Payload::NodeLikeAction(_) => PayloadType::NodeLikeAction,
            Payload::CreateSecondaryNode(_) => PayloadType::CreateSecondaryNode,
            Payload::PollSubscription(_) => PayloadType::PollSubscription,
            Payload::PollVotesUpdate(_) => PayloadType::PollVotesUpdate,
            Payload::PresenceSubscription(_) => PayloadType::PresenceSubscription,
        }
    }
}

pub type Decoder = fn(&[u8]) -> Result<Payload, PayloadError>;

/// Immutable `type tag -> decoder` table, built once with the hub.
#[derive(Debug, Clone)]
pub struct PayloadDecoders {
    table: HashMap<&'static str, Decoder>,
}

impl Default for PayloadDecoders {
    fn default() -> Self {
        Self::new()
    }
}

impl PayloadDecoders {
    pub fn new() -> Self {
        let table = PayloadType::ALL
            .into_iter()
            .map(|kind| (kind.as_str(), decoder_for(kind)))
            .collect();
        Self { table }
    }

    pub fn get(&self, kind: &str) -> Option<Decoder> {
        self.table.get(kind).copied()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

fn decoder_for(kind: PayloadType) -> Decoder {
    match kind {
        PayloadType::ChatMessage => |data: &[u8]| decode(data).map(Payload::ChatMessage),
        PayloadType::TypingStatus => |data: &[u8]| decode(data).map(Payload::TypingStatus),
        PayloadType::EditMessage => |data: &[u8]| decode(data).map(Payload::EditMessage),
        PayloadType::DeleteMessage => |data: &[u8]| decode(data).map(Payload::DeleteMessage),
        PayloadType::SendFriendRequest => |data: &[u8]| decode(data).map(Payload::SendFriendRequest),
        PayloadType::AcceptedFriendRequest => {
            |data: &[u8]| decode(data).map(Payload::AcceptedFriendRequest)
        }
        PayloadType::RemovesFriendRelation => {
            |data: &[u8]| decode(data).map(Payload::RemovesFriendRelation)
        }
        PayloadType::UpdateProfile => |data: &[u8]| decode(data).map(Payload::UpdateProfile),
        PayloadType::CreateRootNode => |data: &[u8]| decode(data).map(Payload::CreateRootNode),
        PayloadType::NodeLikeAction => |data: &[u8]| decode(data).map(Payload::NodeLikeAction),
        PayloadType::CreateSecondaryNode => {
            |data: &[u8]| decode(data).map(Payload::CreateSecondaryNode)
        }
        PayloadType::PollSubscription => |data: &[u8]| decode(data).map(Payload::PollSubscription),
        PayloadType::PollVotesUpdate => |data: &[u8]| decode(data).map(Payload::PollVotesUpdate),
        PayloadType::PresenceSubscription => {
            |data: &[u8]| decode(data).map(Payload::PresenceSubscription)
        }
    }
}

/// Deserializes `data` into `T` and checks its required fields.
pub fn decode<T>(data: &[u8]) -> Result<T, PayloadError>
where
    T: DeserializeOwned + Validate,
{
    let value: T = serde_json::from_slice(data)?;
    value.validate()?;
    Ok(value)
}

#[cfg(test)]
mod tests;
