//! Dispatch of one inbound frame.
//!
//! 1. decode the `type`/`from` envelope;
//! 2. require `from` to be the connection's authenticated user;
//! 3. look the type up in the decoder table;
//! 4. decode and validate the full payload;
//! 5. run its delivery rule with the received frame, which is forwarded
//!    verbatim and never re-serialized.

use tungstenite::protocol::Message as WsMessage;

use crate::client::{CompleteIdentity, Connection};
use crate::hub::Hub;
use crate::payload::{Envelope, Payload, PayloadError, PayloadType, decode};

pub fn dispatch(
    hub: &Hub,
    connection: &Connection,
    frame: &WsMessage,
) -> Result<PayloadType, PayloadError> {
    let data: &[u8] = match frame {
        WsMessage::Text(text) => text.as_bytes(),
        WsMessage::Binary(bytes) => bytes.as_ref(),
        _ => return Err(PayloadError::UnsupportedFrame),
    };

    let envelope: Envelope = decode(data)?;
    if envelope.from != connection.user() {
        return Err(PayloadError::IdentityMismatch {
            claimed: envelope.from,
            actual: connection.user().to_string(),
        });
    }

    let decoder = hub
        .decoders()
        .get(&envelope.kind)
        .ok_or(PayloadError::UnknownType(envelope.kind))?;
    let payload = decoder(data)?;

    payload.deliver(hub, frame, connection.identity());
    Ok(payload.kind())
}

impl Payload {
    pub fn deliver(&self, hub: &Hub, frame: &WsMessage, sender: &CompleteIdentity) {
        match self {
            Payload::ChatMessage(message) => message.deliver(hub, frame, sender),
            Payload::TypingStatus(status) => status.deliver(hub, frame, sender),
            Payload::EditMessage(message) => message.deliver(hub, frame, sender),
            Payload::DeleteMessage(message) => message.deliver(hub, frame, sender),
            Payload::SendFriendRequest(request) => request.deliver(hub, frame, sender),
            Payload::AcceptedFriendRequest(request) => request.deliver(hub, frame, sender),
            Payload::RemovesFriendRelation(request) => request.deliver(hub, frame, sender),
            Payload::UpdateProfile(profile) => profile.deliver(hub, frame, sender),
            Payload::CreateRootNode(node) => node.deliver(hub, frame, sender),
            Payload::NodeLikeAction(action) => action.deliver(hub, frame, sender),
            Payload::CreateSecondaryNode(node) => node.deliver(hub, frame, sender),
            Payload::PollSubscription(subscription) => subscription.deliver(hub, frame, sender),
            Payload::PollVotesUpdate(update) => update.deliver(hub, frame, sender),
            Payload::PresenceSubscription(subscription) => {
                subscription.deliver(hub, frame, sender)
            }
        }
    }
}
