use serde::{Deserialize, Serialize};
use tungstenite::protocol::Message as WsMessage;

pub const PRESENCE_INFO_TYPE: &str = "user_presence_info";

/// Server-synthesized presence notification.
///
/// ```json
/// {"type":"user_presence_info","user":"alice","online":false}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub user: String,
    pub online: bool,
}

impl PresenceInfo {
    pub fn new(user: &str, online: bool) -> Self {
        Self {
            kind: PRESENCE_INFO_TYPE.to_string(),
            user: user.to_string(),
            online,
        }
    }

    pub fn to_frame(&self) -> Result<WsMessage, serde_json::Error> {
        serde_json::to_string(self).map(WsMessage::text)
    }
}
