//! The hub: who is connected where, who is subscribed to what, and the
//! fan-out primitives payload rules use to reach them.

pub mod engine;
pub mod message;
pub mod presence;
pub mod registry;
pub mod subscription;
pub mod topic;

pub use engine::{Hub, HubStats};
pub use message::PresenceInfo;
pub use registry::{ConnectionRegistry, Registration, Removal};
pub use subscription::SubscriptionRegistry;
pub use topic::Topic;
