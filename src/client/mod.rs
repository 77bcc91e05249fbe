//! The `client` module defines what a connected device looks like to the
//! rest of the hub: its `user@resource` identity and the shared handle used
//! to push frames to it.

pub mod connection;
pub mod identity;

pub use connection::{Connection, DeliveryError};
pub use identity::{CompleteIdentity, random_resource};
