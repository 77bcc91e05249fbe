//! The `transport` module turns authenticated WebSocket upgrades into hub
//! connections.
//!
//! `auth` verifies the bearer token, `websocket` owns the listener and the
//! upgrade, and `pump` runs the read and write loops of each connection.

pub mod auth;
pub mod pump;
pub mod websocket;

pub use auth::{AuthError, Authenticator, JwtAuthenticator};
pub use websocket::{TransportError, serve, start_websocket_server};
