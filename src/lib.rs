//! # RelayHub
//!
//! `relayhub` is an in-memory, real-time delivery hub for multi-device
//! clients. Devices connect over authenticated WebSockets as `user@resource`
//! and send typed JSON payloads; the hub routes each one, byte for byte, to
//! the currently connected devices that should see it, including the
//! sender's other devices.
//!
//! ## Core Modules
//!
//! - `client`: identities and the per-connection handle frames are pushed to.
//! - `hub`: the connection registry, topic subscriptions and presence.
//! - `payload`: the closed set of payload types, their validation and their
//!   delivery rules.
//! - `transport`: token verification, the WebSocket upgrade and the
//!   per-connection read/write pump.
//! - `config`: layered settings (file, environment, defaults).
//! - `utils`: logging setup.

pub mod client;
pub mod config;
pub mod hub;
pub mod payload;
pub mod transport;
pub mod utils;
