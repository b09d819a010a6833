//! hookrelay library: relays webhook notifications into Keybase team chats.
//!
//! Requests are validated by path token, normalized, routed to a team, and queued for a
//! single delivery worker that posts them in order.

pub mod channels;
pub mod config;
pub mod delivery;
pub mod exec;
pub mod gateway;
pub mod init;
pub mod routing;
