//! Chat channels: inbound webhook messages and the outbound chat sender.
//!
//! The delivery worker holds a `ChatSender`; `KeybaseChat` is the production implementation
//! and tests substitute their own.

mod inbound;
mod keybase;
mod sender;

pub use inbound::InboundMessage;
pub use keybase::{KeybaseChat, SessionError};
pub use sender::{ChatSender, SendError};
