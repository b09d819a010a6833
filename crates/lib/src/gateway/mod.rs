//! Gateway: the webhook HTTP surface.
//!
//! Requests are checked against registered tokens, normalized, routed, and handed to the
//! delivery queue; the HTTP response only reflects that hand-off.

mod normalize;
mod server;

pub use normalize::{normalize, ParseError};
pub use server::{router, run_gateway, GatewayState};
