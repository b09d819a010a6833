//! Token routing: path token -> webhook registration -> delivery payload.
//!
//! Registrations are scanned in configured order and the first one whose token matches wins.
//! Duplicate tokens are allowed; later duplicates are shadowed by earlier ones.

use crate::channels::InboundMessage;
use crate::config::WebhookRegistration;

/// Channel used when the caller does not name one.
pub const DEFAULT_CHANNEL: &str = "general";

/// A routed message ready for the chat sender. `channel` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryPayload {
    pub text: String,
    pub channel: String,
    pub team: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    #[error("Invalid token")]
    UnknownToken,
}

/// First registration whose token equals `token`.
pub fn find_webhook<'a>(
    token: &str,
    webhooks: &'a [WebhookRegistration],
) -> Result<&'a WebhookRegistration, RoutingError> {
    webhooks
        .iter()
        .find(|w| w.token == token)
        .ok_or(RoutingError::UnknownToken)
}

impl WebhookRegistration {
    /// Attach this registration's team to `msg`, defaulting an absent or empty channel.
    pub fn payload_for(&self, msg: InboundMessage) -> DeliveryPayload {
        let channel = msg
            .channel
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CHANNEL.to_string());
        let payload = DeliveryPayload {
            text: msg.text,
            channel,
            team: self.team.clone(),
        };
        log::info!("webhook payload: {:?}", payload);
        payload
    }
}

/// Route an already-normalized message. The gateway calls [`find_webhook`] before parsing
/// the body instead, so unknown tokens are rejected without touching it.
pub fn route(
    token: &str,
    webhooks: &[WebhookRegistration],
    msg: InboundMessage,
) -> Result<DeliveryPayload, RoutingError> {
    Ok(find_webhook(token, webhooks)?.payload_for(msg))
}
