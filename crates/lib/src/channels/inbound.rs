//! Inbound message from a webhook caller: normalized request body before routing.

use serde::Deserialize;

/// Canonical `{text, channel?}` pair decoded from a webhook request body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InboundMessage {
    #[serde(alias = "Text")]
    pub text: String,
    #[serde(default, alias = "Channel")]
    pub channel: Option<String>,
}
