//! Webhook request bodies: JSON, or a form whose `payload` field holds the same JSON.

use crate::channels::InboundMessage;
use axum::http::{header, HeaderMap};

const JSON: &str = "application/json";
const FORM: &str = "application/x-www-form-urlencoded";

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("unsupported content type: {0:?}")]
    UnsupportedContentType(String),
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

/// Media type without parameters, lowercased (`"Application/JSON; charset=utf-8"` -> `"application/json"`).
fn media_type(headers: &HeaderMap) -> String {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Decode a webhook request body into an [`InboundMessage`] according to its content type.
pub fn normalize(headers: &HeaderMap, body: &[u8]) -> Result<InboundMessage, ParseError> {
    match media_type(headers).as_str() {
        JSON => Ok(serde_json::from_slice(body)?),
        FORM => {
            let payload = form_urlencoded::parse(body)
                .find(|(k, _)| k == "payload")
                .map(|(_, v)| v.into_owned())
                .unwrap_or_default();
            Ok(serde_json::from_str(&payload)?)
        }
        other => Err(ParseError::UnsupportedContentType(other.to_string())),
    }
}
