//! Chat sender: the outbound capability the delivery worker posts messages through.

use crate::exec::ExecError;
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("chat backend exec failed: {0}")]
    Exec(#[from] ExecError),
    #[error("chat backend api error: {0}")]
    Api(String),
}

/// Posts a text message to a team channel.
#[async_trait]
pub trait ChatSender: Send + Sync {
    /// Sender id for logs (e.g. "keybase").
    fn id(&self) -> &str;
    /// Send `text` to `channel` in `team`. Calls are made one at a time by the delivery worker.
    async fn send(&self, team: &str, text: &str, channel: &str) -> Result<(), SendError>;
}
