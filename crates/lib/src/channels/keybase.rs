//! Keybase chat: posts team messages through the local `keybase chat api` JSON interface.

use crate::channels::sender::{ChatSender, SendError};
use crate::exec::{self, ExecError};
use async_trait::async_trait;
use serde::Deserialize;

/// Subset of `keybase status --json` needed to confirm a usable session.
#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(rename = "Username", default)]
    username: String,
    #[serde(rename = "LoggedIn", default)]
    logged_in: bool,
}

/// `keybase chat api` reply: either `result` or `error` is set.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("keybase status failed: {0}")]
    Status(#[from] ExecError),
    #[error("parsing keybase status: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("keybase is not logged in")]
    NotLoggedIn,
}

/// Keybase chat session bound to a local binary and a logged-in user.
pub struct KeybaseChat {
    id: String,
    bin: String,
    username: String,
}

impl KeybaseChat {
    /// Check that `bin` can be launched and has a logged-in user.
    pub async fn start(bin: impl Into<String>) -> Result<Self, SessionError> {
        let bin = bin.into();
        let out = exec::run(&bin, &["status", "--json"]).await?;
        let username = parse_status(&out)?;
        log::debug!("keybase session started for user {}", username);
        Ok(Self {
            id: "keybase".to_string(),
            bin,
            username,
        })
    }

    /// Logged-in Keybase user messages are sent as.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Send `text` to `channel` of `team` via `keybase chat api`.
    pub async fn send_message_by_team_name(
        &self,
        team: &str,
        text: &str,
        channel: &str,
    ) -> Result<(), SendError> {
        let request = send_request(team, text, channel).to_string();
        let out = exec::run(&self.bin, &["chat", "api", "-m", &request]).await?;
        check_api_response(&out)
    }
}

fn parse_status(out: &str) -> Result<String, SessionError> {
    let status: StatusResponse = serde_json::from_str(out)?;
    if !status.logged_in || status.username.is_empty() {
        return Err(SessionError::NotLoggedIn);
    }
    Ok(status.username)
}

/// Build the chat api `send` request for a team channel.
fn send_request(team: &str, text: &str, channel: &str) -> serde_json::Value {
    serde_json::json!({
        "method": "send",
        "params": {
            "options": {
                "channel": {
                    "name": team,
                    "members_type": "team",
                    "topic_name": channel,
                },
                "message": { "body": text },
            }
        }
    })
}

fn check_api_response(out: &str) -> Result<(), SendError> {
    let res: ApiResponse = serde_json::from_str(out.trim())
        .map_err(|e| SendError::Api(format!("unreadable response ({}): {}", e, out.trim())))?;
    match res.error {
        Some(err) => Err(SendError::Api(format!("{} (code {})", err.message, err.code))),
        None => Ok(()),
    }
}

#[async_trait]
impl ChatSender for KeybaseChat {
    fn id(&self) -> &str {
        &self.id
    }

    async fn send(&self, team: &str, text: &str, channel: &str) -> Result<(), SendError> {
        self.send_message_by_team_name(team, text, channel).await
    }
}
