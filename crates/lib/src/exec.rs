//! Process execution for the chat backend binary.
//! No shell is used; arguments are passed as a list to avoid injection.

use std::process::ExitStatus;
use tokio::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("launching {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{binary} exited with {status}: {output}")]
    Failed {
        binary: String,
        status: ExitStatus,
        output: String,
    },
}

/// Run `binary args...` and return its stdout. On a non-zero exit, stdout and stderr are
/// combined into the error so the caller can surface the backend's message.
pub async fn run(binary: &str, args: &[&str]) -> Result<String, ExecError> {
    let output = Command::new(binary)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| ExecError::Spawn {
            binary: binary.to_string(),
            source,
        })?;
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if output.status.success() {
        return Ok(stdout);
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let mut msg = stdout.trim().to_string();
    if !stderr.trim().is_empty() {
        if !msg.is_empty() {
            msg.push('\n');
        }
        msg.push_str(stderr.trim());
    }
    Err(ExecError::Failed {
        binary: binary.to_string(),
        status: output.status,
        output: msg,
    })
}
