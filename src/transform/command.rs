// src/transform/command.rs

//! Shell command runner shared by the tool-backed transforms and custom
//! `[task.*]` entries.

use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use super::TransformError;

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub code: i32,
    pub success: bool,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// Build a shell command appropriate for the platform.
pub fn shell(command_line: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command_line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command_line);
        c
    }
}

/// Run `command_line` through the shell in `cwd`, optionally feeding `stdin`.
///
/// A non-zero exit status is reported as [`TransformError::Tool`] carrying the
/// captured stderr.
pub async fn run_shell(
    command_line: &str,
    cwd: &Path,
    stdin: Option<&[u8]>,
) -> Result<CommandOutput, TransformError> {
    let output = capture_shell(command_line, cwd, stdin).await?;
    if !output.success {
        return Err(TransformError::Tool {
            tool: command_line.to_string(),
            code: output.code,
            stderr: output.stderr,
        });
    }
    info!(cmd = %command_line, exit_code = output.code, "command finished");
    Ok(output)
}

/// Like [`run_shell`], but a non-zero exit is returned to the caller instead
/// of being turned into an error.
pub async fn capture_shell(
    command_line: &str,
    cwd: &Path,
    stdin: Option<&[u8]>,
) -> Result<CommandOutput, TransformError> {
    debug!(cmd = %command_line, cwd = ?cwd, "spawning command");

    let mut cmd = shell(command_line);
    cmd.current_dir(cwd)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|source| TransformError::Spawn {
        tool: command_line.to_string(),
        source,
    })?;

    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        // Must not block on stdin before stdout is being drained.
        let input = input.to_vec();
        tokio::spawn(async move {
            let _ = pipe.write_all(&input).await;
            let _ = pipe.shutdown().await;
        });
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|source| TransformError::Spawn {
            tool: command_line.to_string(),
            source,
        })?;

    Ok(CommandOutput {
        code: output.status.code().unwrap_or(-1),
        success: output.status.success(),
        stdout: output.stdout,
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

/// Quote a path for interpolation into a shell command line.
pub fn quote_arg(arg: &str) -> String {
    if cfg!(windows) {
        format!("\"{}\"", arg.replace('"', "\\\""))
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
