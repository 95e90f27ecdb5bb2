//! Deadline-aware subprocess execution.

use crate::error::{Result, SzinkronError};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Captured output of a finished subprocess.
#[derive(Debug)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Last non-empty stderr line, for compact error reporting.
    pub fn stderr_tail(&self) -> String {
        self.stderr
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("")
            .to_string()
    }
}

/// Capture limit per stream; external tools can be chatty.
const MAX_CAPTURE_BYTES: usize = 256 * 1024;

/// Run an external binary with a hard deadline.
///
/// Owns stdin/stdout/stderr, drains both output streams, and kills the
/// process when the deadline elapses. The exit code is the authoritative
/// success signal; callers inspect `stderr_tail()` on failure.
pub async fn run_with_deadline(
    program: &str,
    args: &[&str],
    deadline: Duration,
) -> Result<CommandOutput> {
    debug!(program, ?args, ?deadline, "Spawning subprocess");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SzinkronError::ToolNotFound(program.to_string())
            } else {
                SzinkronError::ToolFailed(format!("{}: {}", program, e))
            }
        })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let drain = async {
        // both streams drain concurrently so neither pipe can fill up
        let (out, err) = tokio::join!(
            async {
                match stdout {
                    Some(mut s) => drain_stream(&mut s).await,
                    None => String::new(),
                }
            },
            async {
                match stderr {
                    Some(mut s) => drain_stream(&mut s).await,
                    None => String::new(),
                }
            },
        );
        let status = child.wait().await?;
        Ok::<_, std::io::Error>((status, out, err))
    };

    match tokio::time::timeout(deadline, drain).await {
        Ok(Ok((status, stdout, stderr))) => Ok(CommandOutput {
            exit_code: status.code().unwrap_or(-1),
            stdout,
            stderr,
        }),
        Ok(Err(e)) => Err(SzinkronError::ToolFailed(format!("{}: {}", program, e))),
        Err(_) => {
            warn!(program, "Subprocess exceeded deadline, killing");
            Err(SzinkronError::ToolFailed(format!(
                "{} exceeded deadline of {}s",
                program,
                deadline.as_secs()
            )))
        }
    }
}

async fn drain_stream<R: tokio::io::AsyncRead + Unpin>(reader: &mut R) -> String {
    use tokio::io::AsyncReadExt;

    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                if buf.len() < MAX_CAPTURE_BYTES {
                    let take = n.min(MAX_CAPTURE_BYTES - buf.len());
                    buf.extend_from_slice(&chunk[..take]);
                }
                // keep reading past the cap so the child never blocks on a full pipe
            }
            Err(_) => break,
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_command() {
        let out = run_with_deadline("echo", &["hello"], Duration::from_secs(5))
            .await
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_missing_tool() {
        let err = run_with_deadline("definitely-not-a-binary", &[], Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SzinkronError::ToolNotFound(_)));
    }

    #[tokio::test]
    async fn test_deadline_kill() {
        let err = run_with_deadline("sleep", &["5"], Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, SzinkronError::ToolFailed(_)));
    }

    #[tokio::test]
    async fn test_stderr_tail() {
        let out = run_with_deadline("sh", &["-c", "echo a >&2; echo b >&2; exit 3"], Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out.exit_code, 3);
        assert_eq!(out.stderr_tail(), "b");
    }
}
