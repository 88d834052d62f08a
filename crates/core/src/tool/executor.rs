//! Process execution behind a trait so the runner can be driven by a stub.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Outcome of a single tool process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
    /// Captured stderr. Empty when output is passed through.
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs a program with an argument vector.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Returns the executor name for logging.
    fn name(&self) -> &str;

    /// Runs `program` to completion. A missing binary surfaces as an
    /// `io::ErrorKind::NotFound` error.
    async fn execute(
        &self,
        program: &Path,
        args: &[String],
        show_output: bool,
    ) -> std::io::Result<ToolOutput>;
}

/// Spawns real child processes with tokio.
#[derive(Debug, Default, Clone)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolExecutor for ProcessExecutor {
    fn name(&self) -> &str {
        "process"
    }

    async fn execute(
        &self,
        program: &Path,
        args: &[String],
        show_output: bool,
    ) -> std::io::Result<ToolOutput> {
        let mut command = Command::new(program);
        command.args(args).stdin(Stdio::null());

        if show_output {
            let status = command
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .await?;
            return Ok(ToolOutput {
                code: status.code(),
                stderr: String::new(),
            });
        }

        let output = command
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        Ok(ToolOutput {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_not_found() {
        let executor = ProcessExecutor::new();
        let err = executor
            .execute(Path::new("/nonexistent/ffmpeg-binary"), &[], false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_captures_exit_code_and_stderr() {
        let executor = ProcessExecutor::new();
        let args = vec!["-c".to_string(), "echo broken >&2; exit 7".to_string()];
        let output = executor
            .execute(Path::new("/bin/sh"), &args, false)
            .await
            .unwrap();
        assert_eq!(output.code, Some(7));
        assert_eq!(output.stderr, "broken");
        assert!(!output.success());
    }
}
