//! Retrying runner for the external transcoding tool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::metrics;
use crate::swap::remove_if_exists;

use super::config::ToolConfig;
use super::error::ToolError;
use super::executor::{ProcessExecutor, ToolExecutor, ToolOutput};

/// Exit code the tool uses for unreadable or corrupt input.
pub const CORRUPTION_EXIT_CODE: i32 = 183;

/// One tool invocation: read `input`, apply `args`, write `output`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Stage arguments placed between the input and the output.
    pub args: Vec<String>,
}

impl ToolInvocation {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            args,
        }
    }
}

/// How an exit code is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitClass {
    Success,
    /// Likely corrupt input or an access problem. Retried like any failure.
    Corruption,
    Failure,
}

impl ExitClass {
    pub fn classify(code: Option<i32>) -> Self {
        match code {
            Some(0) => Self::Success,
            Some(CORRUPTION_EXIT_CODE) => Self::Corruption,
            _ => Self::Failure,
        }
    }
}

/// Runs the external tool with retry and cleanup of partial outputs.
#[derive(Clone)]
pub struct ToolRunner {
    config: ToolConfig,
    executor: Arc<dyn ToolExecutor>,
}

impl std::fmt::Debug for ToolRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRunner")
            .field("config", &self.config)
            .field("executor", &self.executor.name())
            .finish()
    }
}

impl ToolRunner {
    pub fn new(config: ToolConfig, executor: Arc<dyn ToolExecutor>) -> Self {
        Self { config, executor }
    }

    /// Runner that spawns real processes.
    pub fn with_process_executor(config: ToolConfig) -> Self {
        Self::new(config, Arc::new(ProcessExecutor::new()))
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    /// Builds the argument vector (without the program name).
    pub fn build_argv(&self, invocation: &ToolInvocation, show_output: bool) -> Vec<String> {
        let mut argv = vec!["-y".to_string()];

        if !show_output {
            argv.extend([
                "-loglevel".to_string(),
                "error".to_string(),
                "-hide_banner".to_string(),
                "-nostats".to_string(),
            ]);
        }

        argv.extend([
            "-i".to_string(),
            invocation.input.to_string_lossy().to_string(),
        ]);
        argv.extend(invocation.args.iter().cloned());
        argv.push(invocation.output.to_string_lossy().to_string());

        argv
    }

    /// Runs with the configured number of attempts.
    pub async fn run(&self, invocation: &ToolInvocation) -> Result<(), ToolError> {
        self.run_with_retries(invocation, self.config.max_retries)
            .await
    }

    /// Runs up to `max_retries` attempts in total.
    ///
    /// The output file is deleted before every attempt. After the last failed
    /// attempt both the input and the output are deleted.
    pub async fn run_with_retries(
        &self,
        invocation: &ToolInvocation,
        max_retries: u32,
    ) -> Result<(), ToolError> {
        let attempts = max_retries.max(1);
        let show_output = self.config.effective_show_output();
        let argv = self.build_argv(invocation, show_output);

        tracing::debug!(
            "Running {} {}",
            self.config.path.display(),
            argv.join(" ")
        );

        let mut last = ToolOutput::default();

        for attempt in 0..attempts {
            clear_output(&invocation.output).await?;

            match self
                .executor
                .execute(&self.config.path, &argv, show_output)
                .await
            {
                Ok(output) => {
                    match ExitClass::classify(output.code) {
                        ExitClass::Success => {
                            metrics::TOOL_ATTEMPTS.with_label_values(&["success"]).inc();
                            return Ok(());
                        }
                        ExitClass::Corruption => {
                            metrics::TOOL_ATTEMPTS
                                .with_label_values(&["corruption"])
                                .inc();
                            tracing::warn!(
                                "Tool exited with {} on {} (attempt {}/{}): input is likely corrupt or inaccessible",
                                CORRUPTION_EXIT_CODE,
                                invocation.input.display(),
                                attempt + 1,
                                attempts
                            );
                        }
                        ExitClass::Failure => {
                            metrics::TOOL_ATTEMPTS.with_label_values(&["failure"]).inc();
                            tracing::warn!(
                                "Tool exited with {:?} on {} (attempt {}/{}): {}",
                                output.code,
                                invocation.input.display(),
                                attempt + 1,
                                attempts,
                                output.stderr
                            );
                        }
                    }
                    last = output;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    metrics::TOOL_ATTEMPTS.with_label_values(&["not_found"]).inc();
                    tracing::error!("Tool not found at {}", self.config.path.display());
                    return Err(ToolError::NotFound {
                        path: self.config.path.clone(),
                    });
                }
                Err(e) => {
                    metrics::TOOL_ATTEMPTS.with_label_values(&["failure"]).inc();
                    tracing::warn!(
                        "Failed to spawn tool (attempt {}/{}): {}",
                        attempt + 1,
                        attempts,
                        e
                    );
                    last = ToolOutput {
                        code: None,
                        stderr: e.to_string(),
                    };
                }
            }

            if attempt + 1 < attempts {
                let delay = self.config.backoff_delay(attempt);
                tracing::warn!("Retrying in {:?}", delay);
                tokio::time::sleep(delay).await;
            }
        }

        tracing::error!(
            "Tool failed on {} after {} attempt(s)",
            invocation.input.display(),
            attempts
        );
        for path in [&invocation.input, &invocation.output] {
            if let Err(e) = remove_if_exists(path).await {
                tracing::warn!("Failed to clean up {}: {}", path.display(), e);
            }
        }

        Err(ToolError::Failed {
            code: last.code,
            attempts,
            stderr: last.stderr,
        })
    }
}

async fn clear_output(output: &Path) -> Result<(), ToolError> {
    remove_if_exists(output)
        .await
        .map_err(|source| ToolError::OutputLocked {
            path: output.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockToolExecutor;
    use std::time::Duration;
    use tempfile::TempDir;

    fn runner(mock: &Arc<MockToolExecutor>) -> ToolRunner {
        ToolRunner::new(ToolConfig::default(), mock.clone())
    }

    fn invocation(dir: &TempDir) -> ToolInvocation {
        let input = dir.path().join("~song.mp3");
        std::fs::write(&input, b"audio").unwrap();
        ToolInvocation::new(
            input,
            dir.path().join("song.mp3"),
            vec!["-c:a".to_string(), "copy".to_string()],
        )
    }

    #[test]
    fn test_classify() {
        assert_eq!(ExitClass::classify(Some(0)), ExitClass::Success);
        assert_eq!(ExitClass::classify(Some(183)), ExitClass::Corruption);
        assert_eq!(ExitClass::classify(Some(1)), ExitClass::Failure);
        assert_eq!(ExitClass::classify(None), ExitClass::Failure);
    }

    #[test]
    fn test_build_argv_quiet_and_shown() {
        let mock = Arc::new(MockToolExecutor::new());
        let runner = runner(&mock);
        let inv = ToolInvocation::new(
            "/m/~a.ogg",
            "/m/a.ogg",
            vec!["-c:a".to_string(), "copy".to_string()],
        );

        assert_eq!(
            runner.build_argv(&inv, false),
            vec![
                "-y", "-loglevel", "error", "-hide_banner", "-nostats", "-i", "/m/~a.ogg",
                "-c:a", "copy", "/m/a.ogg"
            ]
        );
        assert_eq!(
            runner.build_argv(&inv, true),
            vec!["-y", "-i", "/m/~a.ogg", "-c:a", "copy", "/m/a.ogg"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_iff_failures_below_max() {
        for max in 1..=4u32 {
            for failures in 0..=4usize {
                let dir = TempDir::new().unwrap();
                let mock = Arc::new(MockToolExecutor::new());
                mock.push_exit_codes(std::iter::repeat(1).take(failures)).await;

                let inv = invocation(&dir);
                let result = runner(&mock).run_with_retries(&inv, max).await;

                assert_eq!(
                    result.is_ok(),
                    failures < max as usize,
                    "max={} failures={}",
                    max,
                    failures
                );
                let expected_calls = (failures + 1).min(max as usize);
                assert_eq!(mock.call_count().await, expected_calls);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_delays_double() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockToolExecutor::new());
        mock.push_exit_codes([1, 183, 1]).await;

        let inv = invocation(&dir);
        runner(&mock).run_with_retries(&inv, 4).await.unwrap();

        let calls = mock.recorded_calls().await;
        assert_eq!(calls.len(), 4);
        let expected = [1u64, 2, 4];
        for (i, secs) in expected.iter().enumerate() {
            let gap = calls[i + 1].at - calls[i].at;
            assert!(
                gap >= Duration::from_secs(*secs) && gap < Duration::from_secs(*secs) + Duration::from_millis(100),
                "gap {} was {:?}",
                i,
                gap
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_failure_removes_input_and_output() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockToolExecutor::new());
        mock.push_exit_codes([1, 1, 183]).await;

        let inv = invocation(&dir);
        let err = runner(&mock).run(&inv).await.unwrap_err();

        assert_eq!(err.exit_code(), Some(183));
        assert!(!inv.input.exists());
        assert!(!inv.output.exists());
    }

    #[tokio::test]
    async fn test_stale_output_removed_before_attempt() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockToolExecutor::new());
        mock.set_write_output(false).await;

        let inv = invocation(&dir);
        std::fs::write(&inv.output, b"stale").unwrap();
        runner(&mock).run(&inv).await.unwrap();

        assert!(!inv.output.exists());
        assert!(inv.input.exists());
    }

    #[tokio::test]
    async fn test_missing_tool_is_not_retried() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockToolExecutor::new());
        mock.set_not_found(true).await;

        let inv = invocation(&dir);
        let err = runner(&mock).run(&inv).await.unwrap_err();

        assert!(matches!(err, ToolError::NotFound { .. }));
        assert_eq!(mock.call_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_error_is_retried_as_failure() {
        let dir = TempDir::new().unwrap();
        // exists but is not executable
        let tool = dir.path().join("ffmpeg");
        std::fs::write(&tool, b"not a program").unwrap();

        let config = ToolConfig::default().with_path(&tool).with_max_retries(2);
        let runner = ToolRunner::with_process_executor(config);
        let err = runner.run(&invocation(&dir)).await.unwrap_err();

        match err {
            ToolError::Failed { code, attempts, .. } => {
                assert_eq!(code, None);
                assert_eq!(attempts, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
