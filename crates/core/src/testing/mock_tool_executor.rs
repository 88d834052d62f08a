//! Mock tool executor for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::tool::{ToolExecutor, ToolOutput};

/// A recorded tool invocation for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedInvocation {
    /// Program that would have been spawned.
    pub program: PathBuf,
    /// Full argument vector.
    pub args: Vec<String>,
    /// When the call was made, on the tokio clock.
    pub at: Instant,
}

/// Mock implementation of the ToolExecutor trait.
///
/// Exit codes are consumed in order from a script; once it is empty every
/// call succeeds. On success the output (the last argument) is written as a
/// copy of the input, so the swap around it sees a real file.
///
/// # Example
///
/// ```rust,ignore
/// use finisher_core::testing::MockToolExecutor;
///
/// let tool = Arc::new(MockToolExecutor::new());
/// tool.push_exit_codes([1, 183]).await;
///
/// let runner = ToolRunner::new(ToolConfig::default(), tool.clone());
/// runner.run(&invocation).await?;
///
/// assert_eq!(tool.call_count().await, 3);
/// ```
#[derive(Debug)]
pub struct MockToolExecutor {
    calls: Arc<RwLock<Vec<RecordedInvocation>>>,
    exit_codes: Arc<RwLock<VecDeque<i32>>>,
    not_found: Arc<RwLock<bool>>,
    write_output: Arc<RwLock<bool>>,
    delay: Arc<RwLock<Option<Duration>>>,
    check_inputs: Arc<RwLock<bool>>,
}

impl Default for MockToolExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockToolExecutor {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            exit_codes: Arc::new(RwLock::new(VecDeque::new())),
            not_found: Arc::new(RwLock::new(false)),
            write_output: Arc::new(RwLock::new(true)),
            delay: Arc::new(RwLock::new(None)),
            check_inputs: Arc::new(RwLock::new(false)),
        }
    }

    /// Queue exit codes for the next calls.
    pub async fn push_exit_codes(&self, codes: impl IntoIterator<Item = i32>) {
        self.exit_codes.write().await.extend(codes);
    }

    /// Behave as if the program does not exist.
    pub async fn set_not_found(&self, not_found: bool) {
        *self.not_found.write().await = not_found;
    }

    /// Whether calls write anything to the output path.
    pub async fn set_write_output(&self, write: bool) {
        *self.write_output.write().await = write;
    }

    /// Make every call take `delay` before it finishes.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    /// Fail with exit code 1 when any `-i` input is gone by the end of the call.
    pub async fn set_check_inputs(&self, check: bool) {
        *self.check_inputs.write().await = check;
    }

    pub async fn recorded_calls(&self) -> Vec<RecordedInvocation> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    pub async fn clear_recorded(&self) {
        self.calls.write().await.clear();
    }
}

fn input_arg(args: &[String]) -> Option<&str> {
    args.iter()
        .position(|a| a == "-i")
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn input_args(args: &[String]) -> impl Iterator<Item = &str> {
    args.windows(2)
        .filter(|pair| pair[0] == "-i")
        .map(|pair| pair[1].as_str())
}

#[async_trait]
impl ToolExecutor for MockToolExecutor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn execute(
        &self,
        program: &Path,
        args: &[String],
        _show_output: bool,
    ) -> std::io::Result<ToolOutput> {
        self.calls.write().await.push(RecordedInvocation {
            program: program.to_path_buf(),
            args: args.to_vec(),
            at: Instant::now(),
        });

        if *self.not_found.read().await {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "mock tool not found",
            ));
        }

        let mut code = self.exit_codes.write().await.pop_front().unwrap_or(0);

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if code == 0 && *self.check_inputs.read().await {
            for input in input_args(args) {
                if !tokio::fs::try_exists(input).await.unwrap_or(false) {
                    code = 1;
                    break;
                }
            }
        }

        if *self.write_output.read().await {
            if let Some(output) = args.last() {
                let data = if code == 0 {
                    match input_arg(args) {
                        Some(input) => tokio::fs::read(input)
                            .await
                            .unwrap_or_else(|_| b"mock output".to_vec()),
                        None => b"mock output".to_vec(),
                    }
                } else {
                    b"partial".to_vec()
                };
                tokio::fs::write(output, data).await?;
            }
        }

        Ok(ToolOutput {
            code: Some(code),
            stderr: if code == 0 {
                String::new()
            } else {
                format!("mock failure {}", code)
            },
        })
    }
}
