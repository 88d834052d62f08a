//! Configuration for the external tool runner.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable that forces tool output on (non-zero) or off (zero).
pub const SHOW_OUTPUT_ENV: &str = "SHOW_FFMPEG_OUTPUT";

/// Configuration for invoking the external transcoding tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Path to the tool binary.
    #[serde(default = "default_tool_path")]
    pub path: PathBuf,

    /// Pass the tool's own output through instead of silencing it.
    #[serde(default)]
    pub show_output: bool,

    /// Total attempts per invocation, including the first.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry in seconds.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_secs: u64,

    /// Exponential backoff multiplier.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Upper bound on a single delay in seconds.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,

    /// User arguments appended to conversion invocations.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_tool_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff() -> u64 {
    1
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_backoff() -> u64 {
    60
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            path: default_tool_path(),
            show_output: false,
            max_retries: default_max_retries(),
            initial_backoff_secs: default_initial_backoff(),
            backoff_multiplier: default_backoff_multiplier(),
            max_backoff_secs: default_max_backoff(),
            extra_args: Vec::new(),
        }
    }
}

impl ToolConfig {
    /// Sets the tool binary path.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the total number of attempts.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Delay to wait after failed attempt number `attempt` (0-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let secs = self.initial_backoff_secs as f64 * self.backoff_multiplier.powi(attempt as i32);
        let capped = secs.min(self.max_backoff_secs as f64);
        Duration::from_secs_f64(capped.max(0.0))
    }

    /// Whether tool output should be shown, honoring the environment override.
    pub fn effective_show_output(&self) -> bool {
        match std::env::var(SHOW_OUTPUT_ENV) {
            Ok(value) => parse_show_output(&value).unwrap_or(self.show_output),
            Err(_) => self.show_output,
        }
    }
}

fn parse_show_output(value: &str) -> Option<bool> {
    value.trim().parse::<i64>().ok().map(|v| v != 0)
}
