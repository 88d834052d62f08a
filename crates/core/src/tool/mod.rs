//! External transcoding tool invocation.
//!
//! Every stage that rewrites a media file goes through [`ToolRunner`], which
//! builds the argument vector, retries failed attempts with exponential
//! backoff and removes partial outputs. Process spawning sits behind the
//! [`ToolExecutor`] trait.

mod config;
mod error;
mod executor;
mod runner;

pub use config::{ToolConfig, SHOW_OUTPUT_ENV};
pub use error::ToolError;
pub use executor::{ProcessExecutor, ToolExecutor, ToolOutput};
pub use runner::{ExitClass, ToolInvocation, ToolRunner, CORRUPTION_EXIT_CODE};
