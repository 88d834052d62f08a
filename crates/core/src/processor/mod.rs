//! Post-processing of downloaded items.
//!
//! [`PostProcessor`] moves each item through the stage state machine
//! (`Pending -> Converting -> Embedding -> ThumbnailEmbedding -> [Stripping] ->
//! Done`), then records it in the playlist completion cache and asks the
//! manifest writer whether its playlist is finished.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use finisher_core::processor::PostProcessor;
//! use finisher_core::queue::SharedQueue;
//! use finisher_core::stage::HttpCoverFetcher;
//! use finisher_core::tool::ProcessExecutor;
//!
//! let queue = Arc::new(SharedQueue::new());
//! let processor = PostProcessor::from_config(
//!     &config,
//!     queue.clone(),
//!     Arc::new(ProcessExecutor::new()),
//!     Arc::new(HttpCoverFetcher::new(30)?),
//!     None,
//! );
//!
//! let local_id = queue.insert(item);
//! let outcome = processor.process(&local_id, &metadata).await?;
//! ```

mod config;
mod pipeline;
mod types;

pub use config::PipelineConfig;
pub use pipeline::PostProcessor;
pub use types::{ItemProgress, ItemState, ProcessOutcome};
