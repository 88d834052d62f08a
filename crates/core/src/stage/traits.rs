//! The post-processing stage trait.

use async_trait::async_trait;

use crate::error::PostProcessError;
use crate::item::{Item, ItemMetadata};

/// One discrete transformation applied to an item's file.
///
/// Stages rewrite `item.file_path` in place and must leave either the
/// original or the finished file behind, never a partial one.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Returns the stage name for logging and metrics.
    fn name(&self) -> &str;

    /// Applies the stage to the item's current file.
    async fn apply(&self, item: &Item, metadata: &ItemMetadata) -> Result<(), PostProcessError>;
}
