//! Removes every tag and attached stream except audio.

use async_trait::async_trait;

use crate::error::PostProcessError;
use crate::item::{Item, ItemMetadata};
use crate::tool::ToolRunner;

use super::rewrite_with_tool;
use super::traits::Stage;

#[derive(Debug, Clone)]
pub struct StripStage {
    runner: ToolRunner,
}

impl StripStage {
    pub fn new(runner: ToolRunner) -> Self {
        Self { runner }
    }

    pub fn build_args() -> Vec<String> {
        ["-map", "0:a", "-map_metadata", "-1", "-c:a", "copy"]
            .into_iter()
            .map(String::from)
            .collect()
    }
}

#[async_trait]
impl Stage for StripStage {
    fn name(&self) -> &str {
        "strip"
    }

    async fn apply(&self, item: &Item, _metadata: &ItemMetadata) -> Result<(), PostProcessError> {
        tracing::info!("Stripping metadata from {}", item.file_path.display());
        rewrite_with_tool(&self.runner, &item.file_path, Self::build_args()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_args() {
        assert_eq!(
            StripStage::build_args(),
            vec!["-map", "0:a", "-map_metadata", "-1", "-c:a", "copy"]
        );
    }
}
