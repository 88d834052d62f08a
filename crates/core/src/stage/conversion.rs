//! Transcodes a download into the requested container.

use async_trait::async_trait;

use crate::error::PostProcessError;
use crate::item::{Container, Item, ItemMetadata};
use crate::tool::ToolRunner;

use super::config::{ConversionConfig, OPUS_SAMPLE_RATE};
use super::rewrite_with_tool;
use super::traits::Stage;

/// Rewrites the file into the container named by its extension.
#[derive(Debug, Clone)]
pub struct ConversionStage {
    runner: ToolRunner,
    config: ConversionConfig,
}

impl ConversionStage {
    pub fn new(runner: ToolRunner, config: ConversionConfig) -> Self {
        Self { runner, config }
    }

    /// Tool arguments for the item's current container.
    pub fn build_args(&self, item: &Item) -> Vec<String> {
        let container = item.container();
        let bitrate = self.config.file_bitrate.clone();

        let mut args: Vec<String> = if &container == self.config.native_container_for(&item.item_service) {
            if self.config.use_custom_file_bitrate {
                vec!["-b:a".to_string(), bitrate]
            } else {
                vec!["-c:a".to_string(), "copy".to_string()]
            }
        } else {
            let rate = if container == Container::Opus {
                OPUS_SAMPLE_RATE
            } else {
                self.config.file_hertz
            };
            vec![
                "-ac".to_string(),
                "2".to_string(),
                "-ar".to_string(),
                rate.to_string(),
                "-b:a".to_string(),
                bitrate,
            ]
        };

        args.extend(self.runner.config().extra_args.iter().cloned());
        args
    }
}

#[async_trait]
impl Stage for ConversionStage {
    fn name(&self) -> &str {
        "conversion"
    }

    async fn apply(&self, item: &Item, _metadata: &ItemMetadata) -> Result<(), PostProcessError> {
        let args = self.build_args(item);
        tracing::info!(
            "Converting {} to {}",
            item.file_path.display(),
            item.container()
        );
        rewrite_with_tool(&self.runner, &item.file_path, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockToolExecutor};
    use crate::tool::ToolConfig;
    use std::sync::Arc;

    fn stage(config: ConversionConfig, extra: &[&str]) -> ConversionStage {
        let mut tool = ToolConfig::default();
        tool.extra_args = extra.iter().map(|s| s.to_string()).collect();
        let runner = ToolRunner::new(tool, Arc::new(MockToolExecutor::new()));
        ConversionStage::new(runner, config)
    }

    #[test]
    fn test_native_container_copies() {
        let item = fixtures::track_item("t1", "/m/a.ogg");
        let args = stage(ConversionConfig::default(), &[]).build_args(&item);
        assert_eq!(args, vec!["-c:a", "copy"]);
    }

    #[test]
    fn test_native_container_custom_bitrate() {
        let item = fixtures::track_item("t1", "/m/a.ogg");
        let config = ConversionConfig::default().with_custom_bitrate("256k");
        let args = stage(config, &[]).build_args(&item);
        assert_eq!(args, vec!["-b:a", "256k"]);
    }

    #[test]
    fn test_transcode_uses_configured_rate() {
        let item = fixtures::track_item("t1", "/m/a.mp3");
        let args = stage(ConversionConfig::default(), &["-threads", "2"]).build_args(&item);
        assert_eq!(
            args,
            vec!["-ac", "2", "-ar", "44100", "-b:a", "320k", "-threads", "2"]
        );
    }

    #[test]
    fn test_opus_forces_48k() {
        let item = fixtures::track_item("t1", "/m/a.opus");
        let args = stage(ConversionConfig::default(), &[]).build_args(&item);
        assert_eq!(args, vec!["-ac", "2", "-ar", "48000", "-b:a", "320k"]);
    }

    #[tokio::test]
    async fn test_apply_runs_tool_on_temp_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a.mp3");
        std::fs::write(&path, b"raw").unwrap();

        let mock = Arc::new(MockToolExecutor::new());
        let runner = ToolRunner::new(ToolConfig::default(), mock.clone());
        let stage = ConversionStage::new(runner, ConversionConfig::default());
        let item = fixtures::track_item("t1", path.to_str().unwrap());

        stage.apply(&item, &ItemMetadata::default()).await.unwrap();

        let calls = mock.recorded_calls().await;
        assert_eq!(calls.len(), 1);
        assert!(calls[0].args.contains(&dir.path().join("~a.mp3").display().to_string()));
        assert_eq!(calls[0].args.last(), Some(&path.display().to_string()));
        assert!(path.exists());
        assert!(!dir.path().join("~a.mp3").exists());
    }
}
