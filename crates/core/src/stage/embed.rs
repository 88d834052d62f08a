//! Writes descriptive tags into the file.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::error::PostProcessError;
use crate::item::{Container, Item, ItemMetadata};
use crate::tool::ToolRunner;

use super::config::EmbedConfig;
use super::error::TagError;
use super::id3_repair::repair_mp3_frames;
use super::rewrite_with_tool;
use super::tag_editor::TagEditor;
use super::tag_table::build_metadata_args;
use super::traits::Stage;

/// Copies the audio stream and adds one `-metadata` pair per enabled field.
///
/// With a tag editor, MP3 files get their misplaced frames repaired
/// afterwards.
#[derive(Clone)]
pub struct EmbedStage {
    runner: ToolRunner,
    config: EmbedConfig,
    /// Joins list values such as artists.
    separator: String,
    tag_editor: Option<Arc<dyn TagEditor>>,
}

impl fmt::Debug for EmbedStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbedStage")
            .field("runner", &self.runner)
            .field("config", &self.config)
            .field("separator", &self.separator)
            .field("tag_editor", &self.tag_editor.as_ref().map(|e| e.name().to_string()))
            .finish()
    }
}

impl EmbedStage {
    pub fn new(runner: ToolRunner, config: EmbedConfig, separator: impl Into<String>) -> Self {
        Self {
            runner,
            config,
            separator: separator.into(),
            tag_editor: None,
        }
    }

    pub fn with_tag_editor(mut self, tag_editor: Arc<dyn TagEditor>) -> Self {
        self.tag_editor = Some(tag_editor);
        self
    }

    pub fn build_args(&self, item: &Item, metadata: &ItemMetadata) -> Vec<String> {
        let mut args = vec!["-c:a".to_string(), "copy".to_string()];
        args.extend(build_metadata_args(
            item,
            metadata,
            &self.config,
            &self.separator,
        ));
        args
    }
}

#[async_trait]
impl Stage for EmbedStage {
    fn name(&self) -> &str {
        "embed"
    }

    async fn apply(&self, item: &Item, metadata: &ItemMetadata) -> Result<(), PostProcessError> {
        let args = self.build_args(item, metadata);
        tracing::info!("Embedding metadata in {}", item.file_path.display());
        rewrite_with_tool(&self.runner, &item.file_path, args).await?;

        if item.container() == Container::Mp3 {
            if let Some(editor) = self.tag_editor.clone() {
                self.repair_frames(editor, item).await;
            }
        }
        Ok(())
    }
}

impl EmbedStage {
    /// The embedded file is already valid, so a failed repair is only logged.
    async fn repair_frames(&self, editor: Arc<dyn TagEditor>, item: &Item) {
        let path = item.file_path.clone();
        let result = tokio::task::spawn_blocking(move || repair_mp3_frames(editor.as_ref(), &path))
            .await
            .map_err(|e| TagError::Task(e.to_string()))
            .and_then(|r| r);

        match result {
            Ok(0) => {}
            Ok(n) => tracing::debug!("Repaired {} ID3 frame(s) in {}", n, item.file_path.display()),
            Err(e) => tracing::warn!(
                "Failed to repair ID3 frames in {}: {}",
                item.file_path.display(),
                e
            ),
        }
    }
}
