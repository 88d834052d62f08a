//! Runs an item through its stages and reports completion to the playlist writer.

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::error::PostProcessError;
use crate::item::{Item, ItemMetadata, ItemStatus};
use crate::metrics;
use crate::playlist::{PlaylistCompletionCache, PlaylistManifestWriter};
use crate::queue::SharedQueue;
use crate::stage::{
    ConversionStage, CoverFetcher, EmbedStage, Stage, StripStage, TagEditor, ThumbnailStage,
};
use crate::tool::{ToolExecutor, ToolRunner};

use super::config::PipelineConfig;
use super::types::{ItemProgress, ItemState, ProcessOutcome};

/// Post-processes queued items one at a time per caller.
///
/// `process` may be called concurrently for different items; each call owns
/// its item for the duration of the stages.
pub struct PostProcessor {
    config: PipelineConfig,
    stages: Vec<(ItemState, Arc<dyn Stage>)>,
    queue: Arc<SharedQueue>,
    manifest: Arc<PlaylistManifestWriter>,
}

impl PostProcessor {
    /// Creates a processor with no stages.
    pub fn new(
        config: PipelineConfig,
        queue: Arc<SharedQueue>,
        manifest: Arc<PlaylistManifestWriter>,
    ) -> Self {
        Self {
            config,
            stages: Vec::new(),
            queue,
            manifest,
        }
    }

    /// Appends a stage that runs while the item is in `state`.
    pub fn with_stage(mut self, state: ItemState, stage: Arc<dyn Stage>) -> Self {
        self.stages.push((state, stage));
        self
    }

    /// Wires the standard stage order from configuration.
    pub fn from_config(
        config: &Config,
        queue: Arc<SharedQueue>,
        executor: Arc<dyn ToolExecutor>,
        fetcher: Arc<dyn CoverFetcher>,
        tag_editor: Option<Arc<dyn TagEditor>>,
    ) -> Self {
        let runner = ToolRunner::new(config.tool.clone(), executor);
        let cache = Arc::new(PlaylistCompletionCache::from_config(&config.playlist));
        let manifest = Arc::new(PlaylistManifestWriter::new(config.playlist.clone(), cache));

        let mut thumbnail = ThumbnailStage::new(runner.clone(), config.thumbnail.clone(), fetcher)
            .with_raw_media(config.pipeline.raw_media_download);
        let mut embed = EmbedStage::new(
            runner.clone(),
            config.embed.clone(),
            config.playlist.metadata_separator.clone(),
        );
        if let Some(editor) = tag_editor {
            thumbnail = thumbnail.with_tag_editor(editor.clone());
            embed = embed.with_tag_editor(editor);
        }

        let processor = Self::new(config.pipeline.clone(), queue, manifest);

        if config.pipeline.raw_media_download {
            if config.thumbnail.save_album_cover {
                return processor.with_stage(ItemState::ThumbnailEmbedding, Arc::new(thumbnail));
            }
            return processor;
        }

        let mut processor = processor
            .with_stage(
                ItemState::Converting,
                Arc::new(ConversionStage::new(runner.clone(), config.conversion.clone())),
            )
            .with_stage(ItemState::Embedding, Arc::new(embed))
            .with_stage(ItemState::ThumbnailEmbedding, Arc::new(thumbnail));

        if config.pipeline.strip_metadata {
            processor = processor.with_stage(ItemState::Stripping, Arc::new(StripStage::new(runner)));
        }

        processor
    }

    pub fn queue(&self) -> &Arc<SharedQueue> {
        &self.queue
    }

    pub fn manifest(&self) -> &Arc<PlaylistManifestWriter> {
        &self.manifest
    }

    /// Names of the configured stages, in order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|(_, stage)| stage.name()).collect()
    }

    /// Runs every stage on the item, then records it as downloaded.
    ///
    /// A stage failure marks the item `Failed` and is returned; it never
    /// touches other items. Manifest failures are logged only.
    pub async fn process(
        &self,
        local_id: &str,
        metadata: &ItemMetadata,
    ) -> Result<ProcessOutcome, PostProcessError> {
        let item = self
            .queue
            .get(local_id)
            .ok_or_else(|| PostProcessError::UnknownItem(local_id.to_string()))?;

        self.queue.set_status(local_id, ItemStatus::PostProcessing);
        tracing::info!("Post-processing {} ({})", local_id, item.file_path.display());

        let mut progress = ItemProgress::new(local_id);
        if let Err(e) = self.run_stages(&mut progress, &item, metadata).await {
            tracing::error!("Post-processing failed for {}: {}", local_id, e);
            self.queue.set_status(local_id, ItemStatus::Failed);
            if !progress.state().is_terminal() {
                progress.advance(ItemState::Failed)?;
            }
            return Err(e);
        }
        progress.advance(ItemState::Done)?;

        let manifest_written = self
            .complete(local_id, &item, metadata, ItemStatus::Downloaded)
            .await;

        Ok(ProcessOutcome {
            local_id: local_id.to_string(),
            item_id: item.item_id,
            state: progress.state(),
            manifest_written,
            finished_at: Utc::now(),
        })
    }

    /// Records an item whose file was already on disk. No stages run.
    pub async fn mark_already_exists(
        &self,
        local_id: &str,
        metadata: &ItemMetadata,
    ) -> Result<ProcessOutcome, PostProcessError> {
        let item = self
            .queue
            .get(local_id)
            .ok_or_else(|| PostProcessError::UnknownItem(local_id.to_string()))?;

        let manifest_written = self
            .complete(local_id, &item, metadata, ItemStatus::AlreadyExists)
            .await;

        Ok(ProcessOutcome {
            local_id: local_id.to_string(),
            item_id: item.item_id,
            state: ItemState::Done,
            manifest_written,
            finished_at: Utc::now(),
        })
    }

    async fn run_stages(
        &self,
        progress: &mut ItemProgress,
        item: &Item,
        metadata: &ItemMetadata,
    ) -> Result<(), PostProcessError> {
        for (state, stage) in &self.stages {
            // Raw files keep their Pending state until Done.
            if !self.config.raw_media_download {
                progress.advance(*state)?;
            }

            let started = Instant::now();
            let result = stage.apply(item, metadata).await;
            let outcome = if result.is_ok() { "success" } else { "failure" };

            metrics::STAGE_RESULTS
                .with_label_values(&[stage.name(), outcome])
                .inc();
            metrics::STAGE_DURATION
                .with_label_values(&[stage.name()])
                .observe(started.elapsed().as_secs_f64());

            result?;
            tracing::info!("Stage {} finished for {}", stage.name(), progress.local_id);
        }
        Ok(())
    }

    /// Caches the item for its playlist before publishing the status, so the
    /// worker that observes a complete playlist always finds every entry
    /// already cached.
    async fn complete(
        &self,
        local_id: &str,
        item: &Item,
        metadata: &ItemMetadata,
        status: ItemStatus,
    ) -> bool {
        if self.queue.get(local_id).is_none() {
            tracing::info!("Item {} left the queue during post-processing", local_id);
            return false;
        }

        self.manifest.cache().record_completion(item, metadata).await;
        self.queue.set_status(local_id, status);

        match item.playlist_key() {
            Some(key) => self.manifest.on_item_completed(&key, self.queue.as_ref()).await,
            None => false,
        }
    }
}

impl std::fmt::Debug for PostProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostProcessor")
            .field("config", &self.config)
            .field("stages", &self.stage_names())
            .finish()
    }
}
