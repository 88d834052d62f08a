//! Fetches cover art and attaches it to the file.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;

use crate::error::PostProcessError;
use crate::item::{Container, Item, ItemMetadata, ParentCategory};
use crate::swap::remove_if_exists;
use crate::tool::ToolRunner;

use super::config::{CoverFormat, ThumbnailConfig};
use super::cover::{encode_cover, CoverFetcher};
use super::error::TagError;
use super::rewrite_with_tool;
use super::tag_editor::{encode_picture_comment, TagEditor, TagValue, ARTWORK_FIELD, PICTURE_BLOCK_FIELD};
use super::traits::Stage;

/// File name of the shared playlist cover.
pub const PLAYLIST_COVER_NAME: &str = "cover.jpg";

/// How the cover ends up inside the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedMethod {
    /// Artwork field written through the tag library.
    TagLibrary,
    /// Base64 FLAC picture block in a Vorbis comment.
    VorbisPicture,
    /// Attached picture stream muxed in by the external tool.
    Tool,
    Skip,
}

/// Workers currently using one cover image.
#[derive(Default)]
struct CoverSlot {
    holders: usize,
    /// Serializes the fetch and write of the image.
    fetch: Arc<Mutex<()>>,
}

/// Downloads the cover once and embeds it.
///
/// Tracks in one folder share a cover file. Each worker holds a lease on the
/// image path from fetch until its embed finishes, and the file is only
/// removed when the last lease is released.
pub struct ThumbnailStage {
    runner: ToolRunner,
    config: ThumbnailConfig,
    fetcher: Arc<dyn CoverFetcher>,
    tag_editor: Option<Arc<dyn TagEditor>>,
    /// Fetch the cover but leave the file untouched.
    raw_media: bool,
    covers: Mutex<HashMap<PathBuf, CoverSlot>>,
}

impl ThumbnailStage {
    pub fn new(runner: ToolRunner, config: ThumbnailConfig, fetcher: Arc<dyn CoverFetcher>) -> Self {
        Self {
            runner,
            config,
            fetcher,
            tag_editor: None,
            raw_media: false,
            covers: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_tag_editor(mut self, tag_editor: Arc<dyn TagEditor>) -> Self {
        self.tag_editor = Some(tag_editor);
        self
    }

    pub fn with_raw_media(mut self, raw_media: bool) -> Self {
        self.raw_media = raw_media;
        self
    }

    /// Image url, cache path and encoding for the item's cover.
    pub fn cover_source(
        &self,
        item: &Item,
        metadata: &ItemMetadata,
    ) -> Option<(String, PathBuf, CoverFormat)> {
        let is_playlist = item.parent_category == ParentCategory::Playlist;
        let url = if is_playlist {
            metadata.playlist_image_url.as_ref()
        } else {
            metadata.image_url.as_ref()
        };
        let url = url.filter(|u| !u.is_empty())?.clone();

        let dir = item.file_path.parent().unwrap_or_else(|| Path::new("."));
        if is_playlist {
            Some((url, dir.join(PLAYLIST_COVER_NAME), CoverFormat::Jpeg))
        } else {
            let format = self.config.album_cover_format;
            Some((url, dir.join(format!("cover.{}", format.extension())), format))
        }
    }

    /// Which embedding route applies to `container`.
    pub fn embed_method(&self, container: &Container) -> EmbedMethod {
        let has_editor = self.tag_editor.is_some();
        if self.config.compatibility_mode && has_editor {
            return EmbedMethod::TagLibrary;
        }
        match container {
            Container::Wav => EmbedMethod::Skip,
            Container::Ogg if has_editor => EmbedMethod::VorbisPicture,
            Container::Ogg => EmbedMethod::Skip,
            _ => EmbedMethod::Tool,
        }
    }

    /// Tool arguments that mux `image` in as an attached picture.
    pub fn build_tool_args(image: &Path, container: &Container) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-i".to_string(),
            image.to_string_lossy().to_string(),
            "-map".to_string(),
            "0:a".to_string(),
            "-map".to_string(),
            "1:v".to_string(),
            "-c".to_string(),
            "copy".to_string(),
            "-disposition:v:0".to_string(),
            "attached_pic".to_string(),
            "-metadata:s:v".to_string(),
            "title=Cover".to_string(),
            "-metadata:s:v".to_string(),
            "comment=Cover (front)".to_string(),
        ];
        if *container == Container::Mp3 {
            args.extend(["-id3v2_version".to_string(), "3".to_string()]);
        }
        args
    }

    async fn ensure_cover(
        &self,
        url: &str,
        path: &Path,
        format: CoverFormat,
    ) -> Result<(), PostProcessError> {
        if fs::try_exists(path).await.unwrap_or(false) {
            tracing::debug!("Cover already present at {}", path.display());
            return Ok(());
        }

        tracing::info!("Fetching cover from {}", url);
        let raw = self.fetcher.fetch(url).await?;
        let encoded = encode_cover(&raw, format)?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        if let Err(e) = write_then_rename(&tmp, path, &encoded).await {
            let _ = remove_if_exists(&tmp).await;
            return Err(e.into());
        }
        tracing::info!("Saved cover image {}", path.display());
        Ok(())
    }

    /// Registers a worker on `path` and returns the lock guarding its fetch.
    async fn acquire_cover(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut covers = self.covers.lock().await;
        let slot = covers.entry(path.to_path_buf()).or_default();
        slot.holders += 1;
        slot.fetch.clone()
    }

    /// Drops a worker's lease on `path`, removing the file after the last one
    /// unless covers are kept.
    ///
    /// The map lock is held through the removal, so a worker arriving now
    /// either keeps the file alive or fetches it again afterwards.
    async fn release_cover(&self, path: &Path) {
        let mut covers = self.covers.lock().await;
        let Some(slot) = covers.get_mut(path) else {
            return;
        };
        slot.holders = slot.holders.saturating_sub(1);
        if slot.holders > 0 {
            return;
        }
        covers.remove(path);

        if !self.config.save_album_cover {
            if let Err(e) = remove_if_exists(path).await {
                tracing::warn!("Failed to remove cover {}: {}", path.display(), e);
            }
        }
    }

    async fn fetch_and_embed(
        &self,
        item: &Item,
        url: &str,
        image_path: &Path,
        format: CoverFormat,
        fetch_lock: &Mutex<()>,
    ) -> Result<(), PostProcessError> {
        {
            let _guard = fetch_lock.lock().await;
            self.ensure_cover(url, image_path, format).await?;
        }

        if !self.raw_media && self.config.embed_cover {
            self.embed(item, image_path, format).await
        } else {
            Ok(())
        }
    }

    async fn embed(
        &self,
        item: &Item,
        image: &Path,
        format: CoverFormat,
    ) -> Result<(), PostProcessError> {
        let container = item.container();

        match self.embed_method(&container) {
            EmbedMethod::Tool => {
                let args = Self::build_tool_args(image, &container);
                rewrite_with_tool(&self.runner, &item.file_path, args).await
            }
            EmbedMethod::TagLibrary => {
                let data = fs::read(image).await?;
                let value = TagValue::Picture {
                    data,
                    mime: format.mime().to_string(),
                };
                self.write_tag(&item.file_path, ARTWORK_FIELD, value).await
            }
            EmbedMethod::VorbisPicture => {
                let data = fs::read(image).await?;
                let comment = encode_picture_comment(&data, format.mime());
                self.write_tag(&item.file_path, PICTURE_BLOCK_FIELD, TagValue::Text(vec![comment]))
                    .await
            }
            EmbedMethod::Skip => {
                if container == Container::Ogg {
                    tracing::warn!(
                        "No tag editor configured, not embedding cover in {}",
                        item.file_path.display()
                    );
                }
                Ok(())
            }
        }
    }

    async fn write_tag(
        &self,
        path: &Path,
        field: &'static str,
        value: TagValue,
    ) -> Result<(), PostProcessError> {
        let Some(editor) = self.tag_editor.clone() else {
            return Ok(());
        };
        let path = path.to_path_buf();

        tokio::task::spawn_blocking(move || {
            let mut tags = editor.load(&path)?;
            tags.set(field, value)?;
            tags.save()
        })
        .await
        .map_err(|e| TagError::Task(e.to_string()))??;

        Ok(())
    }
}

#[async_trait]
impl Stage for ThumbnailStage {
    fn name(&self) -> &str {
        "thumbnail"
    }

    async fn apply(&self, item: &Item, metadata: &ItemMetadata) -> Result<(), PostProcessError> {
        let Some((url, image_path, format)) = self.cover_source(item, metadata) else {
            tracing::debug!("No cover url for {}", item.item_id);
            return Ok(());
        };

        let fetch_lock = self.acquire_cover(&image_path).await;
        let result = self
            .fetch_and_embed(item, &url, &image_path, format, &fetch_lock)
            .await;
        self.release_cover(&image_path).await;

        result
    }
}

async fn write_then_rename(tmp: &Path, path: &Path, data: &[u8]) -> std::io::Result<()> {
    fs::write(tmp, data).await?;
    fs::rename(tmp, path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockCoverFetcher, MockTagEditor, MockToolExecutor};
    use crate::tool::ToolConfig;
    use tempfile::TempDir;

    struct Harness {
        dir: TempDir,
        tool: Arc<MockToolExecutor>,
        fetcher: Arc<MockCoverFetcher>,
        editor: Arc<MockTagEditor>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
                tool: Arc::new(MockToolExecutor::new()),
                fetcher: Arc::new(MockCoverFetcher::new()),
                editor: Arc::new(MockTagEditor::new()),
            }
        }

        fn stage(&self, config: ThumbnailConfig, with_editor: bool) -> ThumbnailStage {
            let runner = ToolRunner::new(ToolConfig::default(), self.tool.clone());
            let stage = ThumbnailStage::new(runner, config, self.fetcher.clone());
            if with_editor {
                stage.with_tag_editor(self.editor.clone())
            } else {
                stage
            }
        }

        fn file(&self, name: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            std::fs::write(&path, b"audio").unwrap();
            path
        }
    }

    fn metadata() -> ItemMetadata {
        ItemMetadata {
            image_url: Some("https://img.example/album.png".to_string()),
            playlist_image_url: Some("https://img.example/playlist.png".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_tool_args_mp3_adds_id3_version() {
        let args = ThumbnailStage::build_tool_args(Path::new("/m/cover.jpeg"), &Container::Mp3);
        assert_eq!(&args[..2], &["-i", "/m/cover.jpeg"]);
        assert!(args.contains(&"attached_pic".to_string()));
        assert_eq!(&args[args.len() - 2..], &["-id3v2_version", "3"]);

        let flac = ThumbnailStage::build_tool_args(Path::new("/m/cover.jpeg"), &Container::Flac);
        assert_eq!(flac.last().map(String::as_str), Some("comment=Cover (front)"));
    }

    #[test]
    fn test_embed_method_routing() {
        let h = Harness::new();
        let plain = h.stage(ThumbnailConfig::default(), false);
        assert_eq!(plain.embed_method(&Container::Mp3), EmbedMethod::Tool);
        assert_eq!(plain.embed_method(&Container::Wav), EmbedMethod::Skip);
        assert_eq!(plain.embed_method(&Container::Ogg), EmbedMethod::Skip);

        let with_editor = h.stage(ThumbnailConfig::default(), true);
        assert_eq!(with_editor.embed_method(&Container::Ogg), EmbedMethod::VorbisPicture);

        let compat = h.stage(
            ThumbnailConfig {
                compatibility_mode: true,
                ..Default::default()
            },
            true,
        );
        assert_eq!(compat.embed_method(&Container::Wav), EmbedMethod::TagLibrary);

        let compat_no_editor = h.stage(
            ThumbnailConfig {
                compatibility_mode: true,
                ..Default::default()
            },
            false,
        );
        assert_eq!(compat_no_editor.embed_method(&Container::M4a), EmbedMethod::Tool);
    }

    #[tokio::test]
    async fn test_no_url_is_noop() {
        let h = Harness::new();
        let path = h.file("a.mp3");
        let item = fixtures::track_item("t1", path.to_str().unwrap());

        h.stage(ThumbnailConfig::default(), false)
            .apply(&item, &ItemMetadata::default())
            .await
            .unwrap();

        assert_eq!(h.fetcher.fetch_count().await, 0);
        assert_eq!(h.tool.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_album_cover_fetched_embedded_and_removed() {
        let h = Harness::new();
        let path = h.file("a.flac");
        let item = fixtures::track_item("t1", path.to_str().unwrap());

        h.stage(ThumbnailConfig::default(), false)
            .apply(&item, &metadata())
            .await
            .unwrap();

        assert_eq!(
            h.fetcher.fetched_urls().await,
            vec!["https://img.example/album.png".to_string()]
        );
        let calls = h.tool.recorded_calls().await;
        assert_eq!(calls.len(), 1);
        let cover = h.dir.path().join("cover.jpeg").display().to_string();
        assert!(calls[0].args.contains(&cover));
        assert!(!h.dir.path().join("cover.jpeg").exists());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_playlist_cover_reused_and_kept() {
        let h = Harness::new();
        let path = h.file("a.m4a");
        let item = fixtures::playlist_item("t1", path.to_str().unwrap(), "Road Trip", "dj", Some(1));
        let config = ThumbnailConfig {
            save_album_cover: true,
            ..Default::default()
        };
        std::fs::write(h.dir.path().join(PLAYLIST_COVER_NAME), fixtures::cover_png(1, 1)).unwrap();

        h.stage(config, false).apply(&item, &metadata()).await.unwrap();

        assert_eq!(h.fetcher.fetch_count().await, 0);
        assert_eq!(h.tool.call_count().await, 1);
        assert!(h.dir.path().join(PLAYLIST_COVER_NAME).exists());
    }

    #[tokio::test]
    async fn test_ogg_written_as_picture_block() {
        let h = Harness::new();
        let path = h.file("a.ogg");
        let item = fixtures::track_item("t1", path.to_str().unwrap());

        h.stage(ThumbnailConfig::default(), true)
            .apply(&item, &metadata())
            .await
            .unwrap();

        assert_eq!(h.tool.call_count().await, 0);
        let writes = h.editor.recorded_writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].path, path);
        assert_eq!(writes[0].field, PICTURE_BLOCK_FIELD);
        assert!(matches!(writes[0].value, TagValue::Text(ref v) if v.len() == 1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_shared_playlist_cover_outlives_concurrent_embeds() {
        let h = Harness::new();
        h.tool.set_delay(std::time::Duration::from_millis(50)).await;
        h.tool.set_check_inputs(true).await;
        let stage = Arc::new(h.stage(ThumbnailConfig::default(), false));

        let tasks: Vec<_> = ["a.mp3", "b.mp3", "c.mp3"]
            .into_iter()
            .enumerate()
            .map(|(n, name)| {
                let path = h.file(name);
                let item = fixtures::playlist_item(
                    &format!("t{}", n),
                    path.to_str().unwrap(),
                    "Road Trip",
                    "dj",
                    Some(n as u32 + 1),
                );
                let stage = stage.clone();
                tokio::spawn(async move {
                    let result = stage.apply(&item, &metadata()).await;
                    (path, result)
                })
            })
            .collect();

        for task in tasks {
            let (path, result) = task.await.unwrap();
            assert!(result.is_ok(), "{}: {:?}", path.display(), result);
            assert!(path.exists());
        }

        assert!(h.fetcher.fetch_count().await >= 1);
        assert_eq!(h.tool.call_count().await, 3);
        assert!(!h.dir.path().join(PLAYLIST_COVER_NAME).exists());
        assert!(!h.dir.path().join("cover.jpg.tmp").exists());
    }

    #[tokio::test]
    async fn test_failed_fetch_releases_cover_lease() {
        let h = Harness::new();
        let path = h.file("a.mp3");
        let item = fixtures::track_item("t1", path.to_str().unwrap());
        let stage = h.stage(ThumbnailConfig::default(), false);

        h.fetcher
            .set_next_error(crate::stage::FetchError::Status {
                url: "https://img.example/album.png".to_string(),
                status: 503,
            })
            .await;
        assert!(stage.apply(&item, &metadata()).await.is_err());
        assert!(stage.covers.lock().await.is_empty());

        stage.apply(&item, &metadata()).await.unwrap();
        assert_eq!(h.fetcher.fetch_count().await, 2);
        assert!(!h.dir.path().join("cover.jpeg").exists());
    }

    #[tokio::test]
    async fn test_raw_media_fetches_without_embedding() {
        let h = Harness::new();
        let path = h.file("a.mp3");
        let item = fixtures::track_item("t1", path.to_str().unwrap());

        h.stage(ThumbnailConfig::default(), true)
            .with_raw_media(true)
            .apply(&item, &metadata())
            .await
            .unwrap();

        assert_eq!(h.fetcher.fetch_count().await, 1);
        assert_eq!(h.tool.call_count().await, 0);
        assert!(h.editor.recorded_writes().is_empty());
    }
}
