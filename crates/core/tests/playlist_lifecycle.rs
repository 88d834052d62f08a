//! Playlist lifecycle integration tests.
//!
//! These tests drive the post-processor with a mock tool and cover fetcher:
//! - The manifest is written only once every queued member is downloaded
//! - Entries are ordered by playlist number, unnumbered last
//! - The completion cache is deleted after the write
//! - Concurrent completions write exactly one manifest
//! - Recovery writes playlists left behind by a previous run

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use finisher_core::{
    playlist::{PlaylistCompletionCache, PlaylistConfig, PlaylistManifestWriter},
    testing::{fixtures, MockCoverFetcher, MockToolExecutor},
    Config, Item, ItemMetadata, ItemStatus, PlaylistKey, PostProcessor, SharedQueue,
};

/// Test helper wiring a post-processor to temp directories and mocks.
struct TestHarness {
    processor: Arc<PostProcessor>,
    queue: Arc<SharedQueue>,
    tool: Arc<MockToolExecutor>,
    config: Config,
    music_dir: PathBuf,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let music_dir = temp_dir.path().join("downloads/Road Trip");
        std::fs::create_dir_all(&music_dir).expect("Failed to create music dir");

        let mut config = Config::default();
        config.playlist = PlaylistConfig::default().with_roots(
            temp_dir.path().join("cache"),
            temp_dir.path().join("downloads"),
        );

        let queue = Arc::new(SharedQueue::new());
        let tool = Arc::new(MockToolExecutor::new());
        let processor = PostProcessor::from_config(
            &config,
            queue.clone(),
            tool.clone(),
            Arc::new(MockCoverFetcher::new()),
            None,
        );

        Self {
            processor: Arc::new(processor),
            queue,
            tool,
            config,
            music_dir,
            _temp_dir: temp_dir,
        }
    }

    fn enqueue(&self, item_id: &str, number: Option<u32>) -> (String, Item) {
        let path = self.music_dir.join(format!("{}.ogg", item_id));
        std::fs::write(&path, b"ogg audio").expect("Failed to create media file");

        let item = fixtures::playlist_item(
            item_id,
            path.to_str().unwrap(),
            "Road Trip",
            "dj",
            number,
        );
        (self.queue.insert(item.clone()), item)
    }

    fn key() -> PlaylistKey {
        PlaylistKey::new("Road Trip", "dj")
    }

    fn manifest_path(&self) -> PathBuf {
        self.processor.manifest().manifest_path(&Self::key())
    }

    fn cache_path(&self) -> PathBuf {
        self.processor.manifest().cache().path_for(&Self::key())
    }
}

fn metadata(title: &str, length: Option<u64>) -> ItemMetadata {
    ItemMetadata {
        title: Some(title.to_string()),
        artists: vec!["Band".to_string()],
        length,
        ..Default::default()
    }
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).expect("Failed to read manifest")
}

#[tokio::test]
async fn test_road_trip_manifest_written_after_last_item() {
    let h = TestHarness::new();
    let (id_a, item_a) = h.enqueue("a", Some(2));
    let (id_b, item_b) = h.enqueue("b", Some(1));
    let (id_c, item_c) = h.enqueue("c", None);

    let outcome = h
        .processor
        .process(&id_a, &metadata("Second", Some(200_400)))
        .await
        .unwrap();
    assert!(!outcome.manifest_written);
    assert!(h.cache_path().exists());
    assert_eq!(
        h.processor
            .manifest()
            .cache()
            .load(&TestHarness::key())
            .await
            .completed_items
            .len(),
        1
    );

    let outcome = h
        .processor
        .process(&id_c, &metadata("Bonus", None))
        .await
        .unwrap();
    assert!(!outcome.manifest_written);
    assert!(!h.manifest_path().exists());
    let cached = h.processor.manifest().cache().load(&TestHarness::key()).await;
    let cached_ids: Vec<&str> = cached
        .completed_items
        .iter()
        .map(|e| e.item_id.as_str())
        .collect();
    assert_eq!(cached_ids, vec!["a", "c"]);

    let outcome = h
        .processor
        .process(&id_b, &metadata("First", Some(183_000)))
        .await
        .unwrap();
    assert!(outcome.manifest_written);

    assert_eq!(
        h.manifest_path(),
        h.config
            .playlist
            .download_root
            .join("Playlists/Road Trip by dj.m3u8")
    );
    let expected = format!(
        "#EXTM3U\n\
         #EXTINF:183, 1. Band - First\n{}\n\
         #EXTINF:200, 2. Band - Second\n{}\n\
         #EXTINF:-1, . Band - Bonus\n{}\n",
        item_b.file_path.display(),
        item_a.file_path.display(),
        item_c.file_path.display(),
    );
    assert_eq!(read(&h.manifest_path()), expected);
    assert!(!h.cache_path().exists());

    for id in [&id_a, &id_b, &id_c] {
        assert_eq!(h.queue.get(id).unwrap().item_status, ItemStatus::Downloaded);
    }
    // conversion and embed per item, no cover url
    assert_eq!(h.tool.call_count().await, 6);
}

#[tokio::test(start_paused = true)]
async fn test_failed_member_blocks_manifest() {
    let h = TestHarness::new();
    let (id_a, _) = h.enqueue("a", Some(1));
    let (id_b, _) = h.enqueue("b", Some(2));

    h.processor
        .process(&id_a, &metadata("One", Some(1_000)))
        .await
        .unwrap();

    h.tool.push_exit_codes([1, 1, 1]).await;
    let result = h.processor.process(&id_b, &metadata("Two", Some(1_000))).await;

    assert!(result.is_err());
    assert_eq!(h.queue.get(&id_b).unwrap().item_status, ItemStatus::Failed);
    assert!(!h.manifest_path().exists());
    assert!(h.cache_path().exists());
}

#[tokio::test]
async fn test_removed_member_no_longer_counted() {
    let h = TestHarness::new();
    let (id_a, _) = h.enqueue("a", Some(1));
    let (id_b, _) = h.enqueue("b", Some(2));

    h.processor
        .process(&id_a, &metadata("One", Some(1_000)))
        .await
        .unwrap();
    assert!(!h.manifest_path().exists());

    h.queue.remove(&id_b);
    assert!(h
        .processor
        .manifest()
        .on_item_completed(&TestHarness::key(), h.queue.as_ref())
        .await);
    assert!(read(&h.manifest_path()).contains("1. Band - One"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_completion_writes_once() {
    let h = TestHarness::new();
    let ids: Vec<String> = (1..=6)
        .map(|n| h.enqueue(&format!("t{}", n), Some(n)).0)
        .collect();

    let tasks: Vec<_> = ids
        .iter()
        .map(|id| {
            let processor = h.processor.clone();
            let id = id.clone();
            tokio::spawn(async move {
                processor
                    .process(&id, &metadata(&id, Some(60_000)))
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut written = 0;
    for task in tasks {
        if task.await.unwrap().manifest_written {
            written += 1;
        }
    }

    assert_eq!(written, 1);
    let manifest = read(&h.manifest_path());
    assert_eq!(manifest.matches("#EXTINF").count(), 6);
    assert!(!h.cache_path().exists());
}

#[tokio::test]
async fn test_recovery_writes_complete_cached_playlist() {
    let temp_dir = TempDir::new().unwrap();
    let config = PlaylistConfig::default().with_roots(
        temp_dir.path().join("cache"),
        temp_dir.path().join("downloads"),
    );
    let cache = Arc::new(PlaylistCompletionCache::from_config(&config));

    // Left behind by a run that stopped before writing the manifest.
    for n in 1..=2u32 {
        let mut item = fixtures::playlist_item(
            &format!("t{}", n),
            &format!("/music/t{}.ogg", n),
            "Road Trip",
            "dj",
            Some(n),
        );
        item.playlist_total = Some(2);
        cache.record_completion(&item, &metadata("Song", Some(1_000))).await;
    }
    let partial = fixtures::playlist_item("x", "/music/x.ogg", "Unfinished", "dj", Some(1));
    cache.record_completion(&partial, &ItemMetadata::default()).await;

    let writer = PlaylistManifestWriter::new(config, cache.clone());
    let written = writer.recover_all(&SharedQueue::new()).await;

    assert_eq!(written, vec![TestHarness::key()]);
    assert!(writer.manifest_path(&TestHarness::key()).exists());
    assert_eq!(cache.list().await.len(), 1);
}
