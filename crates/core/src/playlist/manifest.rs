//! Emits the playlist manifest once every item has finished.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;

use crate::item::PlaylistKey;
use crate::metrics;
use crate::queue::ItemQueue;
use crate::swap::remove_if_exists;

use super::cache::{CacheEntry, PlaylistCompletionCache};
use super::config::PlaylistConfig;
use super::error::ManifestError;
use super::template::{render, sanitize, title_case};

/// Writes `path` through a sibling temp file so readers never see a partial
/// manifest. The temp file is removed on failure.
async fn write_atomic(path: &Path, body: &[u8]) -> Result<(), ManifestError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    if let Err(e) = fs::write(&tmp, body).await {
        let _ = remove_if_exists(&tmp).await;
        return Err(ManifestError::io(&tmp, e));
    }
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = remove_if_exists(&tmp).await;
        return Err(ManifestError::io(path, e));
    }
    Ok(())
}

/// Sort key for entries without a playlist number.
pub const UNNUMBERED: u32 = u32::MAX;

/// Watches playlist completion and writes `#EXTM3U` manifests.
#[derive(Debug)]
pub struct PlaylistManifestWriter {
    config: PlaylistConfig,
    cache: Arc<PlaylistCompletionCache>,
    /// Serializes load, write and cache deletion.
    emit_lock: Mutex<()>,
}

impl PlaylistManifestWriter {
    pub fn new(config: PlaylistConfig, cache: Arc<PlaylistCompletionCache>) -> Self {
        Self {
            config,
            cache,
            emit_lock: Mutex::new(()),
        }
    }

    pub fn cache(&self) -> &Arc<PlaylistCompletionCache> {
        &self.cache
    }

    /// Writes the manifest if the playlist is complete. Errors are logged and
    /// reported as `false`.
    pub async fn on_item_completed(&self, key: &PlaylistKey, queue: &dyn ItemQueue) -> bool {
        match self.check_and_write(key, queue).await {
            Ok(written) => written,
            Err(e) => {
                tracing::error!("Failed to write manifest for playlist {}: {}", key, e);
                false
            }
        }
    }

    /// Counts the playlist's queued items and writes the manifest when all of
    /// them are downloaded.
    pub async fn check_and_write(
        &self,
        key: &PlaylistKey,
        queue: &dyn ItemQueue,
    ) -> Result<bool, ManifestError> {
        if key.name.is_empty() {
            return Ok(false);
        }

        let entries = queue.playlist_snapshot(key);
        let total = entries.len();
        let completed = entries.iter().filter(|e| e.status.is_downloaded()).count();

        tracing::info!(
            "Playlist {} status: {}/{} complete",
            key,
            completed,
            total
        );

        if total == 0 || completed != total {
            let pending: Vec<String> = entries
                .iter()
                .filter(|e| !e.status.is_downloaded())
                .map(|e| format!("{} ({})", e.item_id, e.status))
                .collect();
            tracing::info!(
                "Playlist {} not yet complete, pending: [{}]",
                key,
                pending.join(", ")
            );
            return Ok(false);
        }

        self.write_from_cache(key).await
    }

    /// Writes the manifest from the cached record and deletes the record.
    ///
    /// Returns `false` when the record is empty, which is also what a second
    /// caller racing on the same playlist sees.
    pub async fn write_from_cache(&self, key: &PlaylistKey) -> Result<bool, ManifestError> {
        let _guard = self.emit_lock.lock().await;

        let record = self.cache.load(key).await;
        if record.completed_items.is_empty() {
            tracing::warn!("No completed items cached for playlist {}", key);
            return Ok(false);
        }

        let path = self.manifest_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ManifestError::io(parent, e))?;
        }

        let body = self.render_manifest(key, &record.completed_items);
        write_atomic(&path, body.as_bytes()).await?;

        metrics::MANIFESTS_WRITTEN.inc();
        tracing::info!(
            "Manifest written: {} ({} tracks)",
            path.display(),
            record.completed_items.len()
        );

        self.cache.clear(key).await;
        Ok(true)
    }

    /// Writes every cached playlist that can be completed.
    ///
    /// A record whose expected total is already met is written without
    /// consulting the queue; the rest go through the normal queue check.
    pub async fn recover_all(&self, queue: &dyn ItemQueue) -> Vec<PlaylistKey> {
        let mut written = Vec::new();

        for (path, record) in self.cache.list().await {
            let Some(key) = record.key() else {
                tracing::warn!("Skipping playlist cache {} without a playlist name", path.display());
                continue;
            };

            tracing::info!("Force writing manifest for cached playlist {}", key);
            let result = if record.is_complete() {
                self.write_from_cache(&key).await
            } else {
                self.check_and_write(&key, queue).await
            };

            match result {
                Ok(true) => written.push(key),
                Ok(false) => {}
                Err(e) => tracing::error!("Failed to process playlist cache {}: {}", path.display(), e),
            }
        }

        written
    }

    /// Manifest location for `key`.
    pub fn manifest_path(&self, key: &PlaylistKey) -> PathBuf {
        let replacement = &self.config.illegal_character_replacement;
        let name = sanitize(&key.name, replacement);
        let owner = sanitize(&key.by, replacement);

        let relative = render(&self.config.m3u_path_formatter, |field| match field {
            "playlist_name" => Some(name.clone()),
            "playlist_owner" => Some(owner.clone()),
            _ => None,
        });

        self.config
            .download_root
            .join(format!("{}.{}", relative, self.config.m3u_format))
    }

    /// Full manifest text for `entries`, sorted by playlist number.
    pub fn render_manifest(&self, key: &PlaylistKey, entries: &[CacheEntry]) -> String {
        let mut sorted = entries.to_vec();
        sort_entries(&mut sorted);

        let mut out = String::from("#EXTM3U\n");
        for entry in &sorted {
            out.push_str(&format!(
                "#EXTINF:{}, {}\n{}\n",
                extinf_seconds(entry.metadata.length),
                self.display_label(key, entry),
                entry.file_path.display()
            ));
        }
        out
    }

    /// The `#EXTINF` display string for one entry.
    pub fn display_label(&self, key: &PlaylistKey, entry: &CacheEntry) -> String {
        let meta = &entry.metadata;
        let sep = &self.config.metadata_separator;
        let pad = |n: u32| {
            if self.config.use_double_digit_path_numbers {
                format!("{:02}", n)
            } else {
                n.to_string()
            }
        };
        let text = |v: &Option<String>| v.clone().unwrap_or_default();

        let label = render(&self.config.extinf_label, |field| {
            let value = match field {
                "service" => title_case(&entry.item_service),
                "service_id" => entry.item_id.clone(),
                "artist" => meta.artists.join(sep),
                "album" => text(&meta.album_name),
                "album_artist" => meta.album_artists.join(sep),
                "album_type" => title_case(meta.album_type.as_deref().unwrap_or("single")),
                "name" => text(&meta.title),
                "year" => text(&meta.release_year),
                "disc_number" => pad(meta.disc_number.unwrap_or(1)),
                "track_number" => pad(meta.track_number.unwrap_or(1)),
                "genre" => meta.genre.join(sep),
                "label" => text(&meta.label),
                "explicit" => {
                    if meta.explicit == Some(true) {
                        self.config.explicit_label.clone()
                    } else {
                        String::new()
                    }
                }
                "trackcount" => pad(meta.total_tracks.unwrap_or(1)),
                "disccount" => pad(meta.total_discs.unwrap_or(1)),
                "isrc" => text(&meta.isrc),
                "playlist_name" => key.name.clone(),
                "playlist_owner" => key.by.clone(),
                "playlist_number" => entry
                    .playlist_number
                    .map(|n| n.to_string())
                    .unwrap_or_default(),
                _ => return None,
            };
            Some(value)
        });

        if sep.is_empty() || *sep == self.config.extinf_separator {
            label
        } else {
            label.replace(sep.as_str(), &self.config.extinf_separator)
        }
    }

    pub fn config(&self) -> &PlaylistConfig {
        &self.config
    }
}

/// Stable ascending sort by playlist number; unnumbered entries go last.
/// A number of zero counts as unnumbered.
pub fn sort_entries(entries: &mut [CacheEntry]) {
    entries.sort_by_key(|e| e.playlist_number.filter(|n| *n > 0).unwrap_or(UNNUMBERED));
}

/// Whole seconds for `#EXTINF`, `-1` when the length is unknown.
pub fn extinf_seconds(length_ms: Option<u64>) -> i64 {
    match length_ms {
        Some(ms) => (ms as f64 / 1000.0).round_ties_even() as i64,
        None => -1,
    }
}
