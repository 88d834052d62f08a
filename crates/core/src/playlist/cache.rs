//! Durable per-playlist record of finished items.
//!
//! One JSON file per `(playlist_name, playlist_by)` lives in the cache
//! directory. Records are read-modify-written under a process-local lock and
//! replaced through a temp file, so a crash mid-write leaves the previous
//! record intact. Persistence failures are logged and swallowed.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

use crate::item::{Item, ItemMetadata, PlaylistKey};
use crate::metrics;
use crate::swap::remove_if_exists;

use super::config::PlaylistConfig;
use super::template::sanitize;

const FILE_PREFIX: &str = "playlist_cache_";
const FILE_SUFFIX: &str = ".json";

/// The subset of metadata the manifest needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachedMetadata {
    #[serde(deserialize_with = "lenient_u64")]
    pub length: Option<u64>,
    pub title: Option<String>,
    #[serde(deserialize_with = "string_or_list")]
    pub artists: Vec<String>,
    pub album_name: Option<String>,
    #[serde(deserialize_with = "string_or_list")]
    pub album_artists: Vec<String>,
    pub album_type: Option<String>,
    pub release_year: Option<String>,
    pub disc_number: Option<u32>,
    pub track_number: Option<u32>,
    #[serde(deserialize_with = "string_or_list")]
    pub genre: Vec<String>,
    pub label: Option<String>,
    pub explicit: Option<bool>,
    pub total_tracks: Option<u32>,
    pub total_discs: Option<u32>,
    pub isrc: Option<String>,
}

impl From<&ItemMetadata> for CachedMetadata {
    fn from(metadata: &ItemMetadata) -> Self {
        Self {
            length: metadata.length,
            title: metadata.title.clone(),
            artists: metadata.artists.clone(),
            album_name: metadata.album_name.clone(),
            album_artists: metadata.album_artists.clone(),
            album_type: metadata.album_type.clone(),
            release_year: metadata.release_year.clone(),
            disc_number: metadata.disc_number,
            track_number: metadata.track_number,
            genre: metadata.genre.clone(),
            label: metadata.label.clone(),
            explicit: metadata.explicit,
            total_tracks: metadata.total_tracks,
            total_discs: metadata.total_discs,
            isrc: metadata.isrc.clone(),
        }
    }
}

/// One finished item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub item_id: String,
    pub file_path: PathBuf,
    #[serde(default)]
    pub playlist_number: Option<u32>,
    #[serde(default)]
    pub metadata: CachedMetadata,
    #[serde(default)]
    pub item_service: String,
}

impl CacheEntry {
    pub fn new(item: &Item, metadata: &ItemMetadata) -> Self {
        Self {
            item_id: item.item_id.clone(),
            file_path: item.file_path.clone(),
            playlist_number: item.playlist_number,
            metadata: CachedMetadata::from(metadata),
            item_service: item.item_service.clone(),
        }
    }
}

/// Persisted state of one playlist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    #[serde(default)]
    pub playlist_name: Option<String>,
    #[serde(default)]
    pub playlist_by: Option<String>,
    /// Insertion ordered. No two entries share an `item_id`.
    #[serde(default)]
    pub completed_items: Vec<CacheEntry>,
    #[serde(default)]
    pub total_expected: Option<u32>,
}

impl CacheRecord {
    /// Replaces any entry with the same `item_id` and appends `entry`.
    pub fn upsert(&mut self, entry: CacheEntry) {
        self.completed_items.retain(|e| e.item_id != entry.item_id);
        self.completed_items.push(entry);
    }

    /// Playlist the record belongs to, if it names one.
    pub fn key(&self) -> Option<PlaylistKey> {
        let name = self.playlist_name.as_deref().filter(|n| !n.is_empty())?;
        Some(PlaylistKey::new(
            name,
            self.playlist_by.clone().unwrap_or_default(),
        ))
    }

    /// Whether every expected item has been recorded.
    pub fn is_complete(&self) -> bool {
        match self.total_expected {
            Some(total) if total > 0 => self.completed_items.len() >= total as usize,
            _ => false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CacheError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid cache record {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// File-backed completion cache.
#[derive(Debug)]
pub struct PlaylistCompletionCache {
    dir: PathBuf,
    replacement: String,
    lock: Mutex<()>,
}

impl PlaylistCompletionCache {
    pub fn new(dir: impl Into<PathBuf>, illegal_character_replacement: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            replacement: illegal_character_replacement.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &PlaylistConfig) -> Self {
        Self::new(&config.cache_dir, &config.illegal_character_replacement)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Record file for `key`.
    pub fn path_for(&self, key: &PlaylistKey) -> PathBuf {
        let safe = sanitize(&format!("{}_{}", key.name, key.by), &self.replacement);
        self.dir.join(format!("{}{}{}", FILE_PREFIX, safe, FILE_SUFFIX))
    }

    /// Loads the record for `key`. Missing or corrupt records load as empty.
    pub async fn load(&self, key: &PlaylistKey) -> CacheRecord {
        let path = self.path_for(key);
        match read_record(&path).await {
            Ok(Some(record)) => record,
            Ok(None) => CacheRecord::default(),
            Err(e) => {
                tracing::error!("Failed to load playlist cache: {}", e);
                CacheRecord::default()
            }
        }
    }

    /// Adds a finished item to its playlist's record.
    ///
    /// Items that were not queued from a named playlist are ignored. Calling
    /// twice with the same `item_id` keeps only the second entry.
    pub async fn record_completion(&self, item: &Item, metadata: &ItemMetadata) {
        let Some(key) = item.playlist_key() else {
            return;
        };

        tracing::info!(
            "Tracking completed playlist item {} for playlist {}",
            item.item_id,
            key
        );

        let _guard = self.lock.lock().await;
        let path = self.path_for(&key);

        let mut record = match read_record(&path).await {
            Ok(record) => record.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Discarding unreadable playlist cache: {}", e);
                CacheRecord::default()
            }
        };
        record.playlist_name = Some(key.name.clone());
        record.playlist_by = Some(key.by.clone());
        if item.playlist_total.is_some() {
            record.total_expected = item.playlist_total;
        }
        record.upsert(CacheEntry::new(item, metadata));

        if let Err(e) = write_record(&self.dir, &path, &record).await {
            metrics::CACHE_WRITE_FAILURES.inc();
            tracing::error!("Failed to save playlist cache: {}", e);
        }
    }

    /// Deletes the record for `key`.
    pub async fn clear(&self, key: &PlaylistKey) {
        let _guard = self.lock.lock().await;
        let path = self.path_for(key);
        match remove_if_exists(&path).await {
            Ok(()) => tracing::debug!("Removed playlist cache {}", path.display()),
            Err(e) => tracing::error!("Failed to remove playlist cache {}: {}", path.display(), e),
        }
    }

    /// Every readable record in the cache directory, sorted by file name.
    pub async fn list(&self) -> Vec<(PathBuf, CacheRecord)> {
        let mut paths = Vec::new();
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::error!("Failed to list playlist caches in {}: {}", self.dir.display(), e);
                return Vec::new();
            }
        };

        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    if name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX) {
                        paths.push(entry.path());
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("Failed to read cache directory entry: {}", e);
                    break;
                }
            }
        }
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            match read_record(&path).await {
                Ok(Some(record)) => records.push((path, record)),
                Ok(None) => {}
                Err(e) => tracing::error!("Failed to process playlist cache: {}", e),
            }
        }
        records
    }
}

async fn read_record(path: &Path) -> Result<Option<CacheRecord>, CacheError> {
    let data = match fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(CacheError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_slice(&data)
        .map(Some)
        .map_err(|source| CacheError::Json {
            path: path.to_path_buf(),
            source,
        })
}

async fn write_record(dir: &Path, path: &Path, record: &CacheRecord) -> Result<(), CacheError> {
    let io_err = |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    };

    fs::create_dir_all(dir).await.map_err(io_err)?;
    let json = serde_json::to_vec_pretty(record).map_err(|source| CacheError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).await.map_err(io_err)?;
    fs::rename(&tmp, path).await.map_err(io_err)?;
    Ok(())
}

/// Accepts either a list of strings or a single (possibly empty) string.
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(s)) if s.is_empty() => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
        None => Vec::new(),
    })
}

/// Accepts a number or a numeric string. Anything else reads as unknown.
fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
