//! Types describing a downloadable item and its descriptive metadata.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of media an item represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Track,
    PodcastEpisode,
    Movie,
    Episode,
}

/// The collection an item was queued from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentCategory {
    Playlist,
    Album,
    Show,
    /// Queued on its own.
    #[default]
    #[serde(rename = "none")]
    Standalone,
}

/// Lifecycle status of an item in the download queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Queued,
    Downloading,
    PostProcessing,
    Downloaded,
    AlreadyExists,
    Failed,
    Cancelled,
}

impl ItemStatus {
    /// User-visible status string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "Queued",
            Self::Downloading => "Downloading",
            Self::PostProcessing => "Post Processing",
            Self::Downloaded => "Downloaded",
            Self::AlreadyExists => "Already Exists",
            Self::Failed => "Failed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Whether the item's file is finished on disk.
    pub fn is_downloaded(&self) -> bool {
        matches!(self, Self::Downloaded | Self::AlreadyExists)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output container, derived from a file extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Container {
    Mp3,
    M4a,
    Flac,
    Ogg,
    Opus,
    Wav,
    Other(String),
}

impl Container {
    /// Parses an extension, with or without the leading dot.
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "mp3" => Self::Mp3,
            "m4a" => Self::M4a,
            "flac" => Self::Flac,
            "ogg" => Self::Ogg,
            "opus" => Self::Opus,
            "wav" => Self::Wav,
            _ => Self::Other(ext),
        }
    }

    /// Container of the file at `path`, judged by its extension.
    pub fn from_path(path: &Path) -> Self {
        Self::from_extension(
            path.extension()
                .and_then(|e| e.to_str())
                .unwrap_or_default(),
        )
    }

    /// File extension without the dot.
    pub fn extension(&self) -> &str {
        match self {
            Self::Mp3 => "mp3",
            Self::M4a => "m4a",
            Self::Flac => "flac",
            Self::Ogg => "ogg",
            Self::Opus => "opus",
            Self::Wav => "wav",
            Self::Other(ext) => ext,
        }
    }
}

impl From<String> for Container {
    fn from(value: String) -> Self {
        Self::from_extension(&value)
    }
}

impl From<Container> for String {
    fn from(value: Container) -> Self {
        value.extension().to_string()
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Identifies one playlist: its name plus the owner it was published by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlaylistKey {
    pub name: String,
    pub by: String,
}

impl PlaylistKey {
    pub fn new(name: impl Into<String>, by: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            by: by.into(),
        }
    }
}

impl fmt::Display for PlaylistKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' by '{}'", self.name, self.by)
    }
}

/// One downloadable unit in the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Identifier, stable per source service.
    pub item_id: String,
    /// Service the item came from (e.g. "spotify").
    pub item_service: String,
    pub item_type: ItemType,
    #[serde(default)]
    pub parent_category: ParentCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_by: Option<String>,
    /// 1-based position in the playlist. May be sparse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_number: Option<u32>,
    /// Number of items the playlist is expected to hold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_total: Option<u32>,
    /// Absolute path of the media file. Stages rewrite it in place.
    pub file_path: PathBuf,
    #[serde(default)]
    pub item_status: ItemStatus,
}

impl Item {
    /// The playlist this item belongs to, if it was queued from one.
    pub fn playlist_key(&self) -> Option<PlaylistKey> {
        if self.parent_category != ParentCategory::Playlist {
            return None;
        }
        let name = self.playlist_name.as_deref().filter(|n| !n.is_empty())?;
        Some(PlaylistKey::new(
            name,
            self.playlist_by.clone().unwrap_or_default(),
        ))
    }

    /// Container implied by the current file extension.
    pub fn container(&self) -> Container {
        Container::from_path(&self.file_path)
    }

    pub fn is_playlist_member(&self, key: &PlaylistKey) -> bool {
        self.playlist_key().as_ref() == Some(key)
    }
}

/// Descriptive tags for one item. Never mutated once handed to the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemMetadata {
    pub title: Option<String>,
    pub artists: Vec<String>,
    pub album_name: Option<String>,
    pub album_artists: Vec<String>,
    /// "album", "single", "compilation", ...
    pub album_type: Option<String>,
    pub release_year: Option<String>,
    pub disc_number: Option<u32>,
    pub total_discs: Option<u32>,
    pub track_number: Option<u32>,
    pub total_tracks: Option<u32>,
    pub explicit: Option<bool>,
    pub genre: Vec<String>,
    pub performers: Vec<String>,
    pub producers: Vec<String>,
    pub writers: Vec<String>,
    pub label: Option<String>,
    pub copyright: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub isrc: Option<String>,
    pub upc: Option<String>,
    pub item_url: Option<String>,
    pub lyrics: Option<String>,
    /// Duration in milliseconds.
    pub length: Option<u64>,
    pub bpm: Option<f64>,
    pub key: Option<String>,
    pub time_signature: Option<u32>,
    pub acousticness: Option<f64>,
    pub danceability: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub liveness: Option<f64>,
    pub loudness: Option<f64>,
    pub speechiness: Option<f64>,
    pub energy: Option<f64>,
    pub valence: Option<f64>,
    pub image_url: Option<String>,
    pub playlist_image_url: Option<String>,
}
