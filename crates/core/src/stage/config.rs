//! Configuration for the conversion, embed and thumbnail stages.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::item::Container;

/// Settings for [`ConversionStage`](super::ConversionStage).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Re-encode at `file_bitrate` even when the container is unchanged.
    #[serde(default)]
    pub use_custom_file_bitrate: bool,

    #[serde(default = "default_file_bitrate")]
    pub file_bitrate: String,

    /// Sample rate for transcodes. `.opus` always uses 48000.
    #[serde(default = "default_file_hertz")]
    pub file_hertz: u32,

    /// Container each service delivers natively, keyed by service name.
    #[serde(default = "default_native_containers")]
    pub native_containers: BTreeMap<String, Container>,

    /// Native container for services missing from `native_containers`.
    #[serde(default = "default_native_container")]
    pub default_native_container: Container,
}

/// Sample rate forced for Opus output.
pub const OPUS_SAMPLE_RATE: u32 = 48_000;

fn default_file_bitrate() -> String {
    "320k".to_string()
}

fn default_file_hertz() -> u32 {
    44_100
}

fn default_native_container() -> Container {
    Container::Ogg
}

fn default_native_containers() -> BTreeMap<String, Container> {
    [
        ("apple_music", Container::M4a),
        ("bandcamp", Container::Mp3),
        ("deezer", Container::Mp3),
        ("qobuz", Container::Flac),
        ("soundcloud", Container::Mp3),
        ("spotify", Container::Ogg),
        ("tidal", Container::Flac),
        ("youtube_music", Container::M4a),
    ]
    .into_iter()
    .map(|(service, container)| (service.to_string(), container))
    .collect()
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            use_custom_file_bitrate: false,
            file_bitrate: default_file_bitrate(),
            file_hertz: default_file_hertz(),
            native_containers: default_native_containers(),
            default_native_container: default_native_container(),
        }
    }
}

impl ConversionConfig {
    /// The container `service` delivers without transcoding.
    pub fn native_container_for(&self, service: &str) -> &Container {
        self.native_containers
            .get(service)
            .unwrap_or(&self.default_native_container)
    }

    pub fn with_custom_bitrate(mut self, bitrate: impl Into<String>) -> Self {
        self.use_custom_file_bitrate = true;
        self.file_bitrate = bitrate.into();
        self
    }
}

/// Which tag fields the embed stage writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    /// Project comment. Off unless asked for.
    pub branding: bool,
    pub service_id: bool,
    pub artist: bool,
    pub album: bool,
    pub album_artist: bool,
    pub name: bool,
    pub year: bool,
    pub disc_number: bool,
    pub track_number: bool,
    pub genre: bool,
    pub performers: bool,
    pub producers: bool,
    pub writers: bool,
    pub label: bool,
    pub copyright: bool,
    pub description: bool,
    pub language: bool,
    pub isrc: bool,
    pub length: bool,
    pub bpm: bool,
    pub key: bool,
    pub compilation: bool,
    pub url: bool,
    pub lyrics: bool,
    pub explicit: bool,
    pub upc: bool,
    pub time_signature: bool,
    pub acousticness: bool,
    pub danceability: bool,
    pub instrumentalness: bool,
    pub liveness: bool,
    pub loudness: bool,
    pub speechiness: bool,
    pub energy: bool,
    pub valence: bool,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            branding: false,
            ..Self::all(true)
        }
    }
}

impl EmbedConfig {
    /// Every field set to `enabled`, branding included.
    pub fn all(enabled: bool) -> Self {
        Self {
            branding: enabled,
            service_id: enabled,
            artist: enabled,
            album: enabled,
            album_artist: enabled,
            name: enabled,
            year: enabled,
            disc_number: enabled,
            track_number: enabled,
            genre: enabled,
            performers: enabled,
            producers: enabled,
            writers: enabled,
            label: enabled,
            copyright: enabled,
            description: enabled,
            language: enabled,
            isrc: enabled,
            length: enabled,
            bpm: enabled,
            key: enabled,
            compilation: enabled,
            url: enabled,
            lyrics: enabled,
            explicit: enabled,
            upc: enabled,
            time_signature: enabled,
            acousticness: enabled,
            danceability: enabled,
            instrumentalness: enabled,
            liveness: enabled,
            loudness: enabled,
            speechiness: enabled,
            energy: enabled,
            valence: enabled,
        }
    }
}

/// Encoding used for fetched cover art.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverFormat {
    #[default]
    Jpeg,
    Png,
}

impl CoverFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

/// Settings for [`ThumbnailStage`](super::ThumbnailStage).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    #[serde(default = "default_true")]
    pub embed_cover: bool,

    /// Write artwork through the tag library for every container.
    #[serde(default)]
    pub compatibility_mode: bool,

    #[serde(default)]
    pub album_cover_format: CoverFormat,

    /// Keep the fetched cover next to the media file.
    #[serde(default)]
    pub save_album_cover: bool,

    /// Timeout for cover downloads in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_fetch_timeout() -> u64 {
    30
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            embed_cover: true,
            compatibility_mode: false,
            album_cover_format: CoverFormat::default(),
            save_album_cover: false,
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_container_lookup() {
        let config = ConversionConfig::default();
        assert_eq!(config.native_container_for("spotify"), &Container::Ogg);
        assert_eq!(config.native_container_for("deezer"), &Container::Mp3);
        assert_eq!(config.native_container_for("unknown"), &Container::Ogg);
    }

    #[test]
    fn test_embed_defaults_branding_off() {
        let config = EmbedConfig::default();
        assert!(!config.branding);
        assert!(config.artist);
        assert!(config.valence);
    }

    #[test]
    fn test_embed_partial_toml() {
        let config: EmbedConfig = toml::from_str("lyrics = false\nbranding = true").unwrap();
        assert!(!config.lyrics);
        assert!(config.branding);
        assert!(config.name);
    }

    #[test]
    fn test_cover_format_serde() {
        let config: ThumbnailConfig = toml::from_str("album_cover_format = \"png\"").unwrap();
        assert_eq!(config.album_cover_format, CoverFormat::Png);
        assert_eq!(config.album_cover_format.extension(), "png");
        assert!(config.embed_cover);
    }
}
