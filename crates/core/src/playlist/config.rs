//! Configuration for playlist tracking and manifest output.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings for the completion cache and the manifest writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistConfig {
    /// Directory holding `playlist_cache_*.json` records.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Root the manifest path is resolved against.
    #[serde(default = "default_download_root")]
    pub download_root: PathBuf,

    /// Manifest path template. Placeholders: `{playlist_name}`, `{playlist_owner}`.
    #[serde(default = "default_m3u_path_formatter")]
    pub m3u_path_formatter: String,

    /// Manifest file extension.
    #[serde(default = "default_m3u_format")]
    pub m3u_format: String,

    /// Display template for `#EXTINF` lines.
    #[serde(default = "default_extinf_label")]
    pub extinf_label: String,

    /// Separator between list values in `#EXTINF` lines.
    #[serde(default = "default_separator")]
    pub extinf_separator: String,

    /// Separator between list values in tags.
    #[serde(default = "default_separator")]
    pub metadata_separator: String,

    /// Text substituted for `{explicit}` on explicit items.
    #[serde(default = "default_explicit_label")]
    pub explicit_label: String,

    /// Zero-pad disc and track numbers to two digits.
    #[serde(default)]
    pub use_double_digit_path_numbers: bool,

    /// Replacement for characters that are illegal in file names.
    #[serde(default = "default_illegal_character_replacement")]
    pub illegal_character_replacement: String,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_download_root() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_m3u_path_formatter() -> String {
    "Playlists/{playlist_name} by {playlist_owner}".to_string()
}

fn default_m3u_format() -> String {
    "m3u8".to_string()
}

fn default_extinf_label() -> String {
    "{playlist_number}. {artist} - {name}".to_string()
}

fn default_separator() -> String {
    "; ".to_string()
}

fn default_explicit_label() -> String {
    "[E]".to_string()
}

fn default_illegal_character_replacement() -> String {
    "-".to_string()
}

impl Default for PlaylistConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            download_root: default_download_root(),
            m3u_path_formatter: default_m3u_path_formatter(),
            m3u_format: default_m3u_format(),
            extinf_label: default_extinf_label(),
            extinf_separator: default_separator(),
            metadata_separator: default_separator(),
            explicit_label: default_explicit_label(),
            use_double_digit_path_numbers: false,
            illegal_character_replacement: default_illegal_character_replacement(),
        }
    }
}

impl PlaylistConfig {
    /// Sets cache and download roots, typically to a temp dir in tests.
    pub fn with_roots(mut self, cache_dir: impl Into<PathBuf>, download_root: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self.download_root = download_root.into();
        self
    }
}
