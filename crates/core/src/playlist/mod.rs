//! Playlist completion tracking and manifest output.
//!
//! Every item that finishes post-processing is recorded in a per-playlist
//! [`PlaylistCompletionCache`] record. Once every queued member of the playlist
//! has reached a downloaded status, [`PlaylistManifestWriter`] renders the
//! record as an `#EXTM3U` manifest and deletes it.

mod cache;
mod config;
mod error;
mod manifest;
mod template;

pub use cache::{CacheEntry, CacheRecord, CachedMetadata, PlaylistCompletionCache};
pub use config::PlaylistConfig;
pub use error::ManifestError;
pub use manifest::{extinf_seconds, sort_entries, PlaylistManifestWriter, UNNUMBERED};
pub use template::{render, sanitize, title_case};
