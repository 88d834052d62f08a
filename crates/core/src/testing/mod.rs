//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external seams (the
//! transcoding tool, the cover download and the tag library), allowing the
//! stages and the post-processor to be exercised without ffmpeg or network
//! access.
//!
//! # Example
//!
//! ```rust,ignore
//! use finisher_core::testing::{fixtures, MockCoverFetcher, MockToolExecutor};
//!
//! let tool = Arc::new(MockToolExecutor::new());
//! let fetcher = Arc::new(MockCoverFetcher::new());
//!
//! // Fail the first attempt, succeed on the retry
//! tool.push_exit_codes([1]).await;
//!
//! let item = fixtures::playlist_item("t1", "/music/a.mp3", "Road Trip", "dj", Some(1));
//! ```

mod mock_cover_fetcher;
mod mock_stage;
mod mock_tag_editor;
mod mock_tool_executor;

pub use mock_cover_fetcher::MockCoverFetcher;
pub use mock_stage::{FailingStage, RecordingStage};
pub use mock_tag_editor::{MockTagEditor, RecordedTagWrite};
pub use mock_tool_executor::{MockToolExecutor, RecordedInvocation};

/// Test fixtures and helper functions.
pub mod fixtures {
    use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use std::path::PathBuf;

    use crate::item::{Item, ItemMetadata, ItemStatus, ItemType, ParentCategory};

    /// Create a standalone spotify track.
    pub fn track_item(item_id: &str, file_path: &str) -> Item {
        Item {
            item_id: item_id.to_string(),
            item_service: "spotify".to_string(),
            item_type: ItemType::Track,
            parent_category: ParentCategory::Standalone,
            playlist_name: None,
            playlist_by: None,
            playlist_number: None,
            playlist_total: None,
            file_path: PathBuf::from(file_path),
            item_status: ItemStatus::Queued,
        }
    }

    /// Create a track queued from a playlist.
    pub fn playlist_item(
        item_id: &str,
        file_path: &str,
        playlist_name: &str,
        playlist_by: &str,
        playlist_number: Option<u32>,
    ) -> Item {
        Item {
            parent_category: ParentCategory::Playlist,
            playlist_name: Some(playlist_name.to_string()),
            playlist_by: Some(playlist_by.to_string()),
            playlist_number,
            ..track_item(item_id, file_path)
        }
    }

    /// Metadata with every field set.
    pub fn full_metadata() -> ItemMetadata {
        let s = |v: &str| Some(v.to_string());
        ItemMetadata {
            title: s("Song Title"),
            artists: vec!["Artist One".to_string(), "Artist Two".to_string()],
            album_name: s("Album Name"),
            album_artists: vec!["Album Artist".to_string()],
            album_type: s("compilation"),
            release_year: s("2021"),
            disc_number: Some(1),
            total_discs: Some(2),
            track_number: Some(4),
            total_tracks: Some(12),
            explicit: Some(true),
            genre: vec!["Rock".to_string(), "Indie".to_string()],
            performers: vec!["Performer".to_string()],
            producers: vec!["Producer".to_string()],
            writers: vec!["Writer".to_string()],
            label: s("Label"),
            copyright: s("(C) 2021 Label"),
            description: s("A description"),
            language: s("en"),
            isrc: s("USABC2100001"),
            upc: s("012345678905"),
            item_url: s("https://open.example/track/t1"),
            lyrics: s("la la la"),
            length: Some(183_000),
            bpm: Some(120.0),
            key: s("C#"),
            time_signature: Some(4),
            acousticness: Some(0.1),
            danceability: Some(0.7),
            instrumentalness: Some(0.0),
            liveness: Some(0.2),
            loudness: Some(-5.5),
            speechiness: Some(0.05),
            energy: Some(0.8),
            valence: Some(0.6),
            image_url: s("https://img.example/album.jpg"),
            playlist_image_url: s("https://img.example/playlist.jpg"),
        }
    }

    /// A solid-colour PNG of the given size.
    pub fn cover_png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, Rgb([200, 40, 40]));
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(image)
            .write_to(&mut bytes, ImageOutputFormat::Png)
            .unwrap();
        bytes.into_inner()
    }
}
