//! Post-processing stages.
//!
//! Each stage rewrites an item's file in place:
//! - [`ConversionStage`]: transcode into the requested container
//! - [`EmbedStage`]: write descriptive tags, then repair MP3 frames
//! - [`ThumbnailStage`]: fetch and attach cover art
//! - [`StripStage`]: drop all metadata
//!
//! Tool-backed stages wrap their invocation in [`swap`](crate::swap::swap) so a
//! failed rewrite never leaves a partial file behind.

mod config;
mod conversion;
mod cover;
mod embed;
mod error;
mod id3_repair;
mod strip;
mod tag_editor;
mod tag_table;
mod thumbnail;
mod traits;

pub use config::{
    ConversionConfig, CoverFormat, EmbedConfig, ThumbnailConfig, OPUS_SAMPLE_RATE,
};
pub use conversion::ConversionStage;
pub use cover::{encode_cover, image_dimensions, CoverFetcher, HttpCoverFetcher};
pub use embed::EmbedStage;
pub use error::{FetchError, TagError};
pub use id3_repair::{repair_mp3_frames, DROPPED_FRAMES, MOVED_FRAMES};
pub use strip::StripStage;
pub use tag_editor::{
    encode_picture_comment, flac_picture_block, TagEditor, TagFile, TagValue, ARTWORK_FIELD,
    PICTURE_BLOCK_FIELD,
};
pub use tag_table::{build_metadata_args, tag_key, TagField, BRANDING_COMMENT};
pub use thumbnail::{EmbedMethod, ThumbnailStage, PLAYLIST_COVER_NAME};
pub use traits::Stage;

use std::path::Path;

use crate::error::PostProcessError;
use crate::swap::swap;
use crate::tool::{ToolInvocation, ToolRunner};

/// Rewrites `target` by running the tool from its temp copy back onto it.
pub(crate) async fn rewrite_with_tool(
    runner: &ToolRunner,
    target: &Path,
    args: Vec<String>,
) -> Result<(), PostProcessError> {
    let output = target.to_path_buf();
    swap(target, |temp| async move {
        let invocation = ToolInvocation::new(temp, output, args);
        runner.run(&invocation).await?;
        Ok(())
    })
    .await
}
