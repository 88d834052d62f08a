//! Tag library seam used for artwork the external tool cannot write.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::Path;

use super::cover::image_dimensions;
use super::error::TagError;

/// Tag field that holds artwork in compatibility mode.
pub const ARTWORK_FIELD: &str = "artwork";

/// Vorbis comment carrying a base64 FLAC picture block.
pub const PICTURE_BLOCK_FIELD: &str = "metadata_block_picture";

/// A value to write into a tag field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValue {
    Text(Vec<String>),
    Picture { data: Vec<u8>, mime: String },
}

/// Tags loaded from one file.
pub trait TagFile: Send {
    /// Current value of `field`, including unsaved changes.
    fn get(&self, field: &str) -> Option<TagValue>;

    fn set(&mut self, field: &str, value: TagValue) -> Result<(), TagError>;

    fn remove(&mut self, field: &str) -> Result<(), TagError>;

    /// Writes the tags back to the file.
    fn save(self: Box<Self>) -> Result<(), TagError>;
}

/// Opens files for tag editing. Calls block and are run off the async runtime.
pub trait TagEditor: Send + Sync {
    fn name(&self) -> &str;

    fn load(&self, path: &Path) -> Result<Box<dyn TagFile>, TagError>;
}

/// Picture type for a front cover.
const FRONT_COVER: u32 = 3;

/// Serializes a FLAC `METADATA_BLOCK_PICTURE` body.
pub fn flac_picture_block(data: &[u8], mime: &str, description: &str) -> Vec<u8> {
    let (width, height) = image_dimensions(data).unwrap_or((0, 0));
    let mut block = Vec::with_capacity(32 + mime.len() + description.len() + data.len());

    block.extend_from_slice(&FRONT_COVER.to_be_bytes());
    block.extend_from_slice(&(mime.len() as u32).to_be_bytes());
    block.extend_from_slice(mime.as_bytes());
    block.extend_from_slice(&(description.len() as u32).to_be_bytes());
    block.extend_from_slice(description.as_bytes());
    block.extend_from_slice(&width.to_be_bytes());
    block.extend_from_slice(&height.to_be_bytes());
    // colour depth, covers are re-encoded as 8-bit RGB
    block.extend_from_slice(&24u32.to_be_bytes());
    // indexed colours
    block.extend_from_slice(&0u32.to_be_bytes());
    block.extend_from_slice(&(data.len() as u32).to_be_bytes());
    block.extend_from_slice(data);

    block
}

/// Base64 text of a FLAC picture block, ready for a Vorbis comment.
pub fn encode_picture_comment(data: &[u8], mime: &str) -> String {
    STANDARD.encode(flac_picture_block(data, mime, "Cover"))
}
