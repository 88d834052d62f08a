//! Configuration for the post-processing pipeline.

use serde::{Deserialize, Serialize};

/// Which stages run and how many items are processed at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Keep downloaded files as-is. Only the cover is fetched.
    #[serde(default)]
    pub raw_media_download: bool,

    /// Run the strip stage after the cover is embedded.
    #[serde(default)]
    pub strip_metadata: bool,

    /// Maximum items post-processed concurrently.
    #[serde(default = "default_max_parallel_workers")]
    pub max_parallel_workers: usize,
}

fn default_max_parallel_workers() -> usize {
    4
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_media_download: false,
            strip_metadata: false,
            max_parallel_workers: default_max_parallel_workers(),
        }
    }
}

impl PipelineConfig {
    pub fn with_strip_metadata(mut self, strip: bool) -> Self {
        self.strip_metadata = strip;
        self
    }

    pub fn with_raw_media(mut self, raw: bool) -> Self {
        self.raw_media_download = raw;
        self
    }
}
