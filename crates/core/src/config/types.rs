use serde::{Deserialize, Serialize};

use crate::playlist::PlaylistConfig;
use crate::processor::PipelineConfig;
use crate::stage::{ConversionConfig, EmbedConfig, ThumbnailConfig};
use crate::tool::ToolConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tool: ToolConfig,
    #[serde(default)]
    pub conversion: ConversionConfig,
    #[serde(default)]
    pub embed: EmbedConfig,
    #[serde(default)]
    pub thumbnail: ThumbnailConfig,
    #[serde(default)]
    pub playlist: PlaylistConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}
