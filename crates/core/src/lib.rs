pub mod config;
pub mod error;
pub mod item;
pub mod metrics;
pub mod playlist;
pub mod processor;
pub mod queue;
pub mod stage;
pub mod swap;
pub mod testing;
pub mod tool;

pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use error::{ErrorKind, PostProcessError};
pub use item::{Container, Item, ItemMetadata, ItemStatus, ItemType, ParentCategory, PlaylistKey};
pub use playlist::{ManifestError, PlaylistCompletionCache, PlaylistConfig, PlaylistManifestWriter};
pub use processor::{ItemState, PipelineConfig, PostProcessor, ProcessOutcome};
pub use queue::{ItemQueue, QueueEntry, SharedQueue};
pub use stage::{
    ConversionStage, CoverFetcher, EmbedStage, HttpCoverFetcher, Stage, StripStage, TagEditor,
    ThumbnailStage,
};
pub use swap::swap;
pub use tool::{ProcessExecutor, ToolConfig, ToolError, ToolExecutor, ToolRunner};
