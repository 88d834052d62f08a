use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - At least one tool attempt is allowed
/// - The tool path is set
/// - The manifest extension is set
/// - At least one worker runs
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.tool.max_retries == 0 {
        return Err(ConfigError::ValidationError(
            "tool.max_retries cannot be 0".to_string(),
        ));
    }

    if config.tool.path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "tool.path cannot be empty".to_string(),
        ));
    }

    if config.playlist.m3u_format.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "playlist.m3u_format cannot be empty".to_string(),
        ));
    }

    if config.pipeline.max_parallel_workers == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.max_parallel_workers cannot be 0".to_string(),
        ));
    }

    Ok(())
}
