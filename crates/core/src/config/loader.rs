use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix of environment variables that override file settings.
/// Sections are separated by `__`, e.g. `FINISHER_TOOL__MAX_RETRIES=5`.
pub const ENV_PREFIX: &str = "FINISHER_";

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Container;
    use crate::stage::CoverFormat;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[tool]
path = "/usr/local/bin/ffmpeg"
max_retries = 5

[conversion]
native_containers = { spotify = "mp3" }

[thumbnail]
album_cover_format = "png"

[playlist]
use_double_digit_path_numbers = true
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.tool.max_retries, 5);
        assert_eq!(
            config.conversion.native_containers.get("spotify"),
            Some(&Container::Mp3)
        );
        assert_eq!(config.thumbnail.album_cover_format, CoverFormat::Png);
        assert!(config.playlist.use_double_digit_path_numbers);
        assert_eq!(config.playlist.m3u_format, "m3u8");
    }

    #[test]
    fn test_load_config_from_str_empty_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.tool.max_retries, 3);
        assert_eq!(config.pipeline.max_parallel_workers, 4);
        assert!(config.embed.artist);
        assert!(!config.embed.branding);
    }

    #[test]
    fn test_load_config_from_str_unknown_cover_format() {
        let toml = r#"
[thumbnail]
album_cover_format = "gif"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[pipeline]
strip_metadata = true
max_parallel_workers = 2

[playlist]
m3u_format = "m3u"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert!(config.pipeline.strip_metadata);
        assert_eq!(config.pipeline.max_parallel_workers, 2);
        assert_eq!(config.playlist.m3u_format, "m3u");
    }
}
