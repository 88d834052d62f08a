//! Cover art fetching and re-encoding.

use async_trait::async_trait;
use image::ImageOutputFormat;
use reqwest::Client;
use std::io::Cursor;
use std::time::Duration;

use super::config::CoverFormat;
use super::error::FetchError;

/// Downloads cover art.
#[async_trait]
pub trait CoverFetcher: Send + Sync {
    /// Returns the fetcher name for logging.
    fn name(&self) -> &str;

    /// Fetches the raw image bytes at `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Fetches covers over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCoverFetcher {
    client: Client,
}

impl HttpCoverFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CoverFetcher for HttpCoverFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Decodes `bytes`, converts to RGB and re-encodes in `format`.
pub fn encode_cover(bytes: &[u8], format: CoverFormat) -> Result<Vec<u8>, FetchError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| FetchError::Decode(e.to_string()))?;
    let rgb = image::DynamicImage::ImageRgb8(decoded.to_rgb8());

    let output_format = match format {
        CoverFormat::Jpeg => ImageOutputFormat::Jpeg(90),
        CoverFormat::Png => ImageOutputFormat::Png,
    };

    let mut encoded = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut encoded), output_format)
        .map_err(|e| FetchError::Decode(e.to_string()))?;
    Ok(encoded)
}

/// Width and height of an encoded image, if it can be read.
pub fn image_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::io::Reader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn test_encode_cover_to_jpeg() {
        let png = fixtures::cover_png(4, 3);
        let jpeg = encode_cover(&png, CoverFormat::Jpeg).unwrap();
        // JPEG SOI marker
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(image_dimensions(&jpeg), Some((4, 3)));
    }

    #[test]
    fn test_encode_cover_to_png() {
        let png = fixtures::cover_png(2, 2);
        let out = encode_cover(&png, CoverFormat::Png).unwrap();
        assert_eq!(&out[1..4], b"PNG");
    }

    #[test]
    fn test_encode_rejects_garbage() {
        let err = encode_cover(b"not an image", CoverFormat::Jpeg).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
        assert!(!err.is_retryable());
    }
}
