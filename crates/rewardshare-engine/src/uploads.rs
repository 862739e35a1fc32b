use crate::config::UploadConfig;
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// An image picked by the user, validated before any network call.
#[derive(Debug, Clone)]
pub struct ProofImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// The external image-host seam: bytes in, public URL out.
#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, image: &ProofImage) -> Result<String>;
}

/// Client-side constraint check run before calling the host.
pub fn validate_image(image: &ProofImage, config: &UploadConfig) -> Result<()> {
    if !config
        .allowed_types
        .iter()
        .any(|t| t == &image.content_type)
    {
        return Err(EngineError::Validation(format!(
            "unsupported image type: {}",
            image.content_type
        )));
    }
    if image.bytes.len() as u64 > config.max_bytes {
        return Err(EngineError::Validation(format!(
            "image too large: {} bytes (max {})",
            image.bytes.len(),
            config.max_bytes
        )));
    }
    Ok(())
}

/// HTTP client for the IMGG image host.
pub struct ImggClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl ImggClient {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl ImageHost for ImggClient {
    async fn upload(&self, image: &ProofImage) -> Result<String> {
        let part = reqwest::multipart::Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)
            .map_err(|e| EngineError::Upload(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| EngineError::Upload(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Upload(format!(
                "image host returned {}: {}",
                status, body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| EngineError::Upload(e.to_string()))?;

        // The host has answered with either `data.url` or a bare `url`.
        let url = body
            .pointer("/data/url")
            .or_else(|| body.get("url"))
            .and_then(Value::as_str)
            .ok_or_else(|| EngineError::Upload("image host response missing url".into()))?;

        debug!(url, "proof image uploaded");
        Ok(url.to_string())
    }
}
