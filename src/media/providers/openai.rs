//! `OpenAI` images provider (DALL-E)

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::media::{GeneratedImage, ImageConfig, ImageProvider};
use crate::{Error, Result};

/// `OpenAI` images provider
pub struct OpenAIImageProvider {
    client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    quality: String,
    style: String,
    size: String,
}

impl OpenAIImageProvider {
    /// Create a new `OpenAI` images provider
    #[must_use]
    pub fn new(client: Client, api_key: SecretString, config: &ImageConfig) -> Self {
        Self {
            client,
            api_key,
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            model: config.openai_model().to_string(),
            quality: config.quality.clone(),
            style: config.style.clone(),
            size: config.size.clone(),
        }
    }

    /// Download the hosted image the API points at
    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Media(format!("Failed to download image from OpenAI: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Media(format!(
                "Failed to download image from OpenAI: {}",
                response.status().as_u16()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Media(format!("Failed to download image from OpenAI: {e}")))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ImageProvider for OpenAIImageProvider {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage> {
        let request = ImageGenerationRequest {
            prompt,
            n: 1,
            model: &self.model,
            quality: &self.quality,
            style: &self.style,
            size: &self.size,
        };

        let response = self
            .client
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Media(format!("OpenAI request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Media(format!("OpenAI API error: {status} - {body}")));
        }

        let result: ImageGenerationResponse = response
            .json()
            .await
            .map_err(|e| Error::Media(format!("Failed to parse OpenAI response: {e}")))?;

        let image = result
            .data
            .into_iter()
            .next()
            .ok_or_else(|| Error::Media("No response from OpenAI API.".to_string()))?;

        let data = match (image.url, image.b64_json) {
            (Some(url), _) => self.download(&url).await?,
            (None, Some(b64)) => base64::engine::general_purpose::STANDARD
                .decode(b64)
                .map_err(|e| Error::Media(format!("Invalid image data from OpenAI: {e}")))?,
            (None, None) => {
                return Err(Error::Media("No image in OpenAI response.".to_string()));
            }
        };

        tracing::debug!(model = %self.model, bytes = data.len(), "generated image");
        Ok(GeneratedImage {
            data,
            extension: "png",
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[derive(Serialize)]
struct ImageGenerationRequest<'a> {
    prompt: &'a str,
    n: u32,
    model: &'a str,
    quality: &'a str,
    style: &'a str,
    size: &'a str,
}

#[derive(Deserialize)]
struct ImageGenerationResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    url: Option<String>,
    b64_json: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_configured_settings() {
        let request = ImageGenerationRequest {
            prompt: "a lighthouse",
            n: 1,
            model: "dall-e-3",
            quality: "hd",
            style: "natural",
            size: "1024x1792",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["prompt"], "a lighthouse");
        assert_eq!(json["n"], 1);
        assert_eq!(json["quality"], "hd");
        assert_eq!(json["style"], "natural");
        assert_eq!(json["size"], "1024x1792");
    }

    #[test]
    fn empty_data_deserializes() {
        let response: ImageGenerationResponse = serde_json::from_str("{}").unwrap();
        assert!(response.data.is_empty());
    }

    #[test]
    fn base_url_is_normalized() {
        let config = ImageConfig {
            openai_base_url: "http://localhost:9000/v1/".to_string(),
            ..ImageConfig::default()
        };
        let provider =
            OpenAIImageProvider::new(Client::new(), SecretString::from("sk".to_string()), &config);
        assert_eq!(provider.base_url, "http://localhost:9000/v1");
        assert_eq!(provider.model, "dall-e-3");
    }
}
