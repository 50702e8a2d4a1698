//! FLUX images provider

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::media::{GeneratedImage, ImageConfig, ImageProvider};
use crate::{Error, Result};

/// Sampling steps requested from FLUX
const STEPS: u32 = 24;

/// FLUX images provider
pub struct FluxImageProvider {
    client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    width: u32,
    height: u32,
}

impl FluxImageProvider {
    /// Create a new FLUX provider
    ///
    /// # Errors
    ///
    /// Returns error if the configured image size is malformed
    pub fn new(
        client: Client,
        api_key: SecretString,
        base_url: &str,
        config: &ImageConfig,
    ) -> Result<Self> {
        let (width, height) = config.dimensions()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.flux_model().to_string(),
            width,
            height,
        })
    }
}

#[async_trait]
impl ImageProvider for FluxImageProvider {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage> {
        let request = FluxRequest {
            model: &self.model,
            prompt,
            width: self.width,
            height: self.height,
            steps: STEPS,
            n: 1,
            response_format: "b64_json",
        };

        let response = self
            .client
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Media(format!("FLUX request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Media(format!("FLUX API error: {status} - {body}")));
        }

        let result: FluxResponse = response
            .json()
            .await
            .map_err(|e| Error::Media(format!("Failed to parse FLUX response: {e}")))?;

        let b64 = result
            .data
            .into_iter()
            .next()
            .and_then(|d| d.b64_json)
            .ok_or_else(|| Error::Media("No data in response from FLUX API.".to_string()))?;

        let data = base64::engine::general_purpose::STANDARD
            .decode(b64)
            .map_err(|e| Error::Media(format!("Invalid image data from FLUX: {e}")))?;

        tracing::debug!(model = %self.model, bytes = data.len(), "generated image");
        Ok(GeneratedImage {
            data,
            extension: "png",
        })
    }

    fn name(&self) -> &'static str {
        "flux"
    }
}

#[derive(Serialize)]
struct FluxRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    width: u32,
    height: u32,
    steps: u32,
    n: u32,
    response_format: &'a str,
}

#[derive(Deserialize)]
struct FluxResponse {
    #[serde(default)]
    data: Vec<FluxImage>,
}

#[derive(Deserialize)]
struct FluxImage {
    b64_json: Option<String>,
}
