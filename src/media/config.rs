//! Configuration for image generation

use crate::{Error, Result};

/// Image generation settings shared by the `OpenAI` and FLUX providers
#[derive(Debug, Clone)]
pub struct ImageConfig {
    /// Model override; each provider falls back to its own default
    pub model: Option<String>,
    /// Quality ("standard" or "hd")
    pub quality: String,
    /// Style ("vivid" or "natural")
    pub style: String,
    /// Size as `WIDTHxHEIGHT`
    pub size: String,
    /// `OpenAI` API root
    pub openai_base_url: String,
    /// FLUX API root (no public default)
    pub flux_base_url: Option<String>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            model: None,
            quality: "standard".to_string(),
            style: "vivid".to_string(),
            size: "1024x1024".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            flux_base_url: None,
        }
    }
}

impl ImageConfig {
    /// Model sent to the `OpenAI` images endpoint
    #[must_use]
    pub fn openai_model(&self) -> &str {
        self.model.as_deref().unwrap_or("dall-e-3")
    }

    /// Model sent to the FLUX endpoint
    #[must_use]
    pub fn flux_model(&self) -> &str {
        self.model.as_deref().unwrap_or("dall-e-2")
    }

    /// Parse `size` into `(width, height)`
    ///
    /// # Errors
    ///
    /// Returns error if the size is not two integers joined by `x`
    pub fn dimensions(&self) -> Result<(u32, u32)> {
        let invalid =
            || Error::Config(format!("invalid image size `{}`, expected WIDTHxHEIGHT", self.size));

        let (width, height) = self.size.split_once('x').ok_or_else(invalid)?;
        let width = width.trim().parse().map_err(|_| invalid())?;
        let height = height.trim().parse().map_err(|_| invalid())?;
        Ok((width, height))
    }
}
