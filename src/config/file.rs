//! TOML configuration file loading
//!
//! Supports `~/.config/courier/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct CourierConfigFile {
    /// Plugin ids to enable (all built-ins when absent)
    #[serde(default)]
    pub plugins: Option<Vec<String>>,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// Image generation settings
    #[serde(default)]
    pub image: ImageFileConfig,

    /// Outbound HTTP settings
    #[serde(default)]
    pub http: HttpFileConfig,

    /// Telegram settings
    #[serde(default)]
    pub telegram: TelegramFileConfig,

    /// Artifact storage settings
    #[serde(default)]
    pub storage: StorageFileConfig,

    /// Server/runtime configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Upstream endpoint overrides
    #[serde(default)]
    pub endpoints: EndpointsFileConfig,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub flux: Option<String>,
}

/// Image generation configuration
#[derive(Debug, Default, Deserialize)]
pub struct ImageFileConfig {
    /// Model identifier (e.g. "dall-e-3")
    pub model: Option<String>,
    /// Quality ("standard" or "hd")
    pub quality: Option<String>,
    /// Style ("vivid" or "natural")
    pub style: Option<String>,
    /// Size as `WIDTHxHEIGHT`
    pub size: Option<String>,
    pub openai_base_url: Option<String>,
    pub flux_base_url: Option<String>,
}

/// Outbound HTTP configuration
#[derive(Debug, Default, Deserialize)]
pub struct HttpFileConfig {
    pub proxy: Option<String>,
    pub timeout_secs: Option<u64>,
    pub allow_private_urls: Option<bool>,
}

/// Telegram configuration
#[derive(Debug, Default, Deserialize)]
pub struct TelegramFileConfig {
    pub token: Option<String>,
    pub moderator_token: Option<String>,
    pub channel_id: Option<String>,
    pub allowed_user_ids: Option<Vec<i64>>,
}

/// Artifact storage configuration
#[derive(Debug, Default, Deserialize)]
pub struct StorageFileConfig {
    pub uploads_dir: Option<String>,
    pub tmp_dir: Option<String>,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// API server port
    pub port: Option<u16>,
    /// Bearer token required on the functions API
    pub api_key: Option<String>,
}

/// Upstream endpoint overrides
#[derive(Debug, Default, Deserialize)]
pub struct EndpointsFileConfig {
    pub arxiv: Option<String>,
    pub jina_reader: Option<String>,
    pub wikipedia: Option<String>,
    pub latex: Option<String>,
    pub telegram: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `CourierConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> CourierConfigFile {
    let Some(path) = config_file_path() else {
        return CourierConfigFile::default();
    };

    if !path.exists() {
        return CourierConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                CourierConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            CourierConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/courier/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    std::env::var("COURIER_CONFIG").map_or_else(
        |_| directories::BaseDirs::new().map(|d| d.config_dir().join("courier").join("config.toml")),
        |p| Some(PathBuf::from(p)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_file() {
        let toml = r#"
            plugins = ["arxiv_search", "wikipedia"]

            [api_keys]
            openai = "sk-test"

            [image]
            size = "512x512"

            [telegram]
            channel_id = "@news"
            allowed_user_ids = [1, 2]
        "#;

        let file: CourierConfigFile = toml::from_str(toml).unwrap();
        assert_eq!(
            file.plugins.as_deref(),
            Some(&["arxiv_search".to_string(), "wikipedia".to_string()][..])
        );
        assert_eq!(file.api_keys.openai.as_deref(), Some("sk-test"));
        assert!(file.api_keys.flux.is_none());
        assert_eq!(file.image.size.as_deref(), Some("512x512"));
        assert_eq!(file.telegram.allowed_user_ids, Some(vec![1, 2]));
        assert!(file.server.port.is_none());
    }

    #[test]
    fn empty_file_is_default() {
        let file: CourierConfigFile = toml::from_str("").unwrap();
        assert!(file.plugins.is_none());
        assert!(file.http.proxy.is_none());
    }
}
