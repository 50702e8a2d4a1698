//! Configuration management for Courier
//!
//! Every setting resolves with the same precedence: environment variable,
//! then `config.toml`, then the built-in default. Settings that only some
//! plugins need stay optional here and are checked at call time.

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::media::ImageConfig;
use crate::{Error, Result};

pub use file::{CourierConfigFile, config_file_path, load_config_file};

/// Default HTTP API port
const DEFAULT_PORT: u16 = 18800;

/// Default outbound request timeout
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Placeholder some deployments ship instead of a real FLUX key
const FLUX_KEY_PLACEHOLDER: &str = "XXX";

/// Courier configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Plugin ids to enable; `None` enables every built-in
    pub plugins: Option<Vec<String>>,

    /// API keys
    pub api_keys: ApiKeys,

    /// Image generation settings
    pub image: ImageConfig,

    /// Outbound HTTP settings
    pub http: HttpConfig,

    /// Telegram settings
    pub telegram: TelegramConfig,

    /// Artifact storage locations
    pub storage: StorageConfig,

    /// Upstream service endpoints
    pub endpoints: Endpoints,

    /// HTTP API server configuration
    pub server: ServerConfig,
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (DALL-E image generation)
    pub openai: Option<SecretString>,

    /// FLUX API key
    pub flux: Option<SecretString>,
}

/// Outbound HTTP configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Proxy URL applied to every upstream request
    pub proxy: Option<String>,

    /// Per-request timeout
    pub timeout: Duration,

    /// Allow fetching loopback/private addresses (tests, intranets)
    pub allow_private_urls: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            allow_private_urls: false,
        }
    }
}

/// Telegram configuration
#[derive(Debug, Clone, Default)]
pub struct TelegramConfig {
    /// Bot token used by the host to deliver envelopes
    pub token: Option<SecretString>,

    /// Bot token used by the moderator plugin
    pub moderator_token: Option<SecretString>,

    /// Channel the moderator posts to (numeric id or `@username`)
    pub channel_id: Option<String>,

    /// Users allowed to trigger moderation (empty = everyone)
    pub allowed_user_ids: Vec<i64>,
}

/// Artifact storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root for generated artifacts (one subdirectory per category)
    pub uploads_dir: PathBuf,

    /// Scratch directory for downloaded media
    pub tmp_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
            tmp_dir: PathBuf::from("tmp"),
        }
    }
}

/// Upstream service endpoints
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// arXiv export API root
    pub arxiv: String,

    /// Jina reader root
    pub jina_reader: String,

    /// `MediaWiki` API endpoint
    pub wikipedia: String,

    /// LaTeX rendering service root
    pub latex: String,

    /// Telegram Bot API root
    pub telegram: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            arxiv: "http://export.arxiv.org".to_string(),
            jina_reader: "https://r.jina.ai".to_string(),
            wikipedia: "https://en.wikipedia.org/w/api.php".to_string(),
            latex: "https://latex.codecogs.com".to_string(),
            telegram: crate::channels::telegram::API_BASE.to_string(),
        }
    }
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Bearer token callers must present; `None` leaves the API open
    pub api_key: Option<SecretString>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            api_key: None,
        }
    }
}

impl Config {
    /// Load configuration from the process environment and config file
    ///
    /// # Errors
    ///
    /// Returns error if a security setting is malformed
    pub fn load() -> Result<Self> {
        let fc = load_config_file();
        Self::from_sources(fc, &|key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed config file and an env lookup
    ///
    /// Empty environment values count as unset.
    ///
    /// # Errors
    ///
    /// Returns error if `ALLOWED_TELEGRAM_USER_IDS` holds a non-numeric id
    pub fn from_sources(
        fc: CourierConfigFile,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let flag = |key: &str| var(key).map(|v| v == "1" || v.eq_ignore_ascii_case("true"));

        let plugins = var("COURIER_PLUGINS")
            .map(|list| split_list(&list))
            .or(fc.plugins);

        // API keys (env > toml > None)
        let api_keys = ApiKeys {
            openai: var("OPENAI_API_KEY")
                .or(fc.api_keys.openai)
                .map(SecretString::from),
            flux: var("FLUX_API_KEY")
                .or(fc.api_keys.flux)
                .filter(|k| k != FLUX_KEY_PLACEHOLDER)
                .map(SecretString::from),
        };

        let image_defaults = ImageConfig::default();
        let image = ImageConfig {
            model: var("IMAGE_MODEL").or(fc.image.model),
            quality: var("IMAGE_QUALITY")
                .or(fc.image.quality)
                .unwrap_or(image_defaults.quality),
            style: var("IMAGE_STYLE")
                .or(fc.image.style)
                .unwrap_or(image_defaults.style),
            size: var("IMAGE_SIZE")
                .or(fc.image.size)
                .unwrap_or(image_defaults.size),
            openai_base_url: var("OPENAI_BASE_URL")
                .or(fc.image.openai_base_url)
                .unwrap_or(image_defaults.openai_base_url),
            flux_base_url: var("FLUX_BASE_URL").or(fc.image.flux_base_url),
        };

        let timeout_secs = var("COURIER_HTTP_TIMEOUT_SECS")
            .and_then(|s| match s.parse() {
                Ok(secs) => Some(secs),
                Err(e) => {
                    tracing::warn!(value = %s, error = %e, "ignoring invalid COURIER_HTTP_TIMEOUT_SECS");
                    None
                }
            })
            .or(fc.http.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let http = HttpConfig {
            proxy: var("PROXY").or_else(|| var("OPENAI_PROXY")).or(fc.http.proxy),
            timeout: Duration::from_secs(timeout_secs),
            allow_private_urls: flag("COURIER_ALLOW_PRIVATE_URLS")
                .or(fc.http.allow_private_urls)
                .unwrap_or(false),
        };

        let allowed_user_ids = match var("ALLOWED_TELEGRAM_USER_IDS") {
            Some(list) => parse_user_ids(&list)?,
            None => fc.telegram.allowed_user_ids.clone().unwrap_or_default(),
        };
        let telegram = TelegramConfig {
            token: var("TELEGRAM_BOT_TOKEN")
                .or(fc.telegram.token)
                .map(SecretString::from),
            moderator_token: var("BOT_TOKEN_MODERATOR")
                .or(fc.telegram.moderator_token)
                .map(SecretString::from),
            channel_id: var("CHANNEL_ID").or(fc.telegram.channel_id),
            allowed_user_ids,
        };

        let storage_defaults = StorageConfig::default();
        let storage = StorageConfig {
            uploads_dir: var("COURIER_UPLOADS_DIR")
                .or(fc.storage.uploads_dir)
                .map_or(storage_defaults.uploads_dir, PathBuf::from),
            tmp_dir: var("COURIER_TMP_DIR")
                .or(fc.storage.tmp_dir)
                .map_or(storage_defaults.tmp_dir, PathBuf::from),
        };

        let endpoint_defaults = Endpoints::default();
        let endpoints = Endpoints {
            arxiv: var("ARXIV_API_URL")
                .or(fc.endpoints.arxiv)
                .unwrap_or(endpoint_defaults.arxiv),
            jina_reader: var("JINA_READER_URL")
                .or(fc.endpoints.jina_reader)
                .unwrap_or(endpoint_defaults.jina_reader),
            wikipedia: var("WIKIPEDIA_API_URL")
                .or(fc.endpoints.wikipedia)
                .unwrap_or(endpoint_defaults.wikipedia),
            latex: var("LATEX_RENDER_URL")
                .or(fc.endpoints.latex)
                .unwrap_or(endpoint_defaults.latex),
            telegram: var("TELEGRAM_API_URL")
                .or(fc.endpoints.telegram)
                .unwrap_or(endpoint_defaults.telegram),
        };

        let server = ServerConfig {
            port: var("COURIER_PORT")
                .or_else(|| var("PORT"))
                .and_then(|s| s.parse().ok())
                .or(fc.server.port)
                .unwrap_or(DEFAULT_PORT),
            api_key: var("COURIER_API_KEY")
                .or(fc.server.api_key)
                .map(SecretString::from),
        };

        Ok(Self {
            plugins,
            api_keys,
            image,
            http,
            telegram,
            storage,
            endpoints,
            server,
        })
    }

    /// Whether a built-in plugin id is enabled
    #[must_use]
    pub fn plugin_enabled(&self, id: &str) -> bool {
        self.plugins
            .as_ref()
            .is_none_or(|ids| ids.iter().any(|enabled| enabled == id))
    }
}

/// Split a comma-separated list, dropping blanks
fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Parse the moderator allow-list; one bad id rejects the whole setting
fn parse_user_ids(list: &str) -> Result<Vec<i64>> {
    split_list(list)
        .iter()
        .map(|id| {
            id.parse().map_err(|_| {
                Error::Config(format!(
                    "ALLOWED_TELEGRAM_USER_IDS contains an invalid user id `{id}`"
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn from_env(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_sources(CourierConfigFile::default(), &|key| vars.get(key).cloned())
            .unwrap()
    }

    #[test]
    fn defaults_without_sources() {
        let config = from_env(&[]);
        assert!(config.plugins.is_none());
        assert!(config.api_keys.openai.is_none());
        assert_eq!(config.image.quality, "standard");
        assert_eq!(config.image.style, "vivid");
        assert_eq!(config.image.size, "1024x1024");
        assert_eq!(config.http.timeout, Duration::from_secs(60));
        assert_eq!(config.storage.uploads_dir, PathBuf::from("uploads"));
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert!(config.plugin_enabled("wikipedia"));
    }

    #[test]
    fn env_overrides_file() {
        let fc: CourierConfigFile = toml::from_str(
            r#"
            [image]
            size = "512x512"
            style = "natural"
            "#,
        )
        .unwrap();
        let config = Config::from_sources(fc, &|key| {
            (key == "IMAGE_SIZE").then(|| "256x256".to_string())
        })
        .unwrap();
        assert_eq!(config.image.size, "256x256");
        assert_eq!(config.image.style, "natural");
    }

    #[test]
    fn plugin_list_restricts_enabled_plugins() {
        let config = from_env(&[("COURIER_PLUGINS", "arxiv_search, wikipedia ,")]);
        assert!(config.plugin_enabled("arxiv_search"));
        assert!(config.plugin_enabled("wikipedia"));
        assert!(!config.plugin_enabled("image_gen"));
    }

    #[test]
    fn flux_placeholder_counts_as_unset() {
        let config = from_env(&[("FLUX_API_KEY", "XXX"), ("OPENAI_API_KEY", "sk-1")]);
        assert!(config.api_keys.flux.is_none());
        assert_eq!(
            config.api_keys.openai.as_ref().map(|k| k.expose_secret()),
            Some("sk-1")
        );
    }

    #[test]
    fn proxy_falls_back_to_openai_proxy() {
        let config = from_env(&[("OPENAI_PROXY", "http://proxy:3128")]);
        assert_eq!(config.http.proxy.as_deref(), Some("http://proxy:3128"));
    }

    #[test]
    fn allowed_user_ids_are_parsed() {
        let config = from_env(&[("ALLOWED_TELEGRAM_USER_IDS", " 1, -3 ,")]);
        assert_eq!(config.telegram.allowed_user_ids, vec![1, -3]);
    }

    #[test]
    fn malformed_allowed_user_id_is_rejected() {
        for list in ["12345a, @admin", "1,abc,3"] {
            let err = Config::from_sources(CourierConfigFile::default(), &|key| {
                (key == "ALLOWED_TELEGRAM_USER_IDS").then(|| list.to_string())
            })
            .unwrap_err();
            assert!(matches!(err, Error::Config(_)));
            assert!(err.to_string().contains("ALLOWED_TELEGRAM_USER_IDS"));
        }
    }

    #[test]
    fn api_key_comes_from_env() {
        assert!(from_env(&[]).server.api_key.is_none());

        let config = from_env(&[("COURIER_API_KEY", "s3cret")]);
        assert_eq!(
            config.server.api_key.as_ref().map(|k| k.expose_secret()),
            Some("s3cret")
        );
    }

    #[test]
    fn empty_values_are_unset() {
        let config = from_env(&[("CHANNEL_ID", ""), ("COURIER_HTTP_TIMEOUT_SECS", "soon")]);
        assert!(config.telegram.channel_id.is_none());
        assert_eq!(config.http.timeout, Duration::from_secs(60));
    }
}
