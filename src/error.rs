//! Error types for Courier

use thiserror::Error;

/// Result type alias for Courier operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Courier
///
/// Plugins never hand these to the host directly: the plugin boundary turns
/// every variant into an error envelope carrying the `Display` text.
#[derive(Debug, Error)]
pub enum Error {
    /// Required setting is absent or malformed
    #[error("configuration error: {0}")]
    Config(String),

    /// Invocation request is malformed or misses a required parameter
    #[error("{0}")]
    Validation(String),

    /// Operation name is not routed to any plugin
    #[error("Unknown function name")]
    UnknownOperation(String),

    /// Two plugins (or one plugin twice) declare the same operation name
    #[error("duplicate operation `{name}` declared by {second} (already registered by {first})")]
    DuplicateOperation {
        /// Operation name
        name: String,
        /// Source name of the plugin that registered it first
        first: String,
        /// Source name of the plugin that tried to register it again
        second: String,
    },

    /// External API call failed or returned an unusable response
    #[error("{0}")]
    Upstream(String),

    /// Web fetch error (SSRF protection, request failures)
    #[error("web fetch error: {0}")]
    WebFetch(String),

    /// Artifact delivery error
    #[error("channel error: {0}")]
    Channel(String),

    /// Media generation or staging error
    #[error("media error: {0}")]
    Media(String),

    /// Plugin body panicked
    #[error("plugin fault: {0}")]
    Fault(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Configuration error naming a missing setting
    #[must_use]
    pub fn missing_setting(name: &str) -> Self {
        Self::Config(format!("{name} is not set"))
    }
}
