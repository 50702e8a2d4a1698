//! Shared test utilities

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use courier::config::{Endpoints, HttpConfig, StorageConfig};
use courier::{Config, Context, Envelope, PluginManager};
use tempfile::TempDir;

/// Configuration pointing every upstream at `base` with storage in `dir`
///
/// Private addresses are allowed so the guarded fetcher can reach the mock
/// server.
#[must_use]
pub fn test_config(base: &str, dir: &Path) -> Config {
    Config {
        http: HttpConfig {
            allow_private_urls: true,
            ..HttpConfig::default()
        },
        storage: StorageConfig {
            uploads_dir: dir.join("uploads"),
            tmp_dir: dir.join("tmp"),
        },
        endpoints: Endpoints {
            arxiv: base.to_string(),
            jina_reader: base.to_string(),
            wikipedia: format!("{base}/w/api.php"),
            latex: base.to_string(),
            telegram: base.to_string(),
        },
        ..Config::default()
    }
}

/// Plugin manager over the built-ins, talking to `base`
pub struct TestHost {
    pub manager: Arc<PluginManager>,
    pub config: Config,
    pub dir: TempDir,
}

impl TestHost {
    /// Load every built-in against `base`
    #[must_use]
    pub fn new(base: &str) -> Self {
        Self::with(base, |_| {})
    }

    /// Load the built-ins after adjusting the config
    #[must_use]
    pub fn with(base: &str, adjust: impl FnOnce(&mut Config)) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let mut config = test_config(base, dir.path());
        adjust(&mut config);
        let manager = PluginManager::from_config(&config).expect("failed to load plugins");
        Self {
            manager: Arc::new(manager),
            config,
            dir,
        }
    }

    /// Invoke an operation with a JSON arguments string
    pub async fn call(&self, operation: &str, arguments: &str) -> Envelope {
        self.manager.call(operation, Context::new(), arguments).await
    }

    /// Number of files under an uploads category
    #[must_use]
    pub fn staged(&self, category: &str) -> usize {
        std::fs::read_dir(self.config.storage.uploads_dir.join(category))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}
