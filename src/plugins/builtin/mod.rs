//! Built-in plugins
//!
//! Each plugin adapts one external service. Which ones load is controlled by
//! the `plugins` config list (all of them when unset).

mod arxiv;
mod audio;
mod image_gen;
mod latex;
mod moderator;
mod telegram_scraper;
mod web_scraper;
mod wikipedia;

use std::sync::Arc;

use reqwest::Client;

pub use arxiv::{ArxivReaderPlugin, ArxivSearchPlugin};
pub use audio::AudioExtractPlugin;
pub use image_gen::ImageGenPlugin;
pub use latex::LatexPlugin;
pub use moderator::TelegramModeratorPlugin;
pub use telegram_scraper::TelegramScraperPlugin;
pub use web_scraper::WebScraperPlugin;
pub use wikipedia::WikipediaPlugin;

use super::Plugin;
use crate::config::Config;
use crate::media::ArtifactStore;
use crate::tools::{WebFetchTool, build_client};
use crate::Result;

/// Shared resources handed to plugin constructors
struct Deps<'a> {
    config: &'a Config,
    client: Client,
    store: ArtifactStore,
}

impl Deps<'_> {
    fn fetcher(&self) -> WebFetchTool {
        WebFetchTool::new(self.client.clone(), self.config.http.allow_private_urls)
    }
}

type Constructor = fn(&Deps<'_>) -> Arc<dyn Plugin>;

/// Config id and constructor of every built-in, in load order
const BUILTINS: &[(&str, Constructor)] = &[
    ("arxiv_search", |d| {
        Arc::new(ArxivSearchPlugin::new(d.client.clone(), &d.config.endpoints.arxiv))
    }),
    ("arxiv_reader", |d| {
        Arc::new(ArxivReaderPlugin::new(d.client.clone(), &d.config.endpoints.jina_reader))
    }),
    ("web_scraper", |d| Arc::new(WebScraperPlugin::new(d.fetcher()))),
    ("telegram_scraper", |d| Arc::new(TelegramScraperPlugin::new(d.fetcher()))),
    ("wikipedia", |d| {
        Arc::new(WikipediaPlugin::new(d.client.clone(), &d.config.endpoints.wikipedia))
    }),
    ("image_gen", |d| {
        Arc::new(ImageGenPlugin::new(
            d.client.clone(),
            d.store.clone(),
            d.config.image.clone(),
            d.config.api_keys.clone(),
        ))
    }),
    ("latex", |d| {
        Arc::new(LatexPlugin::new(d.client.clone(), &d.config.endpoints.latex, d.store.clone()))
    }),
    ("audio_extract", |d| Arc::new(AudioExtractPlugin::new(&d.config.storage.tmp_dir))),
    ("telegram_moderator", |d| {
        Arc::new(TelegramModeratorPlugin::new(
            d.client.clone(),
            &d.config.endpoints.telegram,
            &d.config.telegram,
        ))
    }),
];

/// Config ids of all built-in plugins
pub fn ids() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|(id, _)| *id)
}

/// Construct the built-ins enabled by `config`
///
/// Unknown ids in the config list are logged and skipped. Settings a plugin
/// needs only at call time (API keys, tokens) are not checked here.
///
/// # Errors
///
/// Returns error if the shared HTTP client cannot be built
pub fn load(config: &Config) -> Result<Vec<Arc<dyn Plugin>>> {
    if let Some(enabled) = &config.plugins {
        for id in enabled.iter().filter(|id| !ids().any(|known| known == id.as_str())) {
            tracing::warn!(plugin_id = %id, "unknown plugin id, skipping");
        }
    }

    let deps = Deps {
        config,
        client: build_client(&config.http)?,
        store: ArtifactStore::new(&config.storage.uploads_dir),
    };

    let plugins = BUILTINS
        .iter()
        .filter(|(id, _)| {
            let enabled = config.plugin_enabled(id);
            if !enabled {
                tracing::debug!(plugin_id = %id, "plugin disabled");
            }
            enabled
        })
        .map(|(_, construct)| construct(&deps))
        .collect();

    Ok(plugins)
}
