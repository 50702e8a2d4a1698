//! Web page to Markdown

use async_trait::async_trait;

use crate::plugins::{CallSpec, Context, Envelope, ParamSpec, Params, Plugin};
use crate::tools::{WebFetchTool, html_to_markdown};
use crate::Result;

/// Fetches a page and returns it as Markdown
pub struct WebScraperPlugin {
    fetcher: WebFetchTool,
    specs: Vec<CallSpec>,
}

impl WebScraperPlugin {
    /// Create the plugin around a guarded fetcher
    #[must_use]
    pub fn new(fetcher: WebFetchTool) -> Self {
        Self {
            fetcher,
            specs: vec![
                CallSpec::new(
                    "scrape_to_markdown",
                    "Scrape web content from a URL and return it in Markdown format",
                )
                .param("url", ParamSpec::string("the URL to scrape").required()),
            ],
        }
    }
}

#[async_trait]
impl Plugin for WebScraperPlugin {
    fn source_name(&self) -> &str {
        "Web Content Scraper"
    }

    fn call_specs(&self) -> &[CallSpec] {
        &self.specs
    }

    async fn run(&self, _operation: &str, _ctx: &Context, params: Params) -> Result<Envelope> {
        let url = params.require_str("url")?;
        let page = self.fetcher.fetch(url).await?;

        if !page.is_success() {
            tracing::debug!(url = %page.url, status = page.status, "converting non-success page");
        }

        Ok(Envelope::result(html_to_markdown(&page.body)))
    }
}
