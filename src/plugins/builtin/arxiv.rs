//! arXiv search and paper reader

use std::sync::LazyLock;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};

use crate::plugins::{
    ArtifactFormat, ArtifactKind, CallSpec, Context, Envelope, ParamSpec, Params, Plugin,
};
use crate::{Error, Result};

/// Entries requested from the API; `results_num` picks from these
const MAX_RESULTS: usize = 10;

static ENTRY_ID: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("entry > id").expect("valid selector"));

/// Finds papers by title and returns their PDF links
pub struct ArxivSearchPlugin {
    client: Client,
    api_root: String,
    specs: Vec<CallSpec>,
}

impl ArxivSearchPlugin {
    /// Create the plugin against an arXiv export API root
    #[must_use]
    pub fn new(client: Client, api_root: &str) -> Self {
        Self {
            client,
            api_root: api_root.trim_end_matches('/').to_string(),
            specs: vec![
                CallSpec::new(
                    "search_arxiv",
                    "Search arXiv for papers matching a specific title and return URLs.",
                )
                .param(
                    "query",
                    ParamSpec::string("The title of the paper to search for.").required(),
                )
                .param(
                    "results_num",
                    ParamSpec::integer("The number of the results to return; default is 3.")
                        .required()
                        .default_value(3i64),
                ),
            ],
        }
    }

    async fn fetch_feed(&self, query: &str) -> Result<String> {
        let search = urlencoding::encode(&format!("ti:{query}")).into_owned();
        let url = format!(
            "{}/api/query?search_query={search}&start=0&max_results={MAX_RESULTS}",
            self.api_root
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Upstream(format!(
                "Failed to search arXiv: status {}",
                response.status().as_u16()
            )));
        }
        Ok(response.text().await?)
    }
}

/// PDF links for the first `limit` entries of an Atom feed
fn pdf_urls(feed: &str, limit: usize) -> Vec<String> {
    let document = Html::parse_document(feed);
    document
        .select(&ENTRY_ID)
        .map(|id| id.text().collect::<String>())
        .filter_map(|id| {
            let id = id.trim();
            let paper = id.rsplit("/abs/").next().unwrap_or(id);
            (!paper.is_empty()).then(|| format!("https://arxiv.org/pdf/{paper}"))
        })
        .take(limit)
        .collect()
}

#[async_trait]
impl Plugin for ArxivSearchPlugin {
    fn source_name(&self) -> &str {
        "arXiv Search"
    }

    fn call_specs(&self) -> &[CallSpec] {
        &self.specs
    }

    async fn run(&self, _operation: &str, _ctx: &Context, params: Params) -> Result<Envelope> {
        let query = params.require_str("query")?;
        let limit = usize::try_from(params.require_i64("results_num")?).unwrap_or(0);

        let feed = self
            .fetch_feed(query)
            .await
            .map_err(|e| match e {
                Error::Upstream(_) => e,
                other => Error::Upstream(format!("Failed to search arXiv: {other}")),
            })?;

        let urls = pdf_urls(&feed, limit);
        tracing::debug!(query, found = urls.len(), "arXiv search finished");

        if urls.is_empty() {
            return Ok(Envelope::result("No matching papers found"));
        }
        Ok(Envelope::direct(ArtifactKind::File, ArtifactFormat::Url, urls))
    }
}

/// Reads a paper (or any page) as Markdown through the Jina reader
pub struct ArxivReaderPlugin {
    client: Client,
    reader_root: String,
    specs: Vec<CallSpec>,
}

impl ArxivReaderPlugin {
    /// Create the plugin against a Jina reader root
    #[must_use]
    pub fn new(client: Client, reader_root: &str) -> Self {
        Self {
            client,
            reader_root: reader_root.trim_end_matches('/').to_string(),
            specs: vec![
                CallSpec::new(
                    "jina_scrape_to_markdown",
                    "Scrape web content from a URL, especially useful for arXiv papers, \
                     and return it in Markdown format using Jina AI Reader API",
                )
                .param("url", ParamSpec::string("the URL to scrape").required()),
            ],
        }
    }
}

#[async_trait]
impl Plugin for ArxivReaderPlugin {
    fn source_name(&self) -> &str {
        "Web Content Scraper"
    }

    fn call_specs(&self) -> &[CallSpec] {
        &self.specs
    }

    async fn run(&self, _operation: &str, _ctx: &Context, params: Params) -> Result<Envelope> {
        let url = params.require_str("url")?;

        let response = self
            .client
            .get(format!("{}/{url}", self.reader_root))
            .send()
            .await
            .map_err(|e| Error::Upstream(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            return Ok(Envelope::error(format!(
                "Failed to retrieve Markdown content. Status code: {status}"
            )));
        }

        Ok(Envelope::result(response.text().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <id>http://arxiv.org/api/feed-id</id>
  <title>ArXiv Query</title>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <title>Attention Is All You Need</title>
    <link href="http://arxiv.org/abs/1706.03762v7" rel="alternate" type="text/html"/>
    <category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2005.14165v4</id>
    <title>Language Models are Few-Shot Learners</title>
    <category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
</feed>"#;

    #[test]
    fn extracts_pdf_links_from_entries_only() {
        assert_eq!(
            pdf_urls(FEED, 10),
            [
                "https://arxiv.org/pdf/1706.03762v7",
                "https://arxiv.org/pdf/2005.14165v4"
            ]
        );
    }

    #[test]
    fn honours_limit() {
        assert_eq!(pdf_urls(FEED, 1), ["https://arxiv.org/pdf/1706.03762v7"]);
        assert!(pdf_urls(FEED, 0).is_empty());
    }

    #[test]
    fn empty_feed_has_no_links() {
        assert!(pdf_urls("<feed><title>ArXiv Query</title></feed>", 3).is_empty());
    }
}
