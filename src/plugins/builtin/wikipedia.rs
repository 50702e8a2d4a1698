//! Wikipedia lookup through the MediaWiki action API

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::plugins::{CallSpec, Context, Envelope, ParamSpec, Params, Plugin};
use crate::{Error, Result};

/// Returns the plain-text extract of the best matching article
pub struct WikipediaPlugin {
    client: Client,
    api_url: String,
    specs: Vec<CallSpec>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    query: Option<PageQuery>,
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    extract: String,
    fullurl: Option<String>,
    pageprops: Option<PageProps>,
}

#[derive(Debug, Deserialize)]
struct PageProps {
    disambiguation: Option<serde_json::Value>,
}

/// Article lookup failures that are reported as messages, not faults
#[derive(Debug, PartialEq, Eq)]
enum Lookup {
    NoResults,
    NotFound,
    Disambiguation(String),
}

impl Lookup {
    fn message(&self) -> String {
        match self {
            Self::NoResults => "No results found".to_string(),
            Self::NotFound => "Page not found".to_string(),
            Self::Disambiguation(title) => {
                format!("Disambiguation error: {title} may refer to several pages")
            }
        }
    }
}

impl WikipediaPlugin {
    /// Create the plugin against a MediaWiki `api.php` URL
    #[must_use]
    pub fn new(client: Client, api_url: &str) -> Self {
        Self {
            client,
            api_url: api_url.to_string(),
            specs: vec![
                CallSpec::new(
                    "search",
                    "Search Wikipedia for a query and return the content of the best match",
                )
                .param("query", ParamSpec::string("the search query").required()),
            ],
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, query: &[(&str, &str)]) -> Result<T> {
        let response = self.client.get(&self.api_url).query(query).send().await?;
        if !response.status().is_success() {
            return Err(Error::Upstream(format!(
                "Wikipedia API returned status {}",
                response.status().as_u16()
            )));
        }
        Ok(response.json().await?)
    }

    async fn best_title(&self, query: &str) -> Result<Option<String>> {
        let response: SearchResponse = self
            .get(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("format", "json"),
                ("srlimit", "1"),
            ])
            .await?;

        Ok(response
            .query
            .and_then(|q| q.search.into_iter().next())
            .map(|hit| hit.title))
    }

    async fn page(&self, title: &str) -> Result<Option<Page>> {
        let response: PageResponse = self
            .get(&[
                ("action", "query"),
                ("prop", "extracts|pageprops|info"),
                ("inprop", "url"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", title),
                ("format", "json"),
                ("formatversion", "2"),
            ])
            .await?;

        Ok(response.query.and_then(|q| q.pages.into_iter().next()))
    }

    async fn lookup(&self, query: &str) -> Result<std::result::Result<Page, Lookup>> {
        let Some(title) = self.best_title(query).await? else {
            return Ok(Err(Lookup::NoResults));
        };

        let page = match self.page(&title).await? {
            Some(page) if !page.missing => page,
            _ => return Ok(Err(Lookup::NotFound)),
        };

        if page
            .pageprops
            .as_ref()
            .is_some_and(|props| props.disambiguation.is_some())
        {
            return Ok(Err(Lookup::Disambiguation(page.title)));
        }

        Ok(Ok(page))
    }
}

#[async_trait]
impl Plugin for WikipediaPlugin {
    fn source_name(&self) -> &str {
        "Wikipedia"
    }

    fn call_specs(&self) -> &[CallSpec] {
        &self.specs
    }

    async fn run(&self, _operation: &str, _ctx: &Context, params: Params) -> Result<Envelope> {
        let query = params.require_str("query")?.trim();
        if query.is_empty() {
            return Ok(Envelope::error("Query is required"));
        }

        match self.lookup(query).await? {
            Ok(page) => {
                tracing::debug!(query, title = %page.title, "found Wikipedia article");
                let url = page.fullurl.unwrap_or_default();
                Ok(Envelope::result(json!({
                    "title": page.title,
                    "content": page.extract,
                    "url": url,
                })))
            }
            Err(miss) => {
                tracing::debug!(query, ?miss, "Wikipedia lookup found no article");
                Ok(Envelope::error(miss.message()))
            }
        }
    }
}
