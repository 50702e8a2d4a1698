//! Public Telegram post scraper
//!
//! Uses the `?embed=1&mode=tme` widget page, which renders a single post as
//! static HTML.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use crate::plugins::{CallSpec, Context, Envelope, ParamSpec, Params, Plugin};
use crate::tools::{WebFetchTool, html_to_text};
use crate::Result;

/// Widget pages are only served to browser-like agents
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_13_6) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/77.0.3865.90 Safari/537.36 \
     TelegramBot (like TwitterBot)";

const EMBED_SUFFIX: &str = "?embed=1&mode=tme";

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

static MESSAGE_TEXT: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"div.tgme_widget_message_text[dir="auto"]"#));
static AUTHOR: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"div.tgme_widget_message_author span[dir="auto"]"#));
static DATETIME: LazyLock<Selector> =
    LazyLock::new(|| selector("span.tgme_widget_message_meta time.datetime"));
static PHOTO: LazyLock<Selector> =
    LazyLock::new(|| selector("a.tgme_widget_message_photo_wrap"));
static VIDEO: LazyLock<Selector> =
    LazyLock::new(|| selector("div.tgme_widget_message_video_wrap video"));

static BACKGROUND_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"background-image:url\('(.*)'\)").expect("valid regex")
});
static ASTERISKS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*+").expect("valid regex"));
static LEADING_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*[\\`]").expect("valid regex"));

/// One scraped post, or the reason it could not be scraped
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum PostOutcome {
    Scraped(Post),
    Failed { post_url: String, error: String },
}

#[derive(Debug, Serialize)]
struct Scraped {
    posts: Vec<PostOutcome>,
}

#[derive(Debug, Default, Serialize)]
struct Post {
    post_url: String,
    author: String,
    datetime: String,
    content: String,
    image_urls: Vec<String>,
    video_urls: Vec<String>,
}

/// Scrapes text, author, time and media links of public posts
pub struct TelegramScraperPlugin {
    fetcher: WebFetchTool,
    specs: Vec<CallSpec>,
}

impl TelegramScraperPlugin {
    /// Create the plugin around a guarded fetcher
    #[must_use]
    pub fn new(fetcher: WebFetchTool) -> Self {
        Self {
            fetcher,
            specs: vec![
                CallSpec::new(
                    "scrape_telegram_post",
                    "Scrapes a Telegram post given its URL (or multiple URLs separated by commas) \
                     and returns a dictionary with the post content, author, datetime, image URLs, \
                     and video URLs.",
                )
                .param(
                    "post_url",
                    ParamSpec::string(
                        "The Telegram post URL. For multiple posts, separate URLs with commas.",
                    )
                    .required(),
                ),
            ],
        }
    }

    async fn scrape(&self, post_url: String) -> PostOutcome {
        let page = match self
            .fetcher
            .fetch_with_headers(&post_url, &[("user-agent", USER_AGENT)])
            .await
        {
            Ok(page) if page.is_success() => page,
            Ok(page) => {
                return PostOutcome::Failed {
                    error: format!("HTTP {} for url: {post_url}", page.status),
                    post_url,
                };
            }
            Err(e) => {
                tracing::debug!(post_url, error = %e, "failed to fetch post");
                return PostOutcome::Failed {
                    post_url,
                    error: e.to_string(),
                };
            }
        };

        PostOutcome::Scraped(parse_post(post_url, &page.body))
    }
}

fn parse_post(post_url: String, html: &str) -> Post {
    let document = Html::parse_document(html);
    let first_text = |selector: &Selector| {
        document
            .select(selector)
            .next()
            .map(|el| clean_text(&el.html()))
            .unwrap_or_default()
    };

    Post {
        content: first_text(&MESSAGE_TEXT),
        author: first_text(&AUTHOR),
        datetime: first_text(&DATETIME),
        image_urls: document
            .select(&PHOTO)
            .filter_map(background_url)
            .collect(),
        video_urls: document
            .select(&VIDEO)
            .filter_map(|el| el.value().attr("src"))
            .filter(|src| !src.is_empty())
            .map(String::from)
            .collect(),
        post_url,
    }
}

fn background_url(el: ElementRef<'_>) -> Option<String> {
    let style = el.value().attr("style")?;
    BACKGROUND_URL
        .captures(style)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Plain text of an HTML fragment without Markdown residue
fn clean_text(html: &str) -> String {
    let text = html_to_text(html);
    let text = ASTERISKS.replace_all(&text, "");
    LEADING_ESCAPE.replace_all(&text, "").trim().to_string()
}

#[async_trait]
impl Plugin for TelegramScraperPlugin {
    fn source_name(&self) -> &str {
        "TelegramScraper"
    }

    fn call_specs(&self) -> &[CallSpec] {
        &self.specs
    }

    async fn run(&self, _operation: &str, _ctx: &Context, params: Params) -> Result<Envelope> {
        let post_url = params.require_str("post_url")?;
        let urls: Vec<String> = post_url
            .split(',')
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(|url| format!("{url}{EMBED_SUFFIX}"))
            .collect();

        if urls.is_empty() {
            return Ok(Envelope::error("No post URL provided."));
        }

        let posts = futures::future::join_all(urls.into_iter().map(|url| self.scrape(url))).await;
        let failed = posts
            .iter()
            .filter(|p| matches!(p, PostOutcome::Failed { .. }))
            .count();
        tracing::debug!(posts = posts.len(), failed, "scraped Telegram posts");

        Ok(Envelope::result(serde_json::to_value(Scraped { posts })?))
    }
}
