//! Web tools for HTTP operations

mod fetch;
mod markdown;

pub use fetch::{WebFetchTool, WebResponse, build_client, is_blocked_ip};
pub use markdown::{html_to_markdown, html_to_text};
