//! Shared tooling used by plugins

pub mod process;
mod web;

pub use web::{
    WebFetchTool, WebResponse, build_client, html_to_markdown, html_to_text, is_blocked_ip,
};
