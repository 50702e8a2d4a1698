//! Telegram channel adapter
//!
//! Sends plugin output through the Bot API. Only the outbound half is
//! implemented; updates are received by the host bot.

mod api;
pub mod chunking;
pub mod types;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::SecretString;

use super::{ArtifactSource, Target, Transport};
use crate::plugins::ArtifactKind;
use crate::Result;

pub use types::{API_BASE, ChatId, MediaMethod, SendOptions};

/// Telegram channel adapter
#[derive(Clone)]
pub struct TelegramChannel {
    token: SecretString,
    client: Client,
    api_root: String,
}

impl std::fmt::Debug for TelegramChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramChannel")
            .field("api_root", &self.api_root)
            .finish_non_exhaustive()
    }
}

impl TelegramChannel {
    /// Create an adapter for one bot token
    ///
    /// `api_root` is the Bot API base URL, normally [`API_BASE`].
    #[must_use]
    pub fn new(token: SecretString, client: Client, api_root: &str) -> Self {
        Self {
            token,
            client,
            api_root: api_root.trim_end_matches('/').to_string(),
        }
    }
}

impl SendOptions {
    fn for_target(target: &Target) -> Self {
        Self {
            reply_to: target.reply_to,
            thread_id: target.thread_id,
        }
    }
}

#[async_trait]
impl Transport for TelegramChannel {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn send_text(&self, target: &Target, text: &str) -> Result<()> {
        self.send_message(&target.chat, text, SendOptions::for_target(target))
            .await
            .map(|_| ())
    }

    async fn send_artifact(
        &self,
        target: &Target,
        kind: ArtifactKind,
        source: &ArtifactSource<'_>,
    ) -> Result<()> {
        let method = match kind {
            ArtifactKind::Photo => MediaMethod::Photo,
            ArtifactKind::Document | ArtifactKind::File => MediaMethod::Document,
        };
        self.send_media(method, &target.chat, source, SendOptions::for_target(target))
            .await
            .map(|_| ())
    }
}
