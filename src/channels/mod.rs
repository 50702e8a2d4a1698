//! Messaging channel adapters
//!
//! A channel is where envelopes end up: text for results and errors, file
//! uploads for artifacts. Each adapter implements [`Transport`].

pub mod telegram;

use std::path::Path;

use async_trait::async_trait;

pub use telegram::{ChatId, TelegramChannel};

use crate::plugins::{ArtifactKind, Context};
use crate::Result;

/// Where a delivery goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Destination chat
    pub chat: ChatId,
    /// Message to reply to
    pub reply_to: Option<i64>,
    /// Forum topic
    pub thread_id: Option<i64>,
}

impl Target {
    /// Target a chat with no reply or topic
    #[must_use]
    pub const fn new(chat: ChatId) -> Self {
        Self {
            chat,
            reply_to: None,
            thread_id: None,
        }
    }

    /// Reply in the conversation an invocation came from
    ///
    /// Returns `None` when the context carries no chat.
    #[must_use]
    pub fn from_context(ctx: &Context) -> Option<Self> {
        Some(Self {
            chat: ChatId::Id(ctx.chat_id?),
            reply_to: ctx.message_id,
            thread_id: ctx.thread_id,
        })
    }
}

/// Location of an artifact to send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactSource<'a> {
    /// Local file, uploaded by the adapter
    Path(&'a Path),
    /// Remote URL, fetched by the platform
    Url(&'a str),
}

/// Trait for outbound messaging adapters
#[async_trait]
pub trait Transport: Send + Sync {
    /// Get the channel name
    fn name(&self) -> &'static str;

    /// Send a text message
    ///
    /// # Errors
    ///
    /// Returns error if the platform rejects the message
    async fn send_text(&self, target: &Target, text: &str) -> Result<()>;

    /// Send one artifact
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or the platform rejects it
    async fn send_artifact(
        &self,
        target: &Target,
        kind: ArtifactKind,
        source: &ArtifactSource<'_>,
    ) -> Result<()>;
}
