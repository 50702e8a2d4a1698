//! Posting to a moderated Telegram channel

use async_trait::async_trait;
use reqwest::Client;
use secrecy::SecretString;
use serde_json::json;

use crate::channels::telegram::SendOptions;
use crate::channels::telegram::chunking::{DEFAULT_LIMIT, chunk_text};
use crate::channels::{ChatId, TelegramChannel};
use crate::config::TelegramConfig;
use crate::plugins::{CallSpec, Context, Envelope, ParamSpec, Params, Plugin};
use crate::{Error, Result};

/// Posts messages to the configured channel with a dedicated bot
pub struct TelegramModeratorPlugin {
    client: Client,
    api_root: String,
    token: Option<SecretString>,
    channel_id: Option<String>,
    allowed_user_ids: Vec<i64>,
    specs: Vec<CallSpec>,
}

impl TelegramModeratorPlugin {
    /// Create the plugin; token and channel are checked per call
    #[must_use]
    pub fn new(client: Client, api_root: &str, config: &TelegramConfig) -> Self {
        Self {
            client,
            api_root: api_root.to_string(),
            token: config.moderator_token.clone(),
            channel_id: config.channel_id.clone(),
            allowed_user_ids: config.allowed_user_ids.clone(),
            specs: vec![
                CallSpec::new(
                    "telegram_moderator",
                    "Moderate a Telegram channel: send a message to the channel",
                )
                .param(
                    "action",
                    ParamSpec::string("The action to perform").required().one_of(&["send"]),
                )
                .param(
                    "message_text",
                    ParamSpec::string("The text of the message to send").required(),
                ),
            ],
        }
    }

    fn allows(&self, user_id: Option<i64>) -> bool {
        self.allowed_user_ids.is_empty()
            || user_id.is_some_and(|id| self.allowed_user_ids.contains(&id))
    }

    async fn send(&self, text: &str) -> Result<serde_json::Value> {
        let token = self
            .token
            .clone()
            .ok_or_else(|| Error::missing_setting("BOT_TOKEN_MODERATOR"))?;
        let channel = self
            .channel_id
            .as_deref()
            .ok_or_else(|| Error::missing_setting("CHANNEL_ID"))?;

        let bot = TelegramChannel::new(token, self.client.clone(), &self.api_root);
        let chat = ChatId::from(channel);

        let chunks = chunk_text(text, DEFAULT_LIMIT);
        if chunks.is_empty() {
            return Err(Error::Validation("message_text is empty".to_string()));
        }

        let mut message_ids = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let id = bot
                .send_message(&chat, chunk, SendOptions::default())
                .await
                .map_err(|e| match e {
                    Error::Channel(description) => {
                        Error::Upstream(format!("Telegram error: {description}"))
                    }
                    other => Error::Upstream(format!("Telegram error: {other}")),
                })?;
            message_ids.push(id);
        }

        tracing::info!(chat_id = %chat, messages = message_ids.len(), "posted to moderated channel");
        Ok(json!({ "chat_id": chat, "message_ids": message_ids }))
    }
}

#[async_trait]
impl Plugin for TelegramModeratorPlugin {
    fn source_name(&self) -> &str {
        "TelegramModerator"
    }

    fn call_specs(&self) -> &[CallSpec] {
        &self.specs
    }

    async fn run(&self, _operation: &str, ctx: &Context, params: Params) -> Result<Envelope> {
        if !self.allows(ctx.user_id) {
            tracing::info!(user_id = ?ctx.user_id, "moderation request from user not allowed");
            return Ok(Envelope::result(json!({
                "status": "ignored",
                "reason": "User not allowed",
            })));
        }

        let action = params.require_str("action")?;
        let text = params.require_str("message_text")?;

        match action {
            "send" => {
                let details = self.send(text).await?;
                Ok(Envelope::result(json!({
                    "status": "success",
                    "action": "send",
                    "details": details,
                })))
            }
            other => Err(Error::Validation(format!("unsupported action: {other}"))),
        }
    }
}
