//! Raw Telegram Bot API calls

use std::path::Path;

use reqwest::multipart::{Form, Part};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::types::{ChatId, MediaMethod, SendMessageRequest, SendOptions, SentMessage, TelegramResponse};
use crate::channels::ArtifactSource;
use crate::{Error, Result};

impl super::TelegramChannel {
    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_root, self.token.expose_secret())
    }

    /// Send a plain-text message, returning its message id
    ///
    /// If the forum topic no longer exists the message is retried once in
    /// the main chat.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or Telegram rejects it
    pub async fn send_message(
        &self,
        chat_id: &ChatId,
        text: &str,
        options: SendOptions,
    ) -> Result<i64> {
        let mut thread_id = options.thread_id;
        loop {
            let request = SendMessageRequest {
                chat_id,
                text,
                reply_to_message_id: options.reply_to,
                message_thread_id: thread_id,
                disable_web_page_preview: Some(true),
            };

            let response = self
                .client
                .post(self.method_url("sendMessage"))
                .json(&request)
                .send()
                .await
                .map_err(|e| Error::Channel(format!("Telegram API error: {e}")))?;

            match parse_response::<SentMessage>(response).await {
                Ok(sent) => {
                    tracing::debug!(chat_id = %chat_id, message_id = sent.message_id, "Telegram message sent");
                    return Ok(sent.message_id);
                }
                Err(Error::Channel(description))
                    if thread_id.is_some()
                        && description.to_lowercase().contains("message thread not found") =>
                {
                    tracing::debug!(chat_id = %chat_id, "topic gone, retrying without thread");
                    thread_id = None;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Send a photo or document from a local file or a URL
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, the request fails, or
    /// Telegram rejects it
    pub async fn send_media(
        &self,
        method: MediaMethod,
        chat_id: &ChatId,
        source: &ArtifactSource<'_>,
        options: SendOptions,
    ) -> Result<i64> {
        let url = self.method_url(method.method());

        let request = match source {
            ArtifactSource::Url(media_url) => {
                let mut body = Map::new();
                body.insert("chat_id".to_string(), serde_json::to_value(chat_id)?);
                body.insert(method.field().to_string(), Value::String((*media_url).to_string()));
                if let Some(reply_to) = options.reply_to {
                    body.insert("reply_to_message_id".to_string(), reply_to.into());
                }
                if let Some(thread_id) = options.thread_id {
                    body.insert("message_thread_id".to_string(), thread_id.into());
                }
                self.client.post(&url).json(&body)
            }
            ArtifactSource::Path(path) => {
                let form = upload_form(method, chat_id, path, options).await?;
                self.client.post(&url).multipart(form)
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| Error::Channel(format!("Telegram API error: {e}")))?;
        let sent = parse_response::<SentMessage>(response).await?;

        tracing::debug!(chat_id = %chat_id, method = method.method(), "Telegram media sent");
        Ok(sent.message_id)
    }
}

async fn upload_form(
    method: MediaMethod,
    chat_id: &ChatId,
    path: &Path,
    options: SendOptions,
) -> Result<Form> {
    let data = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().into_owned());

    let mut form = Form::new()
        .text("chat_id", chat_id.to_string())
        .part(method.field(), Part::bytes(data).file_name(file_name));
    if let Some(reply_to) = options.reply_to {
        form = form.text("reply_to_message_id", reply_to.to_string());
    }
    if let Some(thread_id) = options.thread_id {
        form = form.text("message_thread_id", thread_id.to_string());
    }
    Ok(form)
}

/// Decode a Bot API response, turning `ok: false` into a channel error
async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::Channel(format!("Telegram response read error: {e}")))?;

    let parsed: TelegramResponse<T> = serde_json::from_str(&body)
        .map_err(|_| Error::Channel(format!("{status} - {body}")))?;

    match parsed {
        TelegramResponse {
            ok: true,
            result: Some(result),
            ..
        } => Ok(result),
        TelegramResponse { description, .. } => Err(Error::Channel(
            description.unwrap_or_else(|| format!("request failed with {status}")),
        )),
    }
}
