//! Telegram Bot API request/response types

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default Bot API root
pub const API_BASE: &str = "https://api.telegram.org";

/// Chat identifier: numeric id or `@channelusername`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatId {
    /// Numeric chat id (negative for groups and channels)
    Id(i64),
    /// Public username, including the leading `@`
    Username(String),
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Username(name) => f.write_str(name),
        }
    }
}

impl From<&str> for ChatId {
    fn from(s: &str) -> Self {
        let s = s.trim();
        s.parse::<i64>()
            .map_or_else(|_| Self::Username(s.to_string()), Self::Id)
    }
}

impl From<i64> for ChatId {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

/// Routing options shared by every send method
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Message to reply to
    pub reply_to: Option<i64>,
    /// Forum topic to post in
    pub thread_id: Option<i64>,
}

/// `sendMessage` body
#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub chat_id: &'a ChatId,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_thread_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_web_page_preview: Option<bool>,
}

/// Media upload methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaMethod {
    /// `sendPhoto` (compressed inline image)
    Photo,
    /// `sendDocument` (file as-is)
    Document,
}

impl MediaMethod {
    /// Bot API method name
    #[must_use]
    pub const fn method(self) -> &'static str {
        match self {
            Self::Photo => "sendPhoto",
            Self::Document => "sendDocument",
        }
    }

    /// Form field carrying the media
    #[must_use]
    pub const fn field(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Document => "document",
        }
    }
}

/// Envelope of every Bot API response
#[derive(Debug, Deserialize)]
pub struct TelegramResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

/// Message returned by send methods
#[derive(Debug, Deserialize)]
pub struct SentMessage {
    pub message_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_id_parses_numbers_and_usernames() {
        assert_eq!(ChatId::from("-1001234"), ChatId::Id(-1_001_234));
        assert_eq!(
            ChatId::from(" @my_channel "),
            ChatId::Username("@my_channel".to_string())
        );
    }

    #[test]
    fn chat_id_serializes_untagged() {
        assert_eq!(serde_json::to_value(ChatId::Id(5)).unwrap(), 5);
        assert_eq!(
            serde_json::to_value(ChatId::Username("@c".to_string())).unwrap(),
            "@c"
        );
    }

    #[test]
    fn send_message_omits_empty_options() {
        let chat = ChatId::Id(1);
        let request = SendMessageRequest {
            chat_id: &chat,
            text: "hi",
            reply_to_message_id: None,
            message_thread_id: Some(9),
            disable_web_page_preview: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({"chat_id": 1, "text": "hi", "message_thread_id": 9}));
    }
}
