//! Per-invocation context

use uuid::Uuid;

/// Conversation the invocation came from
///
/// Plugins only read it; the host uses it to route results back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    /// Correlates log lines of one invocation
    pub request_id: Uuid,
    /// Chat the request was made in
    pub chat_id: Option<i64>,
    /// Message that triggered the request
    pub message_id: Option<i64>,
    /// Forum topic, when the chat has topics
    pub thread_id: Option<i64>,
    /// User who made the request
    pub user_id: Option<i64>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Context with a fresh request id and no conversation
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            chat_id: None,
            message_id: None,
            thread_id: None,
            user_id: None,
        }
    }

    /// Set the chat
    #[must_use]
    pub const fn with_chat(mut self, chat_id: i64) -> Self {
        self.chat_id = Some(chat_id);
        self
    }

    /// Set the triggering message
    #[must_use]
    pub const fn with_message(mut self, message_id: i64) -> Self {
        self.message_id = Some(message_id);
        self
    }

    /// Set the forum topic
    #[must_use]
    pub const fn with_thread(mut self, thread_id: i64) -> Self {
        self.thread_id = Some(thread_id);
        self
    }

    /// Set the requesting user
    #[must_use]
    pub const fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }
}
