//! One request/response turn against a chat-completion backend.
//!
//! [`ConversationClient::send`] takes history by reference and hands back a new
//! history on success, so a failed turn can never leave half a turn behind.

use crate::config::ChatSettings;
use crate::error::Result;
use crate::llm::{ChatBackend, ChatRequest};
use crate::message::{ConversationHistory, Message};
use tracing::debug;

pub struct ConversationClient<B> {
    backend: B,
    settings: ChatSettings,
}

impl<B: ChatBackend> ConversationClient<B> {
    pub fn new(backend: B, settings: ChatSettings) -> Self {
        Self { backend, settings }
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Ordered payload: optional system message, the history, then the new input
    pub fn build_messages(
        user_input: &str,
        history: &ConversationHistory,
        system_prompt: Option<&str>,
    ) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 2);

        if let Some(prompt) = system_prompt {
            messages.push(Message::system(prompt));
        }
        messages.extend(history.iter().cloned());
        messages.push(Message::user(user_input));

        messages
    }

    /// Send one turn and return the reply with the extended history.
    ///
    /// Empty input is forwarded as-is.
    pub async fn send(
        &self,
        user_input: &str,
        history: &ConversationHistory,
        system_prompt: Option<&str>,
    ) -> Result<(String, ConversationHistory)> {
        let messages = Self::build_messages(user_input, history, system_prompt);
        let request = ChatRequest::new(self.settings.model.clone(), messages)
            .with_settings(&self.settings);

        let reply = self.backend.complete(&request).await?;
        debug!(history = history.len() + 2, "turn completed");

        let updated = history.with_turn(user_input, reply.clone());
        Ok((reply, updated))
    }
}
