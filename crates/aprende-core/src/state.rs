//! UI-agnostic conversation state
//!
//! This module contains the data structures behind the chat widget. They
//! don't depend on any UI framework, so the TUI and the one-shot CLI share
//! them and tests can drive them directly.

use crate::format::Reply;

/// Greeting shown as the first assistant message of every conversation
pub const GREETING: &str = "Hello! I'm your AI assistant. How can I help you today?";

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

/// Body of a chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Shown verbatim
    Text(String),
    /// Formatted assistant reply
    Reply(Reply),
}

/// A chat message in the AI conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: Content,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: Content::Text(text.into()),
        }
    }

    pub fn assistant(reply: Reply) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: Content::Reply(reply),
        }
    }
}

/// Messages, draft input and the awaiting-response flag of one widget.
///
/// Messages are append-only; the only way to change any field is through
/// the transition methods below.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    draft: String,
    awaiting: bool,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            messages: vec![ChatMessage {
                role: ChatRole::Assistant,
                content: Content::Text(GREETING.to_string()),
            }],
            draft: String::new(),
            awaiting: false,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn is_awaiting(&self) -> bool {
        self.awaiting
    }

    pub fn append_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn set_awaiting(&mut self, awaiting: bool) {
        self.awaiting = awaiting;
    }

    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.draft = draft.into();
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
