//! Message records stored in `RunState::messages`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Tool,
}

/// A single entry in the append-only `messages` sequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Name of the agent that produced this message, if any (absent for user/system messages).
    pub agent: Option<String>,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            agent: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn from_agent(agent: impl Into<String>, content: impl Into<String>) -> Self {
        let mut m = Self::new(MessageRole::Assistant, content);
        m.agent = Some(agent.into());
        m
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }
}

/// Filter a message slice by role, preserving order.
pub fn filter_by_role(messages: &[Message], role: MessageRole) -> Vec<Message> {
    messages.iter().filter(|m| m.role == role).cloned().collect()
}

/// The most recently appended message, if any.
pub fn last_message(messages: &[Message]) -> Option<&Message> {
    messages.last()
}
