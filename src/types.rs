use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

pub const NEW_CHAT_TITLE: &str = "New Chat";

const TITLE_SOURCE_CHARS: usize = 30;
const DISPLAY_TITLE_MAX: usize = 20;
const DISPLAY_TITLE_KEEP: usize = 17;

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// A single chat line. Never mutated after creation; sessions replace their whole
/// message list instead.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub is_user: bool,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>, image_uri: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            is_user: true,
            timestamp: now_millis(),
            image_uri,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            is_user: false,
            timestamp: now_millis(),
            image_uri: None,
        }
    }

    pub fn role(&self) -> Role {
        if self.is_user { Role::User } else { Role::Model }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tab-level view of a conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: SessionId,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub last_updated: i64,
}

impl ChatSession {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: SessionId::new(),
            title: title.into(),
            messages: Vec::new(),
            last_updated: now_millis(),
        }
    }

    /// Title shown on the tab bar.
    pub fn display_title(&self) -> String {
        if self.title.chars().count() > DISPLAY_TITLE_MAX {
            let head: String = self.title.chars().take(DISPLAY_TITLE_KEEP).collect();
            format!("{head}...")
        } else {
            self.title.clone()
        }
    }

    /// Returns a copy carrying `messages`. A session still titled "New Chat" takes its
    /// title from the first message.
    pub fn with_messages(&self, messages: Vec<ChatMessage>) -> Self {
        let title = match messages.first() {
            Some(first) if self.title == NEW_CHAT_TITLE => first
                .content
                .chars()
                .take(TITLE_SOURCE_CHARS)
                .collect::<String>()
                .replace('\n', " "),
            _ => self.title.clone(),
        };
        Self {
            id: self.id.clone(),
            title,
            messages,
            last_updated: now_millis(),
        }
    }
}
