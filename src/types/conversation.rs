use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A persisted chat thread as listed by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    /// Backend-assigned identifier.
    pub id: String,

    /// Thread title.
    #[serde(default)]
    pub title: Option<String>,

    /// The most recent message, truncated by the backend.
    #[serde(default)]
    pub last_message_preview: Option<String>,

    /// When the thread was created.
    #[serde(default, with = "crate::utils::time::option")]
    pub created_at: Option<OffsetDateTime>,

    /// When the thread last changed.
    #[serde(default, with = "crate::utils::time::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl Conversation {
    /// Creates a conversation with only an id and title.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: Some(title.into()),
            last_message_preview: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Sets the preview line.
    pub fn with_preview(mut self, preview: impl Into<String>) -> Self {
        self.last_message_preview = Some(preview.into());
        self
    }

    /// The title for list display.
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or("Conversation")
    }

    /// The preview for list display.
    pub fn display_preview(&self) -> &str {
        self.last_message_preview
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or("No messages yet")
    }
}

/// Body of `POST /api/conversations`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationCreate {
    /// Optional title; the backend picks one when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}
