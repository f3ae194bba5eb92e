use std::fmt;

use serde::{Deserialize, Serialize};

/// Author of a stored message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Written by the user.
    User,
    /// Written by the assistant model.
    Model,
    /// Anything else the backend may send, such as `assistant`; kept
    /// verbatim so ids carry the stored role name.
    #[serde(untagged)]
    Other(String),
}

impl Role {
    /// The wire name of the role.
    pub fn as_str(&self) -> &str {
        match self {
            Role::User => "user",
            Role::Model => "model",
            Role::Other(other) => other,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of `GET /api/conversations/:id/messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    /// Who wrote it.
    pub role: Role,
    /// Text fragments; the first one is the content.
    #[serde(default)]
    pub parts: Vec<String>,
}

impl HistoryMessage {
    /// Creates a single-part message.
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![text.into()],
        }
    }

    /// The message content, or the empty string.
    pub fn text(&self) -> &str {
        self.parts.first().map(String::as_str).unwrap_or("")
    }
}

/// Who a rendered message is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    /// The signed-in user; rendered as literal text.
    User,
    /// The assistant; rendered as sanitized HTML.
    Assistant,
}

/// A message ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMessage {
    /// Synthetic identifier, unique within one thread.
    pub id: String,
    /// Attribution.
    pub sender: Sender,
    /// Raw content as stored.
    pub text: String,
}

impl DisplayMessage {
    /// Creates an optimistic user message shown before the backend confirms it.
    pub fn local_user(sequence: u64, text: impl Into<String>) -> Self {
        Self {
            id: format!("local-{sequence}"),
            sender: Sender::User,
            text: text.into(),
        }
    }

    /// True for assistant-authored messages.
    pub fn is_assistant(&self) -> bool {
        self.sender == Sender::Assistant
    }
}

/// Converts fetched history into display records.
///
/// Ids are `<role>-<index>`; only the `user` role maps to [`Sender::User`].
pub fn normalize_messages(history: &[HistoryMessage]) -> Vec<DisplayMessage> {
    history
        .iter()
        .enumerate()
        .map(|(index, msg)| DisplayMessage {
            id: format!("{}-{}", msg.role, index),
            sender: if msg.role == Role::User {
                Sender::User
            } else {
                Sender::Assistant
            },
            text: msg.text().to_string(),
        })
        .collect()
}
