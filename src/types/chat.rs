use serde::{Deserialize, Serialize};

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    /// The user's message.
    pub message: String,
    /// Conversation to append to.
    pub conversation_id: Option<String>,
}

impl ChatRequest {
    /// Creates a request addressed to an existing conversation.
    pub fn new(message: impl Into<String>, conversation_id: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            conversation_id: Some(conversation_id.into()),
        }
    }
}

/// Response of `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatResponse {
    /// The assistant's reply (HTML).
    pub reply: String,
    /// The conversation the exchange was stored in.  May differ from the request.
    pub conversation_id: String,
    /// Model that produced the reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Response of `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Health {
    /// Whether the backend considers itself healthy.
    pub ok: bool,
    /// Model configured on the backend.
    #[serde(default)]
    pub model: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_body_shape() {
        let request = ChatRequest::new("Hello", "c1");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"message": "Hello", "conversation_id": "c1"})
        );
    }

    #[test]
    fn response_without_model() {
        let response: ChatResponse =
            serde_json::from_value(json!({"reply": "<p>Hi</p>", "conversation_id": "c9"})).unwrap();
        assert_eq!(response.conversation_id, "c9");
        assert!(response.model.is_none());
    }
}
