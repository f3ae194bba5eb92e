//! The backend seam the views are written against.

use crate::error::Result;
use crate::types::{
    ChatRequest, ChatResponse, Conversation, ConversationCreate, Health, HistoryMessage, Profile,
    ProfileForm, Session,
};

/// The diet-assistant backend, one method per REST endpoint.
///
/// [`EasyDiet`](crate::EasyDiet) is the HTTP implementation.  Every call is
/// made on behalf of `session` except the health probe; none of them retry
/// or cache.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// `GET /api/health`
    async fn health(&self) -> Result<Health>;

    /// `GET /api/profile`
    async fn get_profile(&self, session: &Session) -> Result<Profile>;

    /// `PUT /api/profile`, replacing both fields.
    async fn update_profile(&self, session: &Session, form: &ProfileForm) -> Result<Profile>;

    /// `GET /api/conversations`
    async fn list_conversations(&self, session: &Session) -> Result<Vec<Conversation>>;

    /// `POST /api/conversations`
    async fn create_conversation(
        &self,
        session: &Session,
        body: &ConversationCreate,
    ) -> Result<Conversation>;

    /// `DELETE /api/conversations/:id`
    async fn delete_conversation(&self, session: &Session, conversation_id: &str) -> Result<()>;

    /// `GET /api/conversations/:id/messages`
    async fn get_messages(
        &self,
        session: &Session,
        conversation_id: &str,
    ) -> Result<Vec<HistoryMessage>>;

    /// `POST /api/chat`
    async fn send_message(&self, session: &Session, request: &ChatRequest) -> Result<ChatResponse>;
}
