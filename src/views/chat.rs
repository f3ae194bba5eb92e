use std::fmt;

use tracing::{debug, info};

use crate::auth::SessionContext;
use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::observability::{CHAT_CONVERSATIONS_CREATED, CHAT_MESSAGES_SENT};
use crate::router::{Navigator, Route};
use crate::types::{
    ChatRequest, Conversation, ConversationCreate, DisplayMessage, Session, normalize_messages,
};

/// Title shown when no listed conversation is open.
pub const NEW_CHAT_TITLE: &str = "New Chat";

/// Progress of the thread pane.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SendStatus {
    /// No conversation open.
    #[default]
    Idle,
    /// Fetching history.
    Loading,
    /// Creating a conversation.
    Creating,
    /// Waiting for the assistant.
    Sending,
    /// History is current.
    Ready,
    /// The last operation failed with this message.
    Failed(String),
}

impl SendStatus {
    /// The failure message, if the last operation failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            SendStatus::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// True while a message is in flight; the composer is disabled.
    pub fn is_sending(&self) -> bool {
        matches!(self, SendStatus::Sending)
    }
}

impl fmt::Display for SendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendStatus::Idle => write!(f, "idle"),
            SendStatus::Loading => write!(f, "loading"),
            SendStatus::Creating => write!(f, "creating"),
            SendStatus::Sending => write!(f, "sending"),
            SendStatus::Ready => write!(f, "ready"),
            SendStatus::Failed(message) => write!(f, "{message}"),
        }
    }
}

/// The chat page: conversation list, open thread, and composer.
///
/// Every operation takes the [`SessionContext`] explicitly and records
/// failures in [`ChatView::status`] instead of returning them.
#[derive(Debug, Clone, Default)]
pub struct ChatView {
    chat_id: Option<String>,
    messages: Vec<DisplayMessage>,
    conversations: Vec<Conversation>,
    sidebar_loading: bool,
    input: String,
    status: SendStatus,
    local_sequence: u64,
}

impl ChatView {
    pub fn new() -> Self {
        Self {
            sidebar_loading: true,
            ..Self::default()
        }
    }

    pub fn chat_id(&self) -> Option<&str> {
        self.chat_id.as_deref()
    }

    pub fn messages(&self) -> &[DisplayMessage] {
        &self.messages
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn sidebar_loading(&self) -> bool {
        self.sidebar_loading
    }

    pub fn status(&self) -> &SendStatus {
        &self.status
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    /// The open conversation's title, or "New Chat".
    pub fn current_title(&self) -> &str {
        self.chat_id
            .as_deref()
            .and_then(|id| self.conversations.iter().find(|c| c.id == id))
            .and_then(|c| c.title.as_deref())
            .filter(|title| !title.is_empty())
            .unwrap_or(NEW_CHAT_TITLE)
    }

    /// Loads the list and the thread for `chat_id`.
    pub async fn mount(
        &mut self,
        context: &SessionContext,
        backend: &dyn Backend,
        chat_id: Option<&str>,
    ) {
        self.load_conversations(context, backend).await;
        self.open(context, backend, chat_id.map(str::to_string)).await;
    }

    /// Follows a route change.  A new conversation id loads its history; no id
    /// clears the thread.
    pub async fn sync_route(
        &mut self,
        context: &SessionContext,
        backend: &dyn Backend,
        chat_id: Option<&str>,
    ) {
        if self.chat_id.as_deref() == chat_id {
            return;
        }
        self.open(context, backend, chat_id.map(str::to_string)).await;
    }

    async fn open(&mut self, context: &SessionContext, backend: &dyn Backend, chat_id: Option<String>) {
        self.chat_id = chat_id;
        match self.chat_id.clone() {
            Some(id) => self.load_messages(context, backend, &id).await,
            None => {
                self.messages.clear();
                self.status = SendStatus::Idle;
            }
        }
    }

    /// Navigates to `/chat/<id>` and follows the route.
    async fn go_to(
        &mut self,
        context: &SessionContext,
        backend: &dyn Backend,
        navigator: &mut Navigator,
        id: &str,
        replace: bool,
    ) {
        navigator.navigate(Route::conversation(id), replace);
        self.sync_route(context, backend, Some(id)).await;
    }

    /// Refreshes the conversation list.  The list keeps its last successful
    /// contents on failure.
    pub async fn load_conversations(&mut self, context: &SessionContext, backend: &dyn Backend) {
        self.sidebar_loading = true;
        let result = match context.require_session() {
            Ok(session) => backend.list_conversations(session).await,
            Err(err) => Err(err),
        };
        self.sidebar_loading = false;
        match result {
            Ok(list) => self.conversations = list,
            Err(err) => self.fail(err),
        }
    }

    /// Replaces the thread with the history of `id`.
    pub async fn load_messages(&mut self, context: &SessionContext, backend: &dyn Backend, id: &str) {
        let session = match context.require_session() {
            Ok(session) => session,
            Err(err) => return self.fail(err),
        };
        self.status = SendStatus::Loading;
        match backend.get_messages(session, id).await {
            Ok(history) => {
                self.messages = normalize_messages(&history);
                self.status = SendStatus::Ready;
            }
            Err(err) => self.fail(err),
        }
    }

    /// Creates an empty conversation, refreshes the list, and opens it.
    /// Returns the new id.
    pub async fn create_conversation(
        &mut self,
        context: &SessionContext,
        backend: &dyn Backend,
        navigator: &mut Navigator,
        replace: bool,
    ) -> Option<String> {
        let session = match context.require_session() {
            Ok(session) => session,
            Err(err) => {
                self.fail(err);
                return None;
            }
        };
        self.status = SendStatus::Creating;
        let conversation = match backend
            .create_conversation(session, &ConversationCreate::default())
            .await
        {
            Ok(conversation) => conversation,
            Err(err) => {
                self.fail(err);
                return None;
            }
        };
        CHAT_CONVERSATIONS_CREATED.click();
        info!(conversation_id = %conversation.id, "created conversation");
        self.load_conversations(context, backend).await;
        self.go_to(context, backend, navigator, &conversation.id, replace)
            .await;
        Some(conversation.id)
    }

    /// Sends the composer text, or `text` when given.
    ///
    /// Blank input does nothing.  Without an open conversation one is created
    /// first (replacing the current history entry).  The user's message shows
    /// immediately; afterwards the thread and list are reloaded from the
    /// backend, and the route follows the conversation the backend stored the
    /// exchange in.
    pub async fn send(
        &mut self,
        context: &SessionContext,
        backend: &dyn Backend,
        navigator: &mut Navigator,
        text: Option<&str>,
    ) {
        let trimmed = text.unwrap_or(self.input.as_str()).trim().to_string();
        if trimmed.is_empty() {
            return;
        }
        let session = match context.require_session() {
            Ok(session) => session.clone(),
            Err(err) => return self.fail(err),
        };
        let conversation_id = match self.chat_id.clone() {
            Some(id) => id,
            None => match self.create_conversation(context, backend, navigator, true).await {
                Some(id) => id,
                None => return,
            },
        };

        self.local_sequence += 1;
        self.messages
            .push(DisplayMessage::local_user(self.local_sequence, trimmed.clone()));
        self.input.clear();
        self.status = SendStatus::Sending;

        if let Err(err) = self
            .exchange(context, backend, navigator, &session, &trimmed, &conversation_id)
            .await
        {
            self.fail(err);
        }
    }

    async fn exchange(
        &mut self,
        context: &SessionContext,
        backend: &dyn Backend,
        navigator: &mut Navigator,
        session: &Session,
        message: &str,
        conversation_id: &str,
    ) -> Result<()> {
        let response = backend
            .send_message(session, &ChatRequest::new(message, conversation_id))
            .await?;
        CHAT_MESSAGES_SENT.click();
        debug!(conversation_id = %response.conversation_id, "reply received");
        self.load_messages(context, backend, conversation_id).await;
        if !response.conversation_id.is_empty() && response.conversation_id != conversation_id {
            self.go_to(context, backend, navigator, &response.conversation_id, true)
                .await;
        }
        self.load_conversations(context, backend).await;
        Ok(())
    }

    /// Opens a listed conversation, adding a history entry.
    pub async fn select(
        &mut self,
        context: &SessionContext,
        backend: &dyn Backend,
        navigator: &mut Navigator,
        id: &str,
    ) {
        self.go_to(context, backend, navigator, id, false).await;
    }

    /// Deletes a conversation.  Deleting the open one returns to `/chat`.
    pub async fn delete(
        &mut self,
        context: &SessionContext,
        backend: &dyn Backend,
        navigator: &mut Navigator,
        id: &str,
    ) {
        let session = match context.require_session() {
            Ok(session) => session,
            Err(err) => return self.fail(err),
        };
        if let Err(err) = backend.delete_conversation(session, id).await {
            return self.fail(err);
        }
        info!(conversation_id = id, "deleted conversation");
        self.conversations.retain(|c| c.id != id);
        if self.chat_id.as_deref() == Some(id) {
            navigator.replace(Route::chat());
            self.sync_route(context, backend, None).await;
        }
        self.load_conversations(context, backend).await;
    }

    fn fail(&mut self, err: Error) {
        debug!(error = %err, "chat operation failed");
        self.status = SendStatus::Failed(err.to_string());
    }
}
