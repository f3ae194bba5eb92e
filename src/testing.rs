//! Fixtures shared by the unit tests: a one-shot HTTP responder and
//! in-memory fakes of the backend and the auth service.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::auth::{AuthChange, AuthEvent, AuthEvents, AuthService};
use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{
    ChatRequest, ChatResponse, Conversation, ConversationCreate, Credentials, Health,
    HistoryMessage, Profile, ProfileForm, Role, Session, SignUpRequest, User,
};
use crate::utils::time::now_unix;

/// What the one-shot server received.
#[derive(Debug, Clone)]
pub struct ServedRequest {
    /// Request line and headers.
    pub head: String,
    /// Request body.
    pub body: String,
}

/// Accepts one connection, answers it with `status` and `body`, and returns
/// what the client sent.
pub async fn serve_once(status: &str, body: &str) -> (String, JoinHandle<ServedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let head_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos;
            }
        };
        let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
        let content_length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        let mut body = buf[head_end + 4..].to_vec();
        while body.len() < content_length {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();
        ServedRequest {
            head,
            body: String::from_utf8_lossy(&body).to_string(),
        }
    });
    (format!("http://{addr}"), handle)
}

pub fn test_user() -> User {
    User::new("user-1", "a@example.com")
}

/// A session with no refresh token and no expiry.
pub fn test_session() -> Session {
    Session::new("test-token", test_user())
}

////////////////////////////////////////////// MockBackend /////////////////////////////////////////////

#[derive(Default)]
struct BackendState {
    profile: Profile,
    saved_profile: Option<ProfileForm>,
    conversations: Vec<Conversation>,
    messages: HashMap<String, Vec<HistoryMessage>>,
    failures: HashMap<&'static str, Error>,
    reassign_to: Option<String>,
    next_id: u64,
    calls: Vec<String>,
}

/// An in-memory backend that behaves like the real one for a single user.
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<BackendState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(self, profile: Profile) -> Self {
        self.lock().profile = profile;
        self
    }

    pub fn with_conversation(self, conversation: Conversation, history: Vec<HistoryMessage>) -> Self {
        {
            let mut state = self.lock();
            state.messages.insert(conversation.id.clone(), history);
            state.conversations.push(conversation);
        }
        self
    }

    /// Makes every call to `operation` fail with `err`.
    pub fn failing(self, operation: &'static str, err: Error) -> Self {
        self.lock().failures.insert(operation, err);
        self
    }

    /// Makes the chat endpoint answer in a different conversation.
    pub fn reassigning_to(self, conversation_id: &str) -> Self {
        self.lock().reassign_to = Some(conversation_id.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        self.lock().conversations.clone()
    }

    pub fn saved_profile(&self) -> Option<ProfileForm> {
        self.lock().saved_profile.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BackendState> {
        self.state.lock().unwrap()
    }

    fn enter(&self, operation: &'static str, session: Option<&Session>) -> Result<std::sync::MutexGuard<'_, BackendState>> {
        let mut state = self.lock();
        state.calls.push(operation.to_string());
        if let Some(err) = state.failures.get(operation) {
            return Err(err.clone());
        }
        if let Some(session) = session {
            assert!(!session.access_token.is_empty(), "request without a token");
        }
        Ok(state)
    }
}

#[async_trait::async_trait]
impl Backend for MockBackend {
    async fn health(&self) -> Result<Health> {
        drop(self.enter("health", None)?);
        Ok(Health {
            ok: true,
            model: Some("mock-model".to_string()),
        })
    }

    async fn get_profile(&self, session: &Session) -> Result<Profile> {
        let state = self.enter("get_profile", Some(session))?;
        Ok(state.profile.clone())
    }

    async fn update_profile(&self, session: &Session, form: &ProfileForm) -> Result<Profile> {
        let mut state = self.enter("update_profile", Some(session))?;
        state.saved_profile = Some(form.clone());
        state.profile = Profile {
            fitness_goals: Some(form.fitness_goals.clone()),
            dietary_restrictions: Some(form.dietary_restrictions.clone()),
        };
        Ok(state.profile.clone())
    }

    async fn list_conversations(&self, session: &Session) -> Result<Vec<Conversation>> {
        let state = self.enter("list_conversations", Some(session))?;
        Ok(state.conversations.clone())
    }

    async fn create_conversation(
        &self,
        session: &Session,
        body: &ConversationCreate,
    ) -> Result<Conversation> {
        let mut state = self.enter("create_conversation", Some(session))?;
        state.next_id += 1;
        let id = format!("conv-{}", state.next_id);
        let title = body.title.clone().unwrap_or_else(|| "New conversation".to_string());
        let conversation = Conversation::new(&id, title);
        state.messages.insert(id, Vec::new());
        state.conversations.insert(0, conversation.clone());
        Ok(conversation)
    }

    async fn delete_conversation(&self, session: &Session, conversation_id: &str) -> Result<()> {
        let mut state = self.enter("delete_conversation", Some(session))?;
        state.conversations.retain(|c| c.id != conversation_id);
        state.messages.remove(conversation_id);
        Ok(())
    }

    async fn get_messages(
        &self,
        session: &Session,
        conversation_id: &str,
    ) -> Result<Vec<HistoryMessage>> {
        let state = self.enter("get_messages", Some(session))?;
        state
            .messages
            .get(conversation_id)
            .cloned()
            .ok_or_else(|| Error::api(404, r#"{"detail":"Conversation not found"}"#))
    }

    async fn send_message(&self, session: &Session, request: &ChatRequest) -> Result<ChatResponse> {
        let mut state = self.enter("send_message", Some(session))?;
        let target = state
            .reassign_to
            .clone()
            .or_else(|| request.conversation_id.clone())
            .unwrap_or_else(|| "conv-auto".to_string());
        let reply = format!("<p>Try {}</p>", request.message);
        let history = state.messages.entry(target.clone()).or_default();
        history.push(HistoryMessage::new(Role::User, request.message.clone()));
        history.push(HistoryMessage::new(Role::Model, reply.clone()));
        match state.conversations.iter_mut().find(|c| c.id == target) {
            Some(conversation) => conversation.last_message_preview = Some(request.message.clone()),
            None => {
                let conversation =
                    Conversation::new(&target, "New conversation").with_preview(&request.message);
                state.conversations.insert(0, conversation);
            }
        }
        Ok(ChatResponse {
            reply,
            conversation_id: target,
            model: Some("mock-model".to_string()),
        })
    }
}

/////////////////////////////////////////////// MockAuth ///////////////////////////////////////////////

#[derive(Default)]
struct AuthStateInner {
    session: Option<Session>,
    accounts: Vec<(String, String)>,
    get_session_error: Option<String>,
    sign_out_error: Option<String>,
    requires_confirmation: bool,
    refreshes: u64,
}

/// An in-memory auth service.
#[derive(Default)]
pub struct MockAuth {
    state: Mutex<AuthStateInner>,
    events: AuthEvents,
}

impl MockAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(self, session: Session) -> Self {
        self.lock().session = Some(session);
        self
    }

    pub fn with_account(self, email: &str, password: &str) -> Self {
        self.lock()
            .accounts
            .push((email.to_string(), password.to_string()));
        self
    }

    pub fn failing_get_session(self, message: &str) -> Self {
        self.lock().get_session_error = Some(message.to_string());
        self
    }

    pub fn failing_sign_out(self, message: &str) -> Self {
        self.lock().sign_out_error = Some(message.to_string());
        self
    }

    pub fn requiring_confirmation(self) -> Self {
        self.lock().requires_confirmation = true;
        self
    }

    /// Simulates a change made outside this process, such as another tab.
    pub fn push_external(&self, session: Option<Session>) {
        let kind = if session.is_some() {
            AuthChange::SignedIn
        } else {
            AuthChange::SignedOut
        };
        self.lock().session = session.clone();
        self.events.emit(kind, session);
    }

    pub fn refresh_count(&self) -> u64 {
        self.lock().refreshes
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AuthStateInner> {
        self.state.lock().unwrap()
    }

    fn install(&self, session: Option<Session>, kind: AuthChange) {
        self.lock().session = session.clone();
        self.events.emit(kind, session);
    }
}

#[async_trait::async_trait]
impl AuthService for MockAuth {
    async fn get_session(&self) -> Result<Option<Session>> {
        let state = self.lock();
        if let Some(message) = &state.get_session_error {
            return Err(Error::authentication(message.clone()));
        }
        Ok(state.session.clone())
    }

    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session> {
        let known = self
            .lock()
            .accounts
            .iter()
            .any(|(email, password)| *email == credentials.email && *password == credentials.password);
        if !known {
            return Err(Error::authentication("Invalid login credentials"));
        }
        let session = Session::new(
            format!("token-{}", credentials.email),
            User::new("user-1", credentials.email.clone()),
        );
        self.install(Some(session.clone()), AuthChange::SignedIn);
        Ok(session)
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<Option<Session>> {
        if self.lock().requires_confirmation {
            return Ok(None);
        }
        let mut user = User::new("user-2", request.credentials.email.clone());
        user.user_metadata = request.metadata.clone();
        let session = Session::new("token-new", user);
        self.install(Some(session.clone()), AuthChange::SignedIn);
        Ok(Some(session))
    }

    async fn sign_out(&self) -> Result<()> {
        let failure = self.lock().sign_out_error.clone();
        self.install(None, AuthChange::SignedOut);
        match failure {
            Some(message) => Err(Error::authentication(message)),
            None => Ok(()),
        }
    }

    async fn refresh_session(&self) -> Result<Option<Session>> {
        let session = {
            let mut state = self.lock();
            let Some(current) = state.session.clone() else {
                return Ok(None);
            };
            state.refreshes += 1;
            let mut fresh = current.with_expires_at(now_unix() + 3600);
            fresh.access_token = format!("refreshed-{}", state.refreshes);
            fresh
        };
        self.install(Some(session.clone()), AuthChange::TokenRefreshed);
        Ok(Some(session))
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
