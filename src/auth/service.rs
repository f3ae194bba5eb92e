use tokio::sync::broadcast;

use crate::error::Result;
use crate::types::{Credentials, Session, SignUpRequest};

/// Capacity of the change-notification channel.
const EVENT_CAPACITY: usize = 16;

/// Why the session changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChange {
    /// A password sign-in or auto-confirmed sign-up completed.
    SignedIn,
    /// The session was cleared.
    SignedOut,
    /// The access token was exchanged for a fresh one.
    TokenRefreshed,
}

/// A session-change notification.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthEvent {
    /// What happened.
    pub kind: AuthChange,
    /// The session after the change; `None` when signed out.
    pub session: Option<Session>,
}

/// The third-party authentication service.
///
/// Implementations publish every session change on the channel returned by
/// [`AuthService::subscribe`]; the [`SessionProvider`](crate::auth::SessionProvider)
/// is the one consumer that turns those into application state.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Returns the current session, restoring a persisted one if present.
    async fn get_session(&self) -> Result<Option<Session>>;

    /// Exchanges an email and password for a session.
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session>;

    /// Registers a new account.
    ///
    /// Returns `None` when the service requires email confirmation before
    /// issuing a session.
    async fn sign_up(&self, request: &SignUpRequest) -> Result<Option<Session>>;

    /// Ends the current session.
    async fn sign_out(&self) -> Result<()>;

    /// Exchanges the refresh token for a new session.  `None` if there is no session.
    async fn refresh_session(&self) -> Result<Option<Session>>;

    /// Subscribes to session-change notifications.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Fan-out of [`AuthEvent`]s shared by the service implementations.
#[derive(Debug, Clone)]
pub struct AuthEvents {
    sender: broadcast::Sender<AuthEvent>,
}

impl AuthEvents {
    /// Creates a channel with no subscribers.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    /// Publishes a change.  Having no subscribers is not an error.
    pub fn emit(&self, kind: AuthChange, session: Option<Session>) {
        let _ = self.sender.send(AuthEvent { kind, session });
    }

    /// Adds a subscriber.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new()
    }
}
