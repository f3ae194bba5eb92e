//! The session provider: the single owner of authentication state.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auth::service::{AuthEvent, AuthService};
use crate::error::{Error, Result};
use crate::observability::AUTH_STATE_CHANGES;
use crate::types::{Credentials, Session, SignUpRequest, User};
use crate::utils::time::now_unix;

/// Refresh this many seconds before the access token expires.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Wait this long after a failed refresh before trying again.
const REFRESH_RETRY: Duration = Duration::from_secs(30);

/// Where authentication stands.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    /// The initial session fetch has not completed.
    Loading,
    /// A session is installed.
    Authenticated(Session),
    /// Resolved, with nobody signed in.
    Unauthenticated,
}

impl AuthState {
    /// Maps an optional session to a resolved state.
    pub fn from_session(session: Option<Session>) -> Self {
        match session {
            Some(session) => AuthState::Authenticated(session),
            None => AuthState::Unauthenticated,
        }
    }

    /// The installed session, if any.
    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    /// True until the initial fetch resolves.
    pub fn is_loading(&self) -> bool {
        matches!(self, AuthState::Loading)
    }

    /// True when a session is installed.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }
}

/// A snapshot of the authentication state, passed explicitly to every view
/// operation that talks to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    state: AuthState,
}

impl SessionContext {
    /// Wraps a state.
    pub fn new(state: AuthState) -> Self {
        Self { state }
    }

    /// A context holding `session`.
    pub fn authenticated(session: Session) -> Self {
        Self::new(AuthState::Authenticated(session))
    }

    /// A context with nobody signed in.
    pub fn unauthenticated() -> Self {
        Self::new(AuthState::Unauthenticated)
    }

    /// The underlying state.
    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// The session, if any.
    pub fn session(&self) -> Option<&Session> {
        self.state.session()
    }

    /// The signed-in user, if any.
    pub fn user(&self) -> Option<&User> {
        self.session().map(|session| &session.user)
    }

    /// The session, or [`Error::NoSession`].
    ///
    /// This is the one place a missing session is turned into an error; views
    /// record it in their status like any other failure.
    pub fn require_session(&self) -> Result<&Session> {
        self.session().ok_or(Error::NoSession)
    }
}

/// Owns the [`AuthState`] and keeps it in step with the [`AuthService`].
///
/// Mount it once at startup.  While mounted it listens for change
/// notifications and refreshes the token ahead of expiry.  Dropping it (or
/// calling [`SessionProvider::unmount`]) stops both background tasks and
/// releases the subscription.
pub struct SessionProvider {
    auth: Arc<dyn AuthService>,
    state: Arc<watch::Sender<AuthState>>,
    last_error: Mutex<Option<Error>>,
    tasks: Vec<JoinHandle<()>>,
}

impl SessionProvider {
    /// Resolves the initial session and starts following changes.
    ///
    /// A failed initial fetch resolves to [`AuthState::Unauthenticated`] and is
    /// kept in [`SessionProvider::last_error`].
    ///
    /// The provider is returned only after that fetch settles, so holders of
    /// it never see [`AuthState::Loading`].  The loading state and the
    /// guards' loading branch matter only to code that inspects the state
    /// while `mount` is still pending.
    ///
    /// ```
    /// # tokio_test::block_on(async {
    /// use std::sync::Arc;
    /// use easydiet::auth::{SessionProvider, UnconfiguredAuth};
    ///
    /// let provider = SessionProvider::mount(Arc::new(UnconfiguredAuth::new())).await;
    /// assert!(!provider.state().is_loading());
    /// assert!(provider.session().is_none());
    /// # });
    /// ```
    pub async fn mount(auth: Arc<dyn AuthService>) -> Self {
        let (sender, _) = watch::channel(AuthState::Loading);
        let state = Arc::new(sender);
        // Subscribe before fetching so nothing published meanwhile is missed.
        let events = auth.subscribe();

        let mut last_error = None;
        match auth.get_session().await {
            Ok(session) => {
                state.send_replace(AuthState::from_session(session));
            }
            Err(err) => {
                warn!("initial session fetch failed: {err}");
                last_error = Some(err);
                state.send_replace(AuthState::Unauthenticated);
            }
        }
        debug!(authenticated = state.borrow().is_authenticated(), "session resolved");

        let tasks = vec![
            tokio::spawn(follow_changes(events, Arc::clone(&state))),
            tokio::spawn(refresh_ahead_of_expiry(
                Arc::clone(&auth),
                Arc::clone(&state),
            )),
        ];
        Self {
            auth,
            state,
            last_error: Mutex::new(last_error),
            tasks,
        }
    }

    /// The current state.
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// A snapshot to pass into view operations.
    pub fn context(&self) -> SessionContext {
        SessionContext::new(self.state())
    }

    /// The current session, if any.
    pub fn session(&self) -> Option<Session> {
        self.state.borrow().session().cloned()
    }

    /// Watches state transitions.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// The most recent error reported by the auth service outside a caller's request.
    pub fn last_error(&self) -> Option<Error> {
        self.lock_error().clone()
    }

    /// Signs in and installs the returned session.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Session> {
        let session = self.auth.sign_in_with_password(credentials).await?;
        self.install(Some(session.clone()));
        Ok(session)
    }

    /// Signs up; installs the session when the service returns one.
    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<Option<Session>> {
        let session = self.auth.sign_up(request).await?;
        if let Some(session) = &session {
            self.install(Some(session.clone()));
        }
        Ok(session)
    }

    /// Signs out.  The local session is cleared even if the service call fails.
    pub async fn sign_out(&self) {
        let result = self.auth.sign_out().await;
        self.install(None);
        if let Err(err) = result {
            warn!("sign-out request failed: {err}");
            *self.lock_error() = Some(err);
        }
    }

    /// Stops following the auth service.
    pub fn unmount(self) {}

    fn install(&self, session: Option<Session>) {
        *self.lock_error() = None;
        apply(&self.state, AuthState::from_session(session));
    }

    fn lock_error(&self) -> std::sync::MutexGuard<'_, Option<Error>> {
        self.last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for SessionProvider {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

fn apply(state: &watch::Sender<AuthState>, next: AuthState) {
    let changed = state.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    });
    if changed {
        AUTH_STATE_CHANGES.click();
        info!(authenticated = state.borrow().is_authenticated(), "session changed");
    }
}

async fn follow_changes(
    mut events: broadcast::Receiver<AuthEvent>,
    state: Arc<watch::Sender<AuthState>>,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                debug!(kind = ?event.kind, "auth notification");
                apply(&state, AuthState::from_session(event.session));
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("missed {skipped} auth notifications");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn refresh_ahead_of_expiry(
    auth: Arc<dyn AuthService>,
    state: Arc<watch::Sender<AuthState>>,
) {
    let mut changes = state.subscribe();
    loop {
        let expires_at = changes
            .borrow_and_update()
            .session()
            .and_then(|session| session.expires_at);
        let Some(expires_at) = expires_at else {
            if changes.changed().await.is_err() {
                return;
            }
            continue;
        };
        let wait = (expires_at - REFRESH_MARGIN_SECS - now_unix()).max(0) as u64;
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    return;
                }
            }
            _ = tokio::time::sleep(Duration::from_secs(wait)) => {
                match auth.refresh_session().await {
                    Ok(Some(session)) => apply(&state, AuthState::Authenticated(session)),
                    Ok(None) => {
                        if changes.changed().await.is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        warn!("session refresh failed: {err}");
                        tokio::time::sleep(REFRESH_RETRY).await;
                    }
                }
            }
        }
    }
}
