use std::fmt;
use std::str::FromStr;

use tracing::info;

use crate::auth::SessionProvider;
use crate::router::{Navigator, Route};
use crate::types::{Credentials, SignUpRequest};

/// Shown after a sign-up that awaits email confirmation.
pub const CONFIRM_EMAIL: &str = "Check your email to confirm your account.";

/// Which credential form is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthTab {
    #[default]
    LogIn,
    SignUp,
}

impl fmt::Display for AuthTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthTab::LogIn => write!(f, "Log In"),
            AuthTab::SignUp => write!(f, "Sign Up"),
        }
    }
}

impl FromStr for AuthTab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "login" | "log-in" | "signin" => Ok(AuthTab::LogIn),
            "signup" | "sign-up" | "register" => Ok(AuthTab::SignUp),
            _ => Err(format!("Unknown tab: {s}")),
        }
    }
}

/// The login page: two tabs and a feedback line.
#[derive(Debug, Clone, Default)]
pub struct LoginView {
    tab: AuthTab,
    feedback: Option<String>,
}

impl LoginView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tab(&self) -> AuthTab {
        self.tab
    }

    pub fn select_tab(&mut self, tab: AuthTab) {
        self.tab = tab;
    }

    /// The message shown above the forms, if any.
    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    /// Submits the log-in form.
    ///
    /// Blank email or password does nothing.  On success the navigator moves
    /// to the location the visitor was bounced from, or `/chat`.  On failure
    /// the service's message becomes the feedback and the route is unchanged.
    /// Returns whether a session was installed.
    pub async fn submit_login(
        &mut self,
        provider: &SessionProvider,
        navigator: &mut Navigator,
        email: &str,
        password: &str,
    ) -> bool {
        self.tab = AuthTab::LogIn;
        let credentials = Credentials::new(email, password);
        if !credentials.is_complete() {
            return false;
        }
        match provider.sign_in(&credentials).await {
            Ok(_) => {
                info!("signed in");
                self.feedback = None;
                navigator.push(destination(navigator));
                true
            }
            Err(err) => {
                self.feedback = Some(err.to_string());
                false
            }
        }
    }

    /// Submits the sign-up form.
    ///
    /// When the service returns a session this behaves like a log-in; when it
    /// requires email confirmation the feedback says so and nothing navigates.
    pub async fn submit_signup(
        &mut self,
        provider: &SessionProvider,
        navigator: &mut Navigator,
        username: &str,
        email: &str,
        password: &str,
    ) -> bool {
        self.tab = AuthTab::SignUp;
        let request = SignUpRequest::new(username, email, password);
        if !request.credentials.is_complete() {
            return false;
        }
        match provider.sign_up(&request).await {
            Ok(Some(_)) => {
                info!("signed up");
                self.feedback = None;
                navigator.push(destination(navigator));
                true
            }
            Ok(None) => {
                self.feedback = Some(CONFIRM_EMAIL.to_string());
                false
            }
            Err(err) => {
                self.feedback = Some(err.to_string());
                false
            }
        }
    }
}

fn destination(navigator: &Navigator) -> Route {
    navigator.current().from.clone().unwrap_or_else(Route::chat)
}
