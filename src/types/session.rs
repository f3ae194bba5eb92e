use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils::time::now_unix;

/// The identity half of a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Stable user identifier assigned by the auth service.
    pub id: String,

    /// The user's email address, when the service reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Free-form metadata supplied at sign-up (e.g. the username).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub user_metadata: Map<String, Value>,
}

impl User {
    /// Creates a user with the given id and email.
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: Some(email.into()),
            user_metadata: Map::new(),
        }
    }

    /// The username recorded at sign-up, if any.
    pub fn username(&self) -> Option<&str> {
        self.user_metadata.get("username").and_then(Value::as_str)
    }
}

/// An authenticated credential bundle: an access token plus the user it belongs to.
///
/// Sessions are created by sign-in or sign-up and replaced on refresh.  Everything
/// outside the session provider treats them as read-only values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    /// Bearer token attached to backend requests.
    pub access_token: String,

    /// Token used to obtain a fresh access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Token type, normally "bearer".
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Lifetime of the access token in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,

    /// Expiry of the access token as unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,

    /// The signed-in user.
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    /// Creates a session that never expires, for the given token and user.
    pub fn new(access_token: impl Into<String>, user: User) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            token_type: default_token_type(),
            expires_in: None,
            expires_at: None,
            user,
        }
    }

    /// Sets the refresh token.
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Sets the absolute expiry in unix seconds.
    pub fn with_expires_at(mut self, expires_at: i64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Fills in `expires_at` from `expires_in` when the service only sent the latter.
    pub fn normalize_expiry(mut self) -> Self {
        if self.expires_at.is_none()
            && let Some(expires_in) = self.expires_in
        {
            self.expires_at = Some(now_unix() + expires_in);
        }
        self
    }

    /// Seconds until the access token expires, or `None` if it carries no expiry.
    pub fn seconds_until_expiry(&self, now: i64) -> Option<i64> {
        self.expires_at.map(|at| at - now)
    }

    /// True if the token is expired, or will be within `margin` seconds.
    pub fn is_expired(&self, now: i64, margin: i64) -> bool {
        self.seconds_until_expiry(now)
            .map(|remaining| remaining <= margin)
            .unwrap_or(false)
    }
}

/// Email and password for a sign-in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

impl Credentials {
    /// Creates credentials from trimmed email and password.
    pub fn new(email: impl AsRef<str>, password: impl AsRef<str>) -> Self {
        Self {
            email: email.as_ref().trim().to_string(),
            password: password.as_ref().trim().to_string(),
        }
    }

    /// True when both fields are present after trimming.
    pub fn is_complete(&self) -> bool {
        !self.email.is_empty() && !self.password.is_empty()
    }
}

/// A sign-up: credentials plus metadata stored on the new user.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpRequest {
    /// Email and password for the new account.
    pub credentials: Credentials,
    /// Metadata attached to the user record.
    pub metadata: Map<String, Value>,
}

impl SignUpRequest {
    /// Creates a sign-up carrying a username in its metadata.
    pub fn new(
        username: impl AsRef<str>,
        email: impl AsRef<str>,
        password: impl AsRef<str>,
    ) -> Self {
        let mut metadata = Map::new();
        let username = username.as_ref().trim();
        if !username.is_empty() {
            metadata.insert("username".to_string(), Value::String(username.to_string()));
        }
        Self {
            credentials: Credentials::new(email, password),
            metadata,
        }
    }
}
