//! HTTP implementation of [`AuthService`] for GoTrue (Supabase Auth).

use std::sync::Mutex;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, header};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::service::{AuthChange, AuthEvent, AuthEvents, AuthService};
use crate::auth::store::SessionStore;
use crate::error::{Error, REQUEST_FAILED, Result};
use crate::observability::{AUTH_FAILURES, AUTH_REFRESHES, AUTH_REQUESTS};
use crate::types::{Credentials, Session, SignUpRequest};
use crate::utils::time::now_unix;

/// Sessions this close to expiry are refreshed before being handed out.
const EXPIRY_MARGIN_SECS: i64 = 10;

/// GoTrue client speaking the `/auth/v1` REST API.
#[derive(Debug)]
pub struct GoTrueAuth {
    client: ReqwestClient,
    base_url: Url,
    anon_key: String,
    timeout: Duration,
    store: SessionStore,
    current: Mutex<Option<Session>>,
    events: AuthEvents,
}

impl GoTrueAuth {
    /// Creates a client for the service at `url` using the public `anon_key`.
    pub fn new(url: &str, anon_key: &str, store: SessionStore, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(url.trim_end_matches('/'))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::url(
                format!("{base_url} cannot be used as an auth base"),
                None,
            ));
        }
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;
        Ok(Self {
            client,
            base_url,
            anon_key: anon_key.to_string(),
            timeout,
            store,
            current: Mutex::new(None),
            events: AuthEvents::new(),
        })
    }

    fn endpoint(&self, name: &str, grant_type: Option<&str>) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::url("auth base cannot carry a path", None))?
            .pop_if_empty()
            .extend(["auth", "v1", name]);
        if let Some(grant_type) = grant_type {
            url.query_pairs_mut().append_pair("grant_type", grant_type);
        }
        Ok(url)
    }

    fn headers(&self, bearer: Option<&str>) -> Result<HeaderMap> {
        let invalid =
            |param: &str| Error::validation("value is not a valid header", Some(param.to_string()));
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            "apikey",
            HeaderValue::from_str(&self.anon_key).map_err(|_| invalid("anon_key"))?,
        );
        let token = bearer.unwrap_or(&self.anon_key);
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| invalid("token"))?,
        );
        Ok(headers)
    }

    /// POSTs `body` and returns the decoded JSON (or null for an empty body).
    async fn post<B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
        bearer: Option<&str>,
    ) -> Result<Value> {
        debug!(path = url.path(), "auth request");
        AUTH_REQUESTS.click();
        let response = self
            .client
            .post(url)
            .headers(self.headers(bearer)?)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::from_transport(e, self.timeout.as_secs_f64()))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| {
            Error::http_client(format!("Failed to read auth response: {}", e), Some(Box::new(e)))
        })?;
        if !status.is_success() {
            AUTH_FAILURES.click();
            // Outages are not verdicts on the credentials.
            if status.is_server_error() {
                return Err(Error::api(status.as_u16(), error_message(&text)));
            }
            return Err(Error::authentication(error_message(&text)));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn install(&self, session: Option<Session>, kind: AuthChange) -> Result<()> {
        match &session {
            Some(session) => self.store.save(session)?,
            None => self.store.clear()?,
        }
        *self.lock() = session.clone();
        info!(?kind, "auth state changed");
        self.events.emit(kind, session);
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<Session> {
        let url = self.endpoint("token", Some("refresh_token"))?;
        let value = self
            .post(url, &json!({ "refresh_token": refresh_token }), None)
            .await?;
        AUTH_REFRESHES.click();
        parse_session(value)?
            .ok_or_else(|| Error::authentication("refresh returned no session"))
    }
}

#[async_trait::async_trait]
impl AuthService for GoTrueAuth {
    async fn get_session(&self) -> Result<Option<Session>> {
        let cached = self.lock().clone();
        let session = match cached {
            Some(session) => session,
            None => match self.store.load()? {
                Some(session) => {
                    *self.lock() = Some(session.clone());
                    session
                }
                None => return Ok(None),
            },
        };
        if !session.is_expired(now_unix(), EXPIRY_MARGIN_SECS) {
            return Ok(Some(session));
        }
        match session.refresh_token.as_deref() {
            Some(refresh_token) => match self.exchange_refresh_token(refresh_token).await {
                Ok(fresh) => {
                    self.install(Some(fresh.clone()), AuthChange::TokenRefreshed)?;
                    Ok(Some(fresh))
                }
                Err(err) => {
                    warn!("stored session could not be refreshed: {err}");
                    // Only a rejected refresh token ends the session.
                    if err.is_authentication() {
                        self.install(None, AuthChange::SignedOut)?;
                    }
                    Err(err)
                }
            },
            None => {
                self.install(None, AuthChange::SignedOut)?;
                Ok(None)
            }
        }
    }

    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session> {
        let url = self.endpoint("token", Some("password"))?;
        let value = self
            .post(
                url,
                &json!({ "email": credentials.email, "password": credentials.password }),
                None,
            )
            .await?;
        let session =
            parse_session(value)?.ok_or_else(|| Error::authentication("sign-in returned no session"))?;
        self.install(Some(session.clone()), AuthChange::SignedIn)?;
        Ok(session)
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<Option<Session>> {
        let url = self.endpoint("signup", None)?;
        let value = self
            .post(
                url,
                &json!({
                    "email": request.credentials.email,
                    "password": request.credentials.password,
                    "data": Value::Object(request.metadata.clone()),
                }),
                None,
            )
            .await?;
        let session = parse_session(value)?;
        if let Some(session) = &session {
            self.install(Some(session.clone()), AuthChange::SignedIn)?;
        }
        Ok(session)
    }

    async fn sign_out(&self) -> Result<()> {
        let current = self.lock().clone();
        let remote = match current {
            Some(session) => {
                let url = self.endpoint("logout", None)?;
                self.post(url, &Map::new(), Some(&session.access_token))
                    .await
                    .map(|_| ())
            }
            None => Ok(()),
        };
        self.install(None, AuthChange::SignedOut)?;
        remote
    }

    async fn refresh_session(&self) -> Result<Option<Session>> {
        let refresh_token = self
            .lock()
            .as_ref()
            .and_then(|session| session.refresh_token.clone());
        let Some(refresh_token) = refresh_token else {
            return Ok(None);
        };
        match self.exchange_refresh_token(&refresh_token).await {
            Ok(session) => {
                self.install(Some(session.clone()), AuthChange::TokenRefreshed)?;
                Ok(Some(session))
            }
            Err(err) => {
                if err.is_authentication() {
                    self.install(None, AuthChange::SignedOut)?;
                }
                Err(err)
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

/// Decodes a token/sign-up response.  Sign-ups awaiting email confirmation
/// return a bare user, which yields `None`.
fn parse_session(value: Value) -> Result<Option<Session>> {
    let has_token = value
        .get("access_token")
        .and_then(Value::as_str)
        .is_some_and(|token| !token.is_empty());
    if !has_token {
        return Ok(None);
    }
    let session: Session = serde_json::from_value(value)?;
    Ok(Some(session.normalize_expiry()))
}

/// Picks the human-readable message out of a GoTrue error body.
fn error_message(body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["error_description", "msg", "message", "error"] {
            if let Some(message) = map.get(key).and_then(Value::as_str)
                && !message.is_empty()
            {
                return message.to_string();
            }
        }
    }
    if body.trim().is_empty() {
        REQUEST_FAILED.to_string()
    } else {
        body.to_string()
    }
}
