use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Method, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::backend::Backend;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::types::{
    ChatRequest, ChatResponse, Conversation, ConversationCreate, Health, HistoryMessage, Profile,
    ProfileForm, Session,
};

/// Client for the Easy Diet backend API.
#[derive(Debug, Clone)]
pub struct EasyDiet {
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
}

impl EasyDiet {
    /// Create a new client from a resolved configuration.
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_options(&config.api_base, Some(config.timeout))
    }

    /// Create a new client with an explicit base URL and timeout.
    pub fn with_options(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::url(
                format!("{base_url} cannot be used as an API base"),
                None,
            ));
        }
        let timeout = timeout.unwrap_or(crate::config::DEFAULT_TIMEOUT);
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
            timeout,
        })
    }

    /// The base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds `<base>/<segments...>`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::url("API base cannot carry a path", None))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn headers(session: Option<&Session>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(session) = session {
            let bearer = HeaderValue::from_str(&format!("Bearer {}", session.access_token))
                .map_err(|_| {
                    Error::validation(
                        "access token is not a valid header value",
                        Some("access_token".to_string()),
                    )
                })?;
            headers.insert(header::AUTHORIZATION, bearer);
        }
        Ok(headers)
    }

    /// Sends one JSON request and decodes the JSON response.
    ///
    /// The bearer credential is attached only when a session is supplied.  A
    /// non-success status fails with the response body text.
    async fn request<T, B>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
        session: Option<&Session>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(segments)?;
        debug!(method = %method, path = url.path(), authenticated = session.is_some(), "backend request");
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let result = self.execute(method, url, body, session).await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        if let Err(err) = &result {
            CLIENT_REQUEST_ERRORS.click();
            debug!(error = %err, "backend request failed");
        }
        result
    }

    async fn execute<T, B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        session: Option<&Session>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut builder = self
            .client
            .request(method, url)
            .headers(Self::headers(session)?);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| Error::from_transport(e, self.timeout.as_secs_f64()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.map_err(|e| {
                Error::http_client(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                )
            })?;
            return Err(Error::api(status.as_u16(), text));
        }

        response.json::<T>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })
    }
}

#[async_trait::async_trait]
impl Backend for EasyDiet {
    async fn health(&self) -> Result<Health> {
        self.request::<_, ()>(Method::GET, &["api", "health"], None, None)
            .await
    }

    async fn get_profile(&self, session: &Session) -> Result<Profile> {
        self.request::<_, ()>(Method::GET, &["api", "profile"], None, Some(session))
            .await
    }

    async fn update_profile(&self, session: &Session, form: &ProfileForm) -> Result<Profile> {
        self.request(Method::PUT, &["api", "profile"], Some(form), Some(session))
            .await
    }

    async fn list_conversations(&self, session: &Session) -> Result<Vec<Conversation>> {
        self.request::<_, ()>(Method::GET, &["api", "conversations"], None, Some(session))
            .await
    }

    async fn create_conversation(
        &self,
        session: &Session,
        body: &ConversationCreate,
    ) -> Result<Conversation> {
        self.request(
            Method::POST,
            &["api", "conversations"],
            Some(body),
            Some(session),
        )
        .await
    }

    async fn delete_conversation(&self, session: &Session, conversation_id: &str) -> Result<()> {
        let _: serde_json::Value = self
            .request::<_, ()>(
                Method::DELETE,
                &["api", "conversations", conversation_id],
                None,
                Some(session),
            )
            .await?;
        Ok(())
    }

    async fn get_messages(
        &self,
        session: &Session,
        conversation_id: &str,
    ) -> Result<Vec<HistoryMessage>> {
        self.request::<_, ()>(
            Method::GET,
            &["api", "conversations", conversation_id, "messages"],
            None,
            Some(session),
        )
        .await
    }

    async fn send_message(&self, session: &Session, request: &ChatRequest) -> Result<ChatResponse> {
        self.request(Method::POST, &["api", "chat"], Some(request), Some(session))
            .await
    }
}
