use tokio::sync::broadcast;

use crate::auth::service::{AuthEvent, AuthEvents, AuthService};
use crate::error::{Error, Result};
use crate::types::{Credentials, Session, SignUpRequest};

const MISSING: &str = "authentication service URL or key is not configured";

/// Stand-in used when the authentication service is not configured.
///
/// Nobody is ever signed in, and credential exchanges fail with a
/// configuration error instead of reaching the network.
#[derive(Debug, Default)]
pub struct UnconfiguredAuth {
    events: AuthEvents,
}

impl UnconfiguredAuth {
    /// Creates the stand-in.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl AuthService for UnconfiguredAuth {
    async fn get_session(&self) -> Result<Option<Session>> {
        Ok(None)
    }

    async fn sign_in_with_password(&self, _: &Credentials) -> Result<Session> {
        Err(Error::configuration(MISSING))
    }

    async fn sign_up(&self, _: &SignUpRequest) -> Result<Option<Session>> {
        Err(Error::configuration(MISSING))
    }

    async fn sign_out(&self) -> Result<()> {
        Ok(())
    }

    async fn refresh_session(&self) -> Result<Option<Session>> {
        Ok(None)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn nothing_works_but_nothing_panics() {
        let auth = UnconfiguredAuth::new();
        assert_eq!(auth.get_session().await.unwrap(), None);
        let err = auth
            .sign_in_with_password(&Credentials::new("a@example.com", "pw"))
            .await
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(auth.sign_out().await.is_ok());
        assert_eq!(auth.refresh_session().await.unwrap(), None);
    }
}
