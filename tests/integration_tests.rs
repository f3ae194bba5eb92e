//! Integration tests against a running backend and auth service.
//! These tests are skipped unless the live environment is configured.

#[cfg(test)]
mod tests {
    use easydiet::auth::{AuthService, GoTrueAuth, SessionStore};
    use easydiet::config::DEFAULT_TIMEOUT;
    use easydiet::{Backend, Config, ConversationCreate, Credentials, EasyDiet, Session};

    fn live_backend() -> Option<EasyDiet> {
        let api_base = std::env::var("EASYDIET_LIVE_API_BASE").ok()?;
        let config = Config::new().with_api_base(api_base);
        Some(EasyDiet::new(&config).expect("Failed to create client"))
    }

    async fn live_session() -> Option<Session> {
        let url = std::env::var("EASYDIET_LIVE_AUTH_URL").ok()?;
        let key = std::env::var("EASYDIET_LIVE_AUTH_KEY").ok()?;
        let email = std::env::var("EASYDIET_LIVE_EMAIL").ok()?;
        let password = std::env::var("EASYDIET_LIVE_PASSWORD").ok()?;
        let auth = GoTrueAuth::new(&url, &key, SessionStore::memory(), DEFAULT_TIMEOUT)
            .expect("Failed to create auth client");
        let session = auth
            .sign_in_with_password(&Credentials::new(email, password))
            .await
            .expect("Sign-in should succeed with the live account");
        Some(session)
    }

    #[tokio::test]
    async fn test_health() {
        let Some(backend) = live_backend() else {
            eprintln!("Skipping test: EASYDIET_LIVE_API_BASE not set");
            return;
        };
        let health = backend.health().await;
        assert!(health.is_ok(), "Health probe should succeed");
    }

    #[tokio::test]
    async fn test_rejects_missing_token() {
        let Some(backend) = live_backend() else {
            eprintln!("Skipping test: EASYDIET_LIVE_API_BASE not set");
            return;
        };
        let session = Session::new("not-a-token", easydiet::User::new("nobody", "nobody@example.com"));
        let err = backend.list_conversations(&session).await.unwrap_err();
        assert!(matches!(err.status_code(), Some(401 | 403)), "{err}");
    }

    #[tokio::test]
    async fn test_conversation_lifecycle() {
        let Some(backend) = live_backend() else {
            eprintln!("Skipping test: EASYDIET_LIVE_API_BASE not set");
            return;
        };
        let Some(session) = live_session().await else {
            eprintln!("Skipping test: EASYDIET_LIVE_AUTH_* or EASYDIET_LIVE_EMAIL/PASSWORD not set");
            return;
        };

        let created = backend
            .create_conversation(&session, &ConversationCreate::default())
            .await
            .expect("Create should succeed");
        let listed = backend.list_conversations(&session).await.unwrap();
        assert!(listed.iter().any(|c| c.id == created.id));

        let history = backend.get_messages(&session, &created.id).await.unwrap();
        assert!(history.is_empty());

        backend
            .delete_conversation(&session, &created.id)
            .await
            .expect("Delete should succeed");
        let listed = backend.list_conversations(&session).await.unwrap();
        assert!(!listed.iter().any(|c| c.id == created.id));
    }
}
