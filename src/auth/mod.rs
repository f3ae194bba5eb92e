//! Authentication: the remote auth service and the session provider built on it.
//!
//! - [`AuthService`] is the seam to the third-party service; [`GoTrueAuth`]
//!   speaks its REST API and [`UnconfiguredAuth`] stands in when it is not set up.
//! - [`SessionStore`] persists the session between runs.
//! - [`SessionProvider`] owns the application's [`AuthState`] and hands out
//!   [`SessionContext`] snapshots.

mod gotrue;
mod provider;
mod service;
mod store;
mod unconfigured;

use std::sync::Arc;

use tracing::warn;

pub use gotrue::GoTrueAuth;
pub use provider::{AuthState, SessionContext, SessionProvider};
pub use service::{AuthChange, AuthEvent, AuthEvents, AuthService};
pub use store::SessionStore;
pub use unconfigured::UnconfiguredAuth;

use crate::config::Config;
use crate::error::Result;

/// Builds the auth service described by `config`.
///
/// Missing URL or key degrades to [`UnconfiguredAuth`] with a warning rather
/// than failing startup.
pub fn auth_service(config: &Config) -> Result<Arc<dyn AuthService>> {
    let Some((url, key)) = config.auth() else {
        warn!("Missing authentication service configuration; sign-in is disabled");
        return Ok(Arc::new(UnconfiguredAuth::new()));
    };
    let store = match config.state_dir() {
        Some(dir) => SessionStore::file(dir, &config.storage_key),
        None => {
            warn!("No directory for session storage; the session will not persist");
            SessionStore::memory()
        }
    };
    Ok(Arc::new(GoTrueAuth::new(url, key, store, config.timeout)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_auth_degrades() {
        let auth = auth_service(&Config::new()).unwrap();
        assert_eq!(auth.get_session().await.unwrap(), None);
        assert!(
            auth.sign_up(&crate::types::SignUpRequest::new("u", "e@example.com", "pw"))
                .await
                .unwrap_err()
                .is_configuration()
        );
    }

    #[tokio::test]
    async fn configured_auth_uses_session_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new()
            .with_auth("http://127.0.0.1:9", "anon")
            .with_session_dir(dir.path());
        let auth = auth_service(&config).unwrap();
        assert_eq!(auth.get_session().await.unwrap(), None);
    }
}
