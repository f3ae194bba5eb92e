//! Navigation guards.
//!
//! Guards are pure functions of the [`AuthState`] and the attempted route.
//! While the initial session fetch is outstanding both guards answer
//! [`GuardOutcome::Loading`] so no redirect happens before the state is known.

use crate::auth::AuthState;
use crate::observability::GUARD_REDIRECTS;
use crate::router::{Location, Navigator, Route};

/// What a guard decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Show the loading placeholder.
    Loading,
    /// Render the attempted route.
    Render,
    /// Replace the current location with `to`; `from` is the attempted route
    /// when the visitor should be sent back after signing in.
    Redirect { to: Route, from: Option<Route> },
}

/// Renders only with a session; otherwise redirects to `/` remembering
/// `attempted`.
pub fn require_authenticated(state: &AuthState, attempted: &Route) -> GuardOutcome {
    match state {
        AuthState::Loading => GuardOutcome::Loading,
        AuthState::Authenticated(_) => GuardOutcome::Render,
        AuthState::Unauthenticated => GuardOutcome::Redirect {
            to: Route::Login,
            from: Some(attempted.clone()),
        },
    }
}

/// Renders only without a session; otherwise redirects to `/chat`.
pub fn require_unauthenticated(state: &AuthState) -> GuardOutcome {
    match state {
        AuthState::Loading => GuardOutcome::Loading,
        AuthState::Authenticated(_) => GuardOutcome::Redirect {
            to: Route::chat(),
            from: None,
        },
        AuthState::Unauthenticated => GuardOutcome::Render,
    }
}

/// Applies the route table: the login page is for visitors, chat and profile
/// are for members, and unknown paths go to `/chat`.
pub fn resolve(route: &Route, state: &AuthState) -> GuardOutcome {
    match route {
        Route::Login => require_unauthenticated(state),
        Route::Chat { .. } | Route::Profile => require_authenticated(state, route),
        Route::NotFound(_) => GuardOutcome::Redirect {
            to: Route::chat(),
            from: None,
        },
    }
}

/// Resolves the navigator's current route, applying redirects until a route
/// renders or the state is still loading.  Returns the final outcome.
pub fn settle(navigator: &mut Navigator, state: &AuthState) -> GuardOutcome {
    // Every chain is at most NotFound -> Chat -> Login.
    for _ in 0..4 {
        match resolve(navigator.route(), state) {
            GuardOutcome::Redirect { to, from } => {
                GUARD_REDIRECTS.click();
                let from = from.or_else(|| navigator.current().from.clone());
                let location = match from {
                    Some(from) if to == Route::Login => Location::with_from(to, from),
                    _ => Location::new(to),
                };
                navigator.replace_location(location);
            }
            outcome => return outcome,
        }
    }
    resolve(navigator.route(), state)
}
