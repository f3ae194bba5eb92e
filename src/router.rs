//! Routes and navigation history.

use std::fmt;

/// A parsed application route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/`
    Login,
    /// `/chat` or `/chat/:chatId`
    Chat { chat_id: Option<String> },
    /// `/profile`
    Profile,
    /// Anything else, kept verbatim.
    NotFound(String),
}

impl Route {
    /// `/chat` with no conversation open.
    pub fn chat() -> Self {
        Route::Chat { chat_id: None }
    }

    /// `/chat/<id>`
    pub fn conversation(id: impl Into<String>) -> Self {
        Route::Chat {
            chat_id: Some(id.into()),
        }
    }

    /// Parses a path.  Trailing slashes and empty segments are ignored.
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or("");
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Route::Login,
            ["chat"] => Route::chat(),
            ["chat", id] => Route::conversation(*id),
            ["profile"] => Route::Profile,
            _ => Route::NotFound(path.to_string()),
        }
    }

    /// The canonical path.
    pub fn path(&self) -> String {
        match self {
            Route::Login => "/".to_string(),
            Route::Chat { chat_id: None } => "/chat".to_string(),
            Route::Chat { chat_id: Some(id) } => format!("/chat/{id}"),
            Route::Profile => "/profile".to_string(),
            Route::NotFound(path) => path.clone(),
        }
    }

    /// Whether the route needs a session.
    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Chat { .. } | Route::Profile)
    }

    /// The open conversation, if this is a chat route.
    pub fn chat_id(&self) -> Option<&str> {
        match self {
            Route::Chat { chat_id } => chat_id.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// A route plus the location a redirect came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub route: Route,
    /// Set when a guard bounced the visitor here; sign-in returns to it.
    pub from: Option<Route>,
}

impl Location {
    pub fn new(route: Route) -> Self {
        Self { route, from: None }
    }

    pub fn with_from(route: Route, from: Route) -> Self {
        Self {
            route,
            from: Some(from),
        }
    }
}

/// Browser-style history: `push` adds an entry, `replace` overwrites the
/// current one.
#[derive(Debug, Clone)]
pub struct Navigator {
    entries: Vec<Location>,
}

impl Navigator {
    /// Starts at `route`.
    pub fn new(route: Route) -> Self {
        Self {
            entries: vec![Location::new(route)],
        }
    }

    pub fn current(&self) -> &Location {
        // The history is never empty.
        &self.entries[self.entries.len() - 1]
    }

    pub fn route(&self) -> &Route {
        &self.current().route
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Navigates to `route`, adding a history entry.
    pub fn push(&mut self, route: Route) {
        self.entries.push(Location::new(route));
    }

    /// Navigates to `route`, replacing the current entry.
    pub fn replace(&mut self, route: Route) {
        self.replace_location(Location::new(route));
    }

    /// Navigates to `location`, replacing the current entry.
    pub fn replace_location(&mut self, location: Location) {
        let last = self.entries.len() - 1;
        self.entries[last] = location;
    }

    /// Navigates to `route`, adding or replacing per `replace`.
    pub fn navigate(&mut self, route: Route, replace: bool) {
        if replace {
            self.replace(route);
        } else {
            self.push(route);
        }
    }

    /// Pops one entry.  Returns false at the first entry.
    pub fn back(&mut self) -> bool {
        if self.entries.len() > 1 {
            self.entries.pop();
            true
        } else {
            false
        }
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(Route::Login)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_routes() {
        assert_eq!(Route::parse("/"), Route::Login);
        assert_eq!(Route::parse(""), Route::Login);
        assert_eq!(Route::parse("/chat"), Route::chat());
        assert_eq!(Route::parse("/chat/"), Route::chat());
        assert_eq!(Route::parse("/chat/abc-123"), Route::conversation("abc-123"));
        assert_eq!(Route::parse("/profile?tab=1"), Route::Profile);
        assert_eq!(Route::parse("/home"), Route::NotFound("/home".to_string()));
        assert_eq!(
            Route::parse("/chat/a/b"),
            Route::NotFound("/chat/a/b".to_string())
        );
    }

    #[test]
    fn paths() {
        for path in ["/", "/chat", "/chat/c1", "/profile"] {
            assert_eq!(Route::parse(path).path(), path);
        }
        assert_eq!(Route::conversation("c1").to_string(), "/chat/c1");
        assert_eq!(Route::conversation("c1").chat_id(), Some("c1"));
    }

    #[test]
    fn protection() {
        assert!(!Route::Login.is_protected());
        assert!(Route::chat().is_protected());
        assert!(Route::Profile.is_protected());
        assert!(!Route::NotFound("/x".to_string()).is_protected());
    }

    #[test]
    fn push_replace_back() {
        let mut nav = Navigator::default();
        nav.push(Route::chat());
        nav.push(Route::conversation("c1"));
        assert_eq!(nav.len(), 3);
        nav.replace(Route::conversation("c2"));
        assert_eq!(nav.len(), 3);
        assert_eq!(nav.route(), &Route::conversation("c2"));
        assert!(nav.back());
        assert_eq!(nav.route(), &Route::chat());
        assert!(nav.back());
        assert!(!nav.back());
        assert_eq!(nav.route(), &Route::Login);
    }

    #[test]
    fn replace_location_keeps_from() {
        let mut nav = Navigator::new(Route::Profile);
        nav.replace_location(Location::with_from(Route::Login, Route::Profile));
        assert_eq!(nav.current().from, Some(Route::Profile));
        assert_eq!(nav.len(), 1);
    }
}
