//! The terminal application: routes input to the views and keeps the screen
//! in step with the navigator and the session.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::app::commands::{AppCommand, Target, help_text, parse_command};
use crate::app::state::ClientState;
use crate::auth::SessionProvider;
use crate::backend::Backend;
use crate::guard::{GuardOutcome, settle};
use crate::render::{Renderer, html_transcript};
use crate::router::{Navigator, Route};
use crate::types::ProfileField;
use crate::views::{AuthTab, ChatView, LoginView, ProfileView, SendStatus};

/// What the input loop should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Which page is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// The session is still being resolved.
    Loading,
    Login,
    Chat,
    Profile,
}

/// The terminal client.
pub struct App {
    backend: Arc<dyn Backend>,
    provider: SessionProvider,
    navigator: Navigator,
    screen: Screen,
    login: LoginView,
    chat: ChatView,
    profile: ProfileView,
    state: ClientState,
    state_path: Option<PathBuf>,
}

impl App {
    /// Creates the app at `/`.
    pub fn new(backend: Arc<dyn Backend>, provider: SessionProvider) -> Self {
        Self {
            backend,
            provider,
            navigator: Navigator::default(),
            screen: Screen::Loading,
            login: LoginView::new(),
            chat: ChatView::new(),
            profile: ProfileView::new(),
            state: ClientState::default(),
            state_path: None,
        }
    }

    /// Remembers the open conversation in `path`, and starts in the
    /// conversation remembered there unless `fresh`.
    pub fn with_state_file(mut self, path: PathBuf, fresh: bool) -> Self {
        if !fresh {
            self.state = ClientState::load(&path);
            if let Some(id) = &self.state.last_conversation_id {
                debug!(conversation_id = %id, "reopening remembered conversation");
                self.navigator = Navigator::new(Route::conversation(id.as_str()));
            }
        }
        self.state_path = Some(path);
        self
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn chat(&self) -> &ChatView {
        &self.chat
    }

    pub fn profile(&self) -> &ProfileView {
        &self.profile
    }

    pub fn login(&self) -> &LoginView {
        &self.login
    }

    pub fn provider(&self) -> &SessionProvider {
        &self.provider
    }

    /// Tears the app down, returning the provider so it can be unmounted.
    pub fn into_provider(self) -> SessionProvider {
        self.provider
    }

    /// The prompt for the input line.
    pub fn prompt(&self) -> String {
        match self.screen {
            Screen::Loading => "...> ".to_string(),
            Screen::Login => match self.login.tab() {
                AuthTab::LogIn => "login> ".to_string(),
                AuthTab::SignUp => "signup> ".to_string(),
            },
            Screen::Chat => match self.chat.chat_id() {
                Some(_) => format!("{}> ", self.chat.current_title()),
                None => "chat> ".to_string(),
            },
            Screen::Profile => "profile> ".to_string(),
        }
    }

    /// Resolves the current route through the guards and mounts the page it
    /// lands on.  Call after anything that may navigate or change the session.
    pub async fn refresh(&mut self, renderer: &mut dyn Renderer) {
        let state = self.provider.state();
        let outcome = settle(&mut self.navigator, &state);
        let route = self.navigator.route().clone();
        let screen = match (&outcome, &route) {
            (GuardOutcome::Loading, _) | (GuardOutcome::Redirect { .. }, _) => Screen::Loading,
            (GuardOutcome::Render, Route::Login) => Screen::Login,
            (GuardOutcome::Render, Route::Chat { .. }) => Screen::Chat,
            (GuardOutcome::Render, Route::Profile) => Screen::Profile,
            (GuardOutcome::Render, Route::NotFound(_)) => Screen::Loading,
        };
        let context = self.provider.context();
        let entered = screen != self.screen;
        if entered && self.screen != Screen::Loading {
            debug!(from = ?self.screen, to = ?screen, "screen change");
        }
        match screen {
            Screen::Loading => {
                if entered {
                    renderer.print_hint("Loading…");
                }
            }
            Screen::Login => {
                if entered {
                    // Views are remounted fresh after signing out.
                    self.chat = ChatView::new();
                    self.profile = ProfileView::new();
                    self.show_login(renderer);
                }
            }
            Screen::Chat => {
                if entered {
                    self.chat
                        .mount(&context, self.backend.as_ref(), route.chat_id())
                        .await;
                    self.show_chat(renderer);
                } else if self.chat.chat_id() != route.chat_id() {
                    self.chat
                        .sync_route(&context, self.backend.as_ref(), route.chat_id())
                        .await;
                    self.show_thread(renderer);
                }
            }
            Screen::Profile => {
                if entered {
                    self.profile = ProfileView::new();
                    self.profile.mount(&context, self.backend.as_ref()).await;
                    self.show_profile(renderer);
                }
            }
        }
        self.screen = screen;
        self.remember();
    }

    /// Handles one line of input.
    pub async fn handle(&mut self, line: &str, renderer: &mut dyn Renderer) -> Flow {
        // The session may have changed in the background since the last line.
        self.refresh(renderer).await;
        let line = line.trim();
        if line.is_empty() {
            return Flow::Continue;
        }
        let Some(command) = parse_command(line) else {
            self.send(line, renderer).await;
            return Flow::Continue;
        };
        match command {
            AppCommand::Quit => return Flow::Quit,
            AppCommand::Help => {
                for line in help_text().lines() {
                    renderer.print_info(&format!("    {line}"));
                }
            }
            AppCommand::Invalid(message) => renderer.print_error(&message),
            AppCommand::Login { email, password } => {
                if self.screen != Screen::Login {
                    renderer.print_error("Already signed in. Use /logout first.");
                } else if self
                    .login
                    .submit_login(&self.provider, &mut self.navigator, &email, &password)
                    .await
                {
                    self.refresh(renderer).await;
                } else {
                    self.show_feedback(renderer);
                }
            }
            AppCommand::SignUp {
                username,
                email,
                password,
            } => {
                if self.screen != Screen::Login {
                    renderer.print_error("Already signed in. Use /logout first.");
                } else if self
                    .login
                    .submit_signup(
                        &self.provider,
                        &mut self.navigator,
                        &username,
                        &email,
                        &password,
                    )
                    .await
                {
                    self.refresh(renderer).await;
                } else {
                    self.show_feedback(renderer);
                }
            }
            AppCommand::Logout => {
                self.provider.sign_out().await;
                if let Some(err) = self.provider.last_error() {
                    warn!("sign-out was not confirmed by the service: {err}");
                }
                renderer.print_info("Signed out.");
                self.refresh(renderer).await;
            }
            AppCommand::Tab(tab) => {
                self.login.select_tab(tab);
                if self.screen == Screen::Login {
                    self.show_login(renderer);
                }
            }
            AppCommand::Chat(id) => {
                let route = match id {
                    Some(id) => Route::conversation(id),
                    None => Route::chat(),
                };
                self.go(route, renderer).await;
            }
            AppCommand::Profile => self.go(Route::Profile, renderer).await,
            AppCommand::Back => {
                if self.navigator.back() {
                    self.refresh(renderer).await;
                } else {
                    renderer.print_hint("Nothing to go back to.");
                }
            }
            AppCommand::New => {
                if self.enter_chat(renderer).await {
                    let context = self.provider.context();
                    self.chat
                        .create_conversation(
                            &context,
                            self.backend.as_ref(),
                            &mut self.navigator,
                            false,
                        )
                        .await;
                    self.show_chat(renderer);
                }
            }
            AppCommand::List => {
                if self.enter_chat(renderer).await {
                    let context = self.provider.context();
                    self.chat
                        .load_conversations(&context, self.backend.as_ref())
                        .await;
                    renderer.print_conversations(self.chat.conversations(), self.chat.chat_id());
                    self.show_status(renderer);
                }
            }
            AppCommand::Open(target) => {
                if self.enter_chat(renderer).await {
                    match self.resolve_target(&target) {
                        Some(id) => {
                            let context = self.provider.context();
                            self.chat
                                .select(&context, self.backend.as_ref(), &mut self.navigator, &id)
                                .await;
                            self.show_thread(renderer);
                        }
                        None => renderer.print_error("No such conversation. Try /list."),
                    }
                }
            }
            AppCommand::Delete(target) => {
                if self.enter_chat(renderer).await {
                    match self.resolve_target(&target) {
                        Some(id) => {
                            let context = self.provider.context();
                            self.chat
                                .delete(&context, self.backend.as_ref(), &mut self.navigator, &id)
                                .await;
                            if self.chat.status().error().is_none() {
                                renderer.print_info("Conversation deleted.");
                            }
                            self.show_status(renderer);
                        }
                        None => renderer.print_error("No such conversation. Try /list."),
                    }
                }
            }
            AppCommand::History => {
                if self.enter_chat(renderer).await {
                    if let Some(id) = self.chat.chat_id().map(str::to_string) {
                        let context = self.provider.context();
                        self.chat
                            .load_messages(&context, self.backend.as_ref(), &id)
                            .await;
                    }
                    self.show_thread(renderer);
                }
            }
            AppCommand::SetField(field, value) => {
                if self.enter_profile(renderer).await {
                    self.profile.set_field(field, value);
                    renderer.print_info(&format!(
                        "{} set. Use /save to keep it.",
                        field.label()
                    ));
                }
            }
            AppCommand::Save => {
                if self.enter_profile(renderer).await {
                    let context = self.provider.context();
                    self.profile.save(&context, self.backend.as_ref()).await;
                    if let Some(status) = self.profile.status() {
                        renderer.print_info(status);
                    }
                }
            }
            AppCommand::Export(path) => {
                if self.screen != Screen::Chat || self.chat.chat_id().is_none() {
                    renderer.print_error("Open a conversation to export it.");
                } else {
                    let html = html_transcript(self.chat.current_title(), self.chat.messages());
                    match fs::write(&path, html) {
                        Ok(()) => renderer.print_info(&format!("Conversation written to {path}")),
                        Err(err) => {
                            renderer.print_error(&format!("Failed to write {path}: {err}"))
                        }
                    }
                }
            }
            AppCommand::Health => match self.backend.health().await {
                Ok(health) => renderer.print_info(&format!(
                    "Backend {} (model: {})",
                    if health.ok { "ok" } else { "unhealthy" },
                    health.model.as_deref().unwrap_or("unknown")
                )),
                Err(err) => renderer.print_error(&err.to_string()),
            },
            AppCommand::WhoAmI => match self.provider.context().user() {
                Some(user) => {
                    let email = user.email.as_deref().unwrap_or("(no email)");
                    match user.username() {
                        Some(username) => {
                            renderer.print_info(&format!("Signed in as {username} <{email}>"))
                        }
                        None => renderer.print_info(&format!("Signed in as {email}")),
                    }
                }
                None => renderer.print_info("Not signed in."),
            },
        }
        self.remember();
        Flow::Continue
    }

    async fn go(&mut self, route: Route, renderer: &mut dyn Renderer) {
        if self.navigator.route() != &route {
            self.navigator.push(route);
        }
        self.refresh(renderer).await;
    }

    /// Makes sure the chat page is showing, navigating there if needed.
    /// Returns false when the guards land elsewhere.
    async fn enter_chat(&mut self, renderer: &mut dyn Renderer) -> bool {
        if self.screen != Screen::Chat {
            self.go(Route::chat(), renderer).await;
        }
        self.screen == Screen::Chat
    }

    async fn enter_profile(&mut self, renderer: &mut dyn Renderer) -> bool {
        if self.screen != Screen::Profile {
            self.go(Route::Profile, renderer).await;
        }
        self.screen == Screen::Profile
    }

    async fn send(&mut self, text: &str, renderer: &mut dyn Renderer) {
        if !self.enter_chat(renderer).await {
            renderer.print_hint("Sign in to chat. Type /help for commands.");
            return;
        }
        let before = self.chat.messages().len();
        let context = self.provider.context();
        self.chat.set_input(text);
        self.chat
            .send(&context, self.backend.as_ref(), &mut self.navigator, None)
            .await;
        for message in self.chat.messages().iter().skip(before) {
            if message.is_assistant() {
                renderer.print_message(message);
            }
        }
        self.show_status(renderer);
    }

    fn resolve_target(&self, target: &Target) -> Option<String> {
        match target {
            Target::Index(index) => self
                .chat
                .conversations()
                .get(index - 1)
                .map(|c| c.id.clone()),
            Target::Id(id) => Some(id.clone()),
        }
    }

    fn remember(&mut self) {
        let Some(path) = &self.state_path else {
            return;
        };
        let open = match self.screen {
            Screen::Chat => self.chat.chat_id().map(str::to_string),
            Screen::Login => None,
            Screen::Loading | Screen::Profile => return,
        };
        if open == self.state.last_conversation_id {
            return;
        }
        self.state.last_conversation_id = open;
        if let Err(err) = self.state.save(path) {
            warn!("could not save client state: {err}");
        }
    }

    fn show_login(&self, renderer: &mut dyn Renderer) {
        renderer.print_heading("Easy Diet");
        renderer.print_info("Your new healthy diet is just a few clicks away!");
        renderer.print_hint(&format!(
            "[{}] Use /login <email> <password> or /signup <username> <email> <password>.",
            self.login.tab()
        ));
        self.show_feedback(renderer);
    }

    fn show_feedback(&self, renderer: &mut dyn Renderer) {
        if let Some(feedback) = self.login.feedback() {
            renderer.print_error(feedback);
        }
    }

    fn show_chat(&self, renderer: &mut dyn Renderer) {
        renderer.print_heading("Conversations");
        if self.chat.sidebar_loading() {
            renderer.print_hint("Loading…");
        }
        renderer.print_conversations(self.chat.conversations(), self.chat.chat_id());
        self.show_thread(renderer);
    }

    fn show_thread(&self, renderer: &mut dyn Renderer) {
        renderer.print_heading(self.chat.current_title());
        for message in self.chat.messages() {
            renderer.print_message(message);
        }
        match self.chat.chat_id() {
            None => renderer.print_hint("Select a conversation or start a new one."),
            Some(_) if self.chat.messages().is_empty() => {
                renderer.print_hint("No messages yet. Say hello!")
            }
            Some(_) => {}
        }
        self.show_status(renderer);
    }

    fn show_status(&self, renderer: &mut dyn Renderer) {
        if let SendStatus::Failed(message) = self.chat.status() {
            renderer.print_error(message);
        }
    }

    fn show_profile(&self, renderer: &mut dyn Renderer) {
        renderer.print_heading("Nutrition Profile");
        if let Some(status) = self.profile.status() {
            renderer.print_info(status);
        }
        for field in ProfileField::ALL {
            let value = self.profile.form().get(field);
            let value = if value.is_empty() { "(empty)" } else { value };
            renderer.print_info(&format!("{}: {}", field.label(), value));
        }
        renderer.print_hint("Edit with /goals <text> and /restrictions <text>, then /save.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthState;
    use crate::render::PlainTextRenderer;
    use crate::testing::{MockAuth, MockBackend, test_session};
    use crate::types::{Conversation, HistoryMessage, Profile, Role};

    type Out = PlainTextRenderer<Vec<u8>>;

    fn renderer() -> Out {
        PlainTextRenderer::to_writer(Vec::new(), false)
    }

    fn output(renderer: Out) -> String {
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    async fn start(auth: MockAuth, backend: MockBackend) -> (App, Arc<MockBackend>) {
        let backend = Arc::new(backend);
        let provider = SessionProvider::mount(Arc::new(auth)).await;
        (App::new(backend.clone(), provider), backend)
    }

    fn seeded() -> MockBackend {
        MockBackend::new()
            .with_conversation(
                Conversation::new("c1", "Breakfast ideas"),
                vec![
                    HistoryMessage::new(Role::User, "eggs?"),
                    HistoryMessage::new(Role::Model, "<p>Yes, <script>x()</script>eggs.</p>"),
                ],
            )
            .with_profile(Profile {
                fitness_goals: Some("lose weight".to_string()),
                dietary_restrictions: Some("vegan".to_string()),
            })
    }

    #[tokio::test]
    async fn visitor_lands_on_login() {
        let (mut app, _) = start(MockAuth::new(), seeded()).await;
        let mut out = renderer();
        app.refresh(&mut out).await;
        assert_eq!(app.screen(), Screen::Login);
        assert_eq!(app.prompt(), "login> ");
        assert!(output(out).contains("Easy Diet"));
    }

    #[tokio::test]
    async fn member_lands_on_chat() {
        let (mut app, _) = start(MockAuth::new().with_session(test_session()), seeded()).await;
        let mut out = renderer();
        app.refresh(&mut out).await;
        assert_eq!(app.screen(), Screen::Chat);
        assert_eq!(app.navigator().route(), &Route::chat());
        let text = output(out);
        assert!(text.contains("Breakfast ideas"));
        assert!(text.contains("Select a conversation"));
    }

    #[tokio::test]
    async fn protected_command_redirects_then_login_returns() {
        let auth = MockAuth::new().with_account("a@example.com", "secret");
        let (mut app, _) = start(auth, seeded()).await;
        let mut out = renderer();
        app.refresh(&mut out).await;

        app.handle("/profile", &mut out).await;
        assert_eq!(app.screen(), Screen::Login);
        assert_eq!(app.navigator().current().from, Some(Route::Profile));

        app.handle("/login a@example.com wrong", &mut out).await;
        assert_eq!(app.screen(), Screen::Login);
        assert_eq!(app.login().feedback(), Some("Invalid login credentials"));

        app.handle("/login a@example.com secret", &mut out).await;
        assert_eq!(app.screen(), Screen::Profile);
        assert_eq!(app.profile().form().fitness_goals, "lose weight");
        assert!(output(out).contains("Invalid login credentials"));
    }

    #[tokio::test]
    async fn message_creates_conversation() {
        let (mut app, backend) = start(
            MockAuth::new().with_session(test_session()),
            MockBackend::new(),
        )
        .await;
        let mut out = renderer();
        app.refresh(&mut out).await;
        app.handle("Is oatmeal healthy?", &mut out).await;
        assert_eq!(app.navigator().route(), &Route::conversation("conv-1"));
        assert_eq!(app.chat().status(), &SendStatus::Ready);
        assert_eq!(backend.conversations().len(), 1);
        assert!(output(out).contains("Try Is oatmeal healthy?"));
    }

    #[tokio::test]
    async fn open_and_delete_by_index() {
        let (mut app, backend) =
            start(MockAuth::new().with_session(test_session()), seeded()).await;
        let mut out = renderer();
        app.refresh(&mut out).await;
        app.handle("/open 1", &mut out).await;
        assert_eq!(app.navigator().route(), &Route::conversation("c1"));
        assert_eq!(app.prompt(), "Breakfast ideas> ");

        app.handle("/delete 1", &mut out).await;
        assert_eq!(app.navigator().route(), &Route::chat());
        assert!(backend.conversations().is_empty());
        let text = output(out);
        assert!(text.contains("Yes, eggs."));
        assert!(!text.contains("x()"));
        assert!(text.contains("Conversation deleted."));
    }

    #[tokio::test]
    async fn profile_edit_and_save() {
        let (mut app, backend) =
            start(MockAuth::new().with_session(test_session()), seeded()).await;
        let mut out = renderer();
        app.refresh(&mut out).await;
        app.handle("/goals gain muscle", &mut out).await;
        assert_eq!(app.screen(), Screen::Profile);
        app.handle("/save", &mut out).await;
        assert_eq!(app.profile().status(), Some("Profile updated!"));
        assert_eq!(
            backend.saved_profile().map(|f| f.fitness_goals),
            Some("gain muscle".to_string())
        );
    }

    #[tokio::test]
    async fn logout_returns_to_login() {
        let (mut app, _) = start(MockAuth::new().with_session(test_session()), seeded()).await;
        let mut out = renderer();
        app.refresh(&mut out).await;
        app.handle("/logout", &mut out).await;
        assert_eq!(app.provider().state(), AuthState::Unauthenticated);
        assert_eq!(app.screen(), Screen::Login);
        assert_eq!(app.navigator().current().from, Some(Route::chat()));
    }

    #[tokio::test]
    async fn remembers_last_conversation() {
        let dir = tempfile::tempdir().unwrap();
        let path = ClientState::path_in(dir.path());
        {
            let (app, _) = start(MockAuth::new().with_session(test_session()), seeded()).await;
            let mut app = app.with_state_file(path.clone(), false);
            let mut out = renderer();
            app.refresh(&mut out).await;
            app.handle("/open c1", &mut out).await;
        }
        assert_eq!(
            ClientState::load(&path).last_conversation_id.as_deref(),
            Some("c1")
        );

        let (app, _) = start(MockAuth::new().with_session(test_session()), seeded()).await;
        let mut app = app.with_state_file(path.clone(), false);
        let mut out = renderer();
        app.refresh(&mut out).await;
        assert_eq!(app.chat().chat_id(), Some("c1"));

        let (app, _) = start(MockAuth::new().with_session(test_session()), seeded()).await;
        let mut app = app.with_state_file(path, true);
        let mut out = renderer();
        app.refresh(&mut out).await;
        assert_eq!(app.chat().chat_id(), None);
    }

    #[tokio::test]
    async fn export_writes_sanitized_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("chat.html");
        let (mut app, _) = start(MockAuth::new().with_session(test_session()), seeded()).await;
        let mut out = renderer();
        app.refresh(&mut out).await;
        app.handle("/open c1", &mut out).await;
        app.handle(&format!("/export {}", file.display()), &mut out).await;
        let html = fs::read_to_string(&file).unwrap();
        assert!(html.contains("<title>Breakfast&#32;ideas</title>"));
        assert!(!html.contains("<script"));
    }

    #[tokio::test]
    async fn health_and_whoami() {
        let (mut app, _) = start(MockAuth::new().with_session(test_session()), seeded()).await;
        let mut out = renderer();
        app.handle("/health", &mut out).await;
        app.handle("/whoami", &mut out).await;
        assert_eq!(app.handle("/quit", &mut out).await, Flow::Quit);
        let text = output(out);
        assert!(text.contains("Backend ok (model: mock-model)"));
        assert!(text.contains("Signed in as a@example.com"));
    }
}
