//! Slash command parsing for the terminal client.
//!
//! Lines starting with `/` are commands; anything else is a chat message.

use crate::types::ProfileField;
use crate::views::AuthTab;

/// A conversation named either by its 1-based position in the list or by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Index(usize),
    Id(String),
}

impl Target {
    fn parse(arg: &str) -> Self {
        match arg.parse::<usize>() {
            Ok(index) if index > 0 => Target::Index(index),
            _ => Target::Id(arg.to_string()),
        }
    }
}

/// A parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Sign in with email and password.
    Login { email: String, password: String },

    /// Create an account.
    SignUp {
        username: String,
        email: String,
        password: String,
    },

    /// Sign out.
    Logout,

    /// Switch the login page's tab.
    Tab(AuthTab),

    /// Go to `/chat`, or `/chat/<id>`.
    Chat(Option<String>),

    /// Start a new conversation.
    New,

    /// Show the conversation list.
    List,

    /// Open a listed conversation.
    Open(Target),

    /// Delete a listed conversation.
    Delete(Target),

    /// Reload and show the open thread.
    History,

    /// Go to the profile page.
    Profile,

    /// Edit one profile field.
    SetField(ProfileField, String),

    /// Save the profile.
    Save,

    /// Write the open thread to an HTML file.
    Export(String),

    /// Go back one history entry.
    Back,

    /// Probe the backend.
    Health,

    /// Show the signed-in user.
    WhoAmI,

    /// Display help information.
    Help,

    /// Exit the application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

const LOGIN_NAMES: [&str; 2] = ["login", "signin"];
const SIGNUP_NAMES: [&str; 2] = ["signup", "register"];

/// True when `input` is a log-in or sign-up command, well formed or not.
/// Such lines carry a password and must not be kept in input history.
pub fn carries_credentials(input: &str) -> bool {
    input
        .trim()
        .strip_prefix('/')
        .and_then(|rest| rest.split_whitespace().next())
        .map(str::to_lowercase)
        .is_some_and(|name| {
            LOGIN_NAMES.contains(&name.as_str()) || SIGNUP_NAMES.contains(&name.as_str())
        })
}

/// Parses user input for slash commands.
///
/// Returns `Some(AppCommand)` if the input is a command, or `None` if it
/// should be sent as a chat message.
///
/// # Examples
///
/// ```
/// # use easydiet::app::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/open 2").is_some());
/// assert!(parse_command("What should I eat for lunch?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<AppCommand> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());
    let words: Vec<&str> = argument
        .map(|arg| arg.split_whitespace().collect())
        .unwrap_or_default();

    let result = match command.as_str() {
        name if LOGIN_NAMES.contains(&name) => match words.as_slice() {
            [email, password] => AppCommand::Login {
                email: email.to_string(),
                password: password.to_string(),
            },
            _ => AppCommand::Invalid("/login requires <email> <password>".to_string()),
        },
        name if SIGNUP_NAMES.contains(&name) => match words.as_slice() {
            [username, email, password] => AppCommand::SignUp {
                username: username.to_string(),
                email: email.to_string(),
                password: password.to_string(),
            },
            _ => AppCommand::Invalid("/signup requires <username> <email> <password>".to_string()),
        },
        "logout" | "signout" => AppCommand::Logout,
        "tab" => match argument.map(str::parse::<AuthTab>) {
            Some(Ok(tab)) => AppCommand::Tab(tab),
            Some(Err(err)) => AppCommand::Invalid(err),
            None => AppCommand::Invalid("/tab expects 'login' or 'signup'".to_string()),
        },
        "chat" => AppCommand::Chat(argument.map(|s| s.to_string())),
        "new" => AppCommand::New,
        "list" | "ls" => AppCommand::List,
        "open" => match argument {
            Some(arg) => AppCommand::Open(Target::parse(arg)),
            None => AppCommand::Invalid("/open requires a number or conversation id".to_string()),
        },
        "delete" | "rm" => match argument {
            Some(arg) => AppCommand::Delete(Target::parse(arg)),
            None => {
                AppCommand::Invalid("/delete requires a number or conversation id".to_string())
            }
        },
        "history" => AppCommand::History,
        "profile" => AppCommand::Profile,
        "goals" => AppCommand::SetField(
            ProfileField::FitnessGoals,
            argument.unwrap_or_default().to_string(),
        ),
        "restrictions" => AppCommand::SetField(
            ProfileField::DietaryRestrictions,
            argument.unwrap_or_default().to_string(),
        ),
        "save" => AppCommand::Save,
        "export" => match argument {
            Some(arg) => AppCommand::Export(arg.to_string()),
            None => AppCommand::Invalid("/export requires a file path".to_string()),
        },
        "back" => AppCommand::Back,
        "health" => AppCommand::Health,
        "whoami" => AppCommand::WhoAmI,
        "help" | "?" => AppCommand::Help,
        "quit" | "exit" | "q" => AppCommand::Quit,
        _ => AppCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /login <email> <password>           Sign in
  /signup <username> <email> <pw>     Create an account
  /logout                             Sign out
  /tab login|signup                   Switch the login form
  /chat [id]                          Go to the chat page (optionally a conversation)
  /new                                Start a new conversation
  /list                               List conversations
  /open <n|id>                        Open a conversation
  /delete <n|id>                      Delete a conversation
  /history                            Reload the open conversation
  /profile                            Go to the nutrition profile
  /goals <text>                       Set fitness goals
  /restrictions <text>                Set dietary restrictions
  /save                               Save the profile
  /export <file>                      Write the conversation to an HTML file
  /back                               Go back
  /health                             Check the backend
  /whoami                             Show the signed-in user
  /help                               Show this help message
  /quit                               Exit
Anything else is sent as a chat message."#
}
