//! Terminal client for the diet assistant.
//!
//! The browser client's pages become screens of a line-oriented REPL built on
//! the same views, guards, and session provider as the library.
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing layered over [`Config`](crate::Config)
//! - [`commands`]: slash command parsing
//! - [`shell`]: the [`App`] that routes input through guards to the views
//! - [`state`]: the remembered last conversation

mod commands;
mod config;
mod shell;
mod state;

pub use commands::{AppCommand, Target, carries_credentials, help_text, parse_command};
pub use config::ChatArgs;
pub use shell::{App, Flow, Screen};
pub use state::{ClientState, STATE_FILE};
