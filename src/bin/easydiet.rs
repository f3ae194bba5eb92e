//! Terminal client for the EasyDiet assistant.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a local backend, auth settings from EASYDIET_* variables
//! easydiet
//!
//! # Point at another backend and auth service
//! easydiet --api-base https://diet.example.com --auth-url https://xyz.supabase.co --auth-key KEY
//!
//! # Read settings from a YAML file and disable colors
//! easydiet --config easydiet.yaml --no-color
//! ```
//!
//! Type `/help` at the prompt for the list of commands.  Anything that is not
//! a command is sent to the assistant when a conversation page is showing.

use std::sync::Arc;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use easydiet::app::{App, ChatArgs, ClientState, Flow, carries_credentials};
use easydiet::auth::{SessionProvider, auth_service};
use easydiet::render::{PlainTextRenderer, Renderer};
use easydiet::{Config, EasyDiet};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("easydiet [OPTIONS]");

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("EASYDIET_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = args.resolve(Config::from_env())?;
    let backend = Arc::new(EasyDiet::new(&config)?);
    let provider = SessionProvider::mount(auth_service(&config)?).await;

    let mut app = App::new(backend, provider);
    if let Some(dir) = config.state_dir() {
        app = app.with_state_file(ClientState::path_in(dir), args.fresh);
    }

    let mut renderer = PlainTextRenderer::with_color(args.use_color());
    let mut rl = DefaultEditor::new()?;

    println!("EasyDiet (backend: {})", config.api_base);
    println!("Type /help for commands, /quit to exit");
    app.refresh(&mut renderer).await;

    loop {
        match rl.readline(&app.prompt()) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    app.refresh(&mut renderer).await;
                    continue;
                }
                // Passwords typed into /login and /signup stay out of history.
                if !carries_credentials(line) {
                    let _ = rl.add_history_entry(line);
                }
                if app.handle(line, &mut renderer).await == Flow::Quit {
                    println!("Goodbye!");
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {err}"));
                break;
            }
        }
    }

    app.into_provider().unmount();
    Ok(())
}
