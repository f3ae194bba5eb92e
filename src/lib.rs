// Public modules
pub mod app;
pub mod auth;
pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod guard;
pub mod observability;
pub mod render;
pub mod router;
pub mod types;
pub mod utils;
pub mod views;

#[cfg(test)]
mod testing;

// Re-exports
pub use auth::{AuthState, SessionContext, SessionProvider};
pub use backend::Backend;
pub use client::EasyDiet;
pub use config::Config;
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use types::*;
