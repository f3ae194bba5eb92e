//! Page controllers.
//!
//! Each view holds the state its page shows and exposes the page's actions as
//! async methods.  They talk to the backend only through [`Backend`] and only
//! with the session in the [`SessionContext`] they are handed.
//!
//! [`Backend`]: crate::backend::Backend
//! [`SessionContext`]: crate::auth::SessionContext

mod chat;
mod login;
mod profile;

pub use chat::{ChatView, NEW_CHAT_TITLE, SendStatus};
pub use login::{AuthTab, CONFIRM_EMAIL, LoginView};
pub use profile::{PROFILE_UPDATED, ProfileView};
