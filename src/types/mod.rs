// Public modules
pub mod chat;
pub mod conversation;
pub mod message;
pub mod profile;
pub mod session;

// Re-exports
pub use chat::{ChatRequest, ChatResponse, Health};
pub use conversation::{Conversation, ConversationCreate};
pub use message::{DisplayMessage, HistoryMessage, Role, Sender, normalize_messages};
pub use profile::{Profile, ProfileField, ProfileForm};
pub use session::{Credentials, Session, SignUpRequest, User};
