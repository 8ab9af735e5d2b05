pub mod ai;
pub mod chat;
pub mod config;
pub mod credentials;
pub mod error;
pub mod format;
pub mod page;
pub mod state;

// Re-export main types for convenience
pub use ai::{CompletionService, GeminiClient};
pub use chat::{ChatClient, ChatWidget, Notification, NotificationLevel, PendingReply, TurnId, TurnOutcome};
pub use config::Config;
pub use credentials::{ConfigCredentials, CredentialStore, MemoryCredentials};
pub use error::CompletionError;
pub use format::{format_reply, Block, Inline, Reply};
pub use page::{Cta, Feature, LandingPage};
pub use state::{ChatMessage, ChatRole, Content, Conversation};
