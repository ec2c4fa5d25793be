pub mod conversation;
pub mod message;
pub mod provider;
pub mod settings;

pub use conversation::{ChatParameters, Conversation, DEFAULT_TITLE};
pub use message::{Message, Role};
pub use provider::ProviderId;
pub use settings::{GlobalSettings, Theme};
