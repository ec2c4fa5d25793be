//! Conversation engine for a lightweight multi-provider AI chat client:
//! provider wire-protocol normalization, message-count context trimming,
//! merge-on-write settings, and capacity-bounded conversation persistence.

pub mod context;
pub mod dispatch;
pub mod models;
pub mod providers;
pub mod services;
pub mod session;

pub use dispatch::{BoundaryRequest, BoundaryResponse, Dispatcher};
pub use models::{
    ChatParameters, Conversation, GlobalSettings, Message, ProviderId, Role, Theme,
};
pub use providers::{ChatError, ChatTransport, HttpTransport};
pub use services::{ConversationStore, SettingsPatch, SettingsStore, Storage};
pub use session::{ConversationSession, SessionState};
