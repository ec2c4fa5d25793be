pub mod conversations;
pub mod export;
pub mod settings;
pub mod storage;

pub use conversations::{truncate_title, ConversationStore};
pub use export::{
    conversation_to_markdown, export_settings, import_settings, ImportError, SettingsExport,
};
pub use settings::{SettingsPatch, SettingsStore, SubscriberId};
pub use storage::Storage;
