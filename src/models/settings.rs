use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::provider::ProviderId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Theme {
    System,
    Light,
    Dark,
}

/// Global application configuration. Created once with these defaults on
/// first run, mutated only through `SettingsStore::update`, and never
/// deleted except by an explicit `reset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSettings {
    pub theme: Theme,
    pub default_model: String,
    /// Provider id → API secret. A missing or empty entry means no
    /// credential is configured for that provider.
    #[serde(default)]
    pub credentials: HashMap<String, String>,
    pub max_stored_conversations: usize,
    /// Number of most recent non-system messages replayed per exchange.
    /// Zero means unlimited.
    pub context_window_limit: usize,
    pub save_history: bool,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            default_model: "gpt-4o-mini".to_string(),
            credentials: HashMap::new(),
            max_stored_conversations: 50,
            context_window_limit: 0,
            save_history: true,
        }
    }
}

impl GlobalSettings {
    pub fn credential_for(&self, provider: ProviderId) -> Option<&str> {
        self.credentials
            .get(provider.as_str())
            .map(String::as_str)
            .filter(|secret| !secret.is_empty())
    }
}
