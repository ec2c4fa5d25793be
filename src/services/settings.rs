use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::storage::Storage;
use crate::models::{ChatParameters, GlobalSettings, Theme};

const GLOBAL_SETTINGS_KEY: &str = "globalSettings";
const CHAT_SETTINGS_KEY: &str = "chatSettings";

/// Partial update applied over the current settings. Scalar fields
/// overwrite; `credentials` merges key-by-key, so updating one provider's
/// secret never blanks the others.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsPatch {
    pub theme: Option<Theme>,
    pub default_model: Option<String>,
    pub credentials: Option<HashMap<String, String>>,
    pub max_stored_conversations: Option<usize>,
    pub context_window_limit: Option<usize>,
    pub save_history: Option<bool>,
}

pub type SubscriberId = u64;

type GlobalCallback = Box<dyn Fn(&GlobalSettings) + Send>;
type ChatCallback = Box<dyn Fn(&ChatParameters) + Send>;

#[derive(Default)]
struct Subscribers {
    next_id: SubscriberId,
    global: Vec<(SubscriberId, GlobalCallback)>,
    chat: Vec<(SubscriberId, ChatCallback)>,
}

/// Owns the `globalSettings` and `chatSettings` documents. Updates are
/// merge-on-write and notify subscribers synchronously.
#[derive(Clone)]
pub struct SettingsStore {
    storage: Storage,
    subscribers: Arc<Mutex<Subscribers>>,
}

impl SettingsStore {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            subscribers: Arc::new(Mutex::new(Subscribers::default())),
        }
    }

    /// Current global settings; written with documented defaults on first
    /// access.
    pub async fn get(&self) -> Result<GlobalSettings> {
        match self.storage.get(GLOBAL_SETTINGS_KEY).await? {
            Some(json) => Ok(serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!("corrupt settings document, using defaults: {e}");
                GlobalSettings::default()
            })),
            None => {
                let defaults = GlobalSettings::default();
                self.persist_global(&defaults).await?;
                Ok(defaults)
            }
        }
    }

    pub async fn update(&self, patch: SettingsPatch) -> Result<GlobalSettings> {
        let mut settings = self.get().await?;
        apply_patch(&mut settings, patch);
        self.persist_global(&settings).await?;
        self.notify_global(&settings);
        Ok(settings)
    }

    /// Restore documented defaults and notify subscribers.
    pub async fn reset(&self) -> Result<GlobalSettings> {
        let defaults = GlobalSettings::default();
        self.persist_global(&defaults).await?;
        self.storage.remove(CHAT_SETTINGS_KEY).await?;
        self.notify_global(&defaults);
        Ok(defaults)
    }

    /// Default `ChatParameters` template for new conversations.
    pub async fn chat_defaults(&self) -> Result<ChatParameters> {
        if let Some(json) = self.storage.get(CHAT_SETTINGS_KEY).await? {
            if let Ok(params) = serde_json::from_str(&json) {
                return Ok(params);
            }
            tracing::warn!("corrupt chat defaults document, using defaults");
        }
        let settings = self.get().await?;
        Ok(ChatParameters::for_model(settings.default_model))
    }

    pub async fn update_chat_defaults(&self, params: ChatParameters) -> Result<ChatParameters> {
        let json = serde_json::to_string(&params)?;
        self.storage.set(CHAT_SETTINGS_KEY, &json).await?;
        self.notify_chat(&params);
        Ok(params)
    }

    pub fn subscribe_global(
        &self,
        callback: impl Fn(&GlobalSettings) + Send + 'static,
    ) -> SubscriberId {
        let mut subs = self.subscribers.lock().unwrap();
        let id = subs.next_id;
        subs.next_id += 1;
        subs.global.push((id, Box::new(callback)));
        id
    }

    pub fn subscribe_chat(
        &self,
        callback: impl Fn(&ChatParameters) + Send + 'static,
    ) -> SubscriberId {
        let mut subs = self.subscribers.lock().unwrap();
        let id = subs.next_id;
        subs.next_id += 1;
        subs.chat.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        let mut subs = self.subscribers.lock().unwrap();
        subs.global.retain(|(sub_id, _)| *sub_id != id);
        subs.chat.retain(|(sub_id, _)| *sub_id != id);
    }

    async fn persist_global(&self, settings: &GlobalSettings) -> Result<()> {
        let json = serde_json::to_string(settings)?;
        self.storage.set(GLOBAL_SETTINGS_KEY, &json).await
    }

    // Subscribers run synchronously; a panicking subscriber is isolated so
    // it cannot block the updater or the remaining subscribers.
    fn notify_global(&self, settings: &GlobalSettings) {
        let subs = self.subscribers.lock().unwrap();
        for (id, callback) in &subs.global {
            if catch_unwind(AssertUnwindSafe(|| callback(settings))).is_err() {
                tracing::error!(subscriber = *id, "settings subscriber panicked");
            }
        }
    }

    fn notify_chat(&self, params: &ChatParameters) {
        let subs = self.subscribers.lock().unwrap();
        for (id, callback) in &subs.chat {
            if catch_unwind(AssertUnwindSafe(|| callback(params))).is_err() {
                tracing::error!(subscriber = *id, "chat defaults subscriber panicked");
            }
        }
    }
}

fn apply_patch(settings: &mut GlobalSettings, patch: SettingsPatch) {
    if let Some(theme) = patch.theme {
        settings.theme = theme;
    }
    if let Some(default_model) = patch.default_model {
        settings.default_model = default_model;
    }
    if let Some(credentials) = patch.credentials {
        for (provider, secret) in credentials {
            settings.credentials.insert(provider, secret);
        }
    }
    if let Some(max) = patch.max_stored_conversations {
        settings.max_stored_conversations = max;
    }
    if let Some(limit) = patch.context_window_limit {
        settings.context_window_limit = limit;
    }
    if let Some(save_history) = patch.save_history {
        settings.save_history = save_history;
    }
}
