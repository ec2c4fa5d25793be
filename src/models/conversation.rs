use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::Message;

/// Placeholder title assigned to a fresh conversation until the first
/// successful exchange derives one from the user's text.
pub const DEFAULT_TITLE: &str = "New Conversation";

/// Per-conversation request configuration. Attached to the conversation,
/// not global; new conversations copy the stored chat defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatParameters {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    #[serde(default)]
    pub system_prompt: String,
}

impl ChatParameters {
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.7,
            max_output_tokens: 1024,
            system_prompt: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub parameters: ChatParameters,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(parameters: ChatParameters) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: DEFAULT_TITLE.to_string(),
            parameters,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_TITLE
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
