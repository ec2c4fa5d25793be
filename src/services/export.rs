use std::collections::HashMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::settings::{SettingsPatch, SettingsStore};
use crate::models::{ChatParameters, Conversation, GlobalSettings, Role};

pub const EXPORT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid settings import: {0}")]
    InvalidImport(String),
}

/// Portable settings document. `deny_unknown_fields` keeps import strict:
/// a payload with unexpected structure is rejected, not partially applied.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsExport {
    pub version: u32,
    pub global: GlobalSettings,
    pub chat_defaults: ChatParameters,
}

/// Serialize the current settings. With `redact_credentials`, secrets are
/// replaced by empty strings so the document can be shared; an import of
/// such a document leaves stored secrets untouched.
pub async fn export_settings(store: &SettingsStore, redact_credentials: bool) -> Result<String> {
    let mut global = store.get().await?;
    if redact_credentials {
        for secret in global.credentials.values_mut() {
            secret.clear();
        }
    }
    let export = SettingsExport {
        version: EXPORT_VERSION,
        global,
        chat_defaults: store.chat_defaults().await?,
    };
    Ok(serde_json::to_string_pretty(&export)?)
}

/// Validate and apply an exported settings document. Validation happens
/// before any write, so a rejected import leaves settings untouched.
/// Redacted (empty) credential entries never overwrite stored secrets
/// unless `overwrite_credentials` is set.
pub async fn import_settings(
    store: &SettingsStore,
    json: &str,
    overwrite_credentials: bool,
) -> Result<GlobalSettings> {
    let parsed: SettingsExport = serde_json::from_str(json)
        .map_err(|e| ImportError::InvalidImport(e.to_string()))?;
    validate(&parsed)?;

    let mut credentials: HashMap<String, String> = parsed.global.credentials;
    if !overwrite_credentials {
        credentials.retain(|_, secret| !secret.is_empty());
    }

    let settings = store
        .update(SettingsPatch {
            theme: Some(parsed.global.theme),
            default_model: Some(parsed.global.default_model),
            credentials: Some(credentials),
            max_stored_conversations: Some(parsed.global.max_stored_conversations),
            context_window_limit: Some(parsed.global.context_window_limit),
            save_history: Some(parsed.global.save_history),
        })
        .await?;
    store.update_chat_defaults(parsed.chat_defaults).await?;

    Ok(settings)
}

fn validate(export: &SettingsExport) -> Result<(), ImportError> {
    if export.version != EXPORT_VERSION {
        return Err(ImportError::InvalidImport(format!(
            "unsupported export version {}",
            export.version
        )));
    }
    if export.global.max_stored_conversations == 0 {
        return Err(ImportError::InvalidImport(
            "max_stored_conversations must be positive".to_string(),
        ));
    }
    let t = export.chat_defaults.temperature;
    if !(0.0..=1.0).contains(&t) {
        return Err(ImportError::InvalidImport(format!(
            "temperature {t} outside [0, 1]"
        )));
    }
    if export.chat_defaults.max_output_tokens == 0 {
        return Err(ImportError::InvalidImport(
            "max_output_tokens must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Render a conversation transcript as markdown.
pub fn conversation_to_markdown(conversation: &Conversation) -> String {
    let mut output = format!("# {}\n\n", conversation.title);
    output.push_str(&format!(
        "> Model: {} | Date: {}\n\n",
        conversation.parameters.model,
        conversation.created_at.format("%Y-%m-%d %H:%M")
    ));

    if !conversation.parameters.system_prompt.is_empty() {
        output.push_str(&format!(
            "> System Prompt: {}\n\n",
            conversation.parameters.system_prompt
        ));
    }

    output.push_str("---\n\n");

    for msg in &conversation.messages {
        let role_label = match msg.role {
            Role::System => "System",
            Role::User => "You",
            Role::Assistant => "Assistant",
        };
        output.push_str(&format!("### {}\n\n{}\n\n", role_label, msg.content));
    }

    output
}
