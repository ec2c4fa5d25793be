//! Boundary message contract between the foreground UI context and this
//! privileged background engine. Requests are `{action, data}` envelopes
//! and every action resolves to `{success, data?, error?}`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::{ChatParameters, Conversation, ProviderId};
use crate::providers::{self, ChatError, ChatTransport};
use crate::services::{ConversationStore, SettingsStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryRequest {
    pub action: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BoundaryResponse {
    fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn ok_empty() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetResponsePayload {
    model: String,
    messages: Vec<crate::models::Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteConversationPayload {
    id: String,
}

pub struct Dispatcher {
    settings: SettingsStore,
    conversations: ConversationStore,
    transport: Arc<dyn ChatTransport>,
}

impl Dispatcher {
    pub fn new(
        settings: SettingsStore,
        conversations: ConversationStore,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            settings,
            conversations,
            transport,
        }
    }

    pub async fn handle(&self, request: BoundaryRequest) -> BoundaryResponse {
        tracing::debug!(action = %request.action, "boundary request");
        match request.action.as_str() {
            "getResponse" => self.get_response(request.data).await,
            "saveConversation" => self.save_conversation(request.data).await,
            "listConversations" => self.list_conversations().await,
            "deleteConversation" => self.delete_conversation(request.data).await,
            "getSettings" => self.get_settings().await,
            other => BoundaryResponse::err(format!("Unknown action: {other}")),
        }
    }

    async fn get_response(&self, data: Value) -> BoundaryResponse {
        let payload: GetResponsePayload = match serde_json::from_value(data) {
            Ok(payload) => payload,
            Err(e) => return BoundaryResponse::err(format!("Invalid getResponse payload: {e}")),
        };

        let Some(provider) = ProviderId::resolve(&payload.model) else {
            return BoundaryResponse::err(
                ChatError::UnsupportedProvider(payload.model).to_string(),
            );
        };

        let settings = match self.settings.get().await {
            Ok(settings) => settings,
            Err(e) => return BoundaryResponse::err(e.to_string()),
        };
        let Some(api_key) = settings.credential_for(provider) else {
            return BoundaryResponse::err(ChatError::MissingCredential(provider).to_string());
        };

        let params = ChatParameters {
            model: payload.model.clone(),
            temperature: payload.temperature,
            max_output_tokens: payload.max_tokens,
            system_prompt: String::new(),
        };

        match providers::complete(
            self.transport.as_ref(),
            provider,
            api_key,
            &payload.messages,
            &params,
        )
        .await
        {
            Ok(reply) => BoundaryResponse::ok(json!(reply)),
            Err(e) => BoundaryResponse::err(e.to_string()),
        }
    }

    async fn save_conversation(&self, data: Value) -> BoundaryResponse {
        let conversation: Conversation = match serde_json::from_value(data) {
            Ok(conversation) => conversation,
            Err(e) => {
                return BoundaryResponse::err(format!("Invalid saveConversation payload: {e}"))
            }
        };

        let max = match self.settings.get().await {
            Ok(settings) => settings.max_stored_conversations,
            Err(e) => return BoundaryResponse::err(e.to_string()),
        };

        match self.conversations.upsert(&conversation, max).await {
            Ok(()) => BoundaryResponse::ok_empty(),
            Err(e) => BoundaryResponse::err(e.to_string()),
        }
    }

    async fn list_conversations(&self) -> BoundaryResponse {
        match self.conversations.list().await {
            Ok(conversations) => BoundaryResponse::ok(json!(conversations)),
            Err(e) => BoundaryResponse::err(e.to_string()),
        }
    }

    async fn delete_conversation(&self, data: Value) -> BoundaryResponse {
        let payload: DeleteConversationPayload = match serde_json::from_value(data) {
            Ok(payload) => payload,
            Err(e) => {
                return BoundaryResponse::err(format!("Invalid deleteConversation payload: {e}"))
            }
        };

        match self.conversations.delete(&payload.id).await {
            Ok(found) => BoundaryResponse::ok(json!({ "found": found })),
            Err(e) => BoundaryResponse::err(e.to_string()),
        }
    }

    async fn get_settings(&self) -> BoundaryResponse {
        match self.settings.get().await {
            Ok(settings) => BoundaryResponse::ok(json!(settings)),
            Err(e) => BoundaryResponse::err(e.to_string()),
        }
    }
}
