use serde::Serialize;
use serde_json::Value;

use super::types::{ChatError, WireRequest};
use super::wire::*;
use crate::models::provider::OPENROUTER_PREFIX;
use crate::models::{ChatParameters, Message, ProviderId, Role};

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const MISTRAL_URL: &str = "https://api.mistral.ai/v1/chat/completions";
const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

const ANTHROPIC_VERSION: &str = "2023-06-01";

// OpenRouter asks callers to identify the application.
const OPENROUTER_REFERER: &str = "https://github.com/murmur-chat/murmur";
const OPENROUTER_TITLE: &str = "Murmur";

/// The two request/response shapes in use. Every `ProviderId` maps onto
/// exactly one family, so adding a provider forces a decision here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WireFamily {
    OpenAiCompatible,
    Anthropic,
}

fn family(provider: ProviderId) -> WireFamily {
    match provider {
        ProviderId::OpenAi | ProviderId::Mistral | ProviderId::OpenRouter => {
            WireFamily::OpenAiCompatible
        }
        ProviderId::Anthropic => WireFamily::Anthropic,
    }
}

fn endpoint(provider: ProviderId) -> &'static str {
    match provider {
        ProviderId::OpenAi => OPENAI_URL,
        ProviderId::Anthropic => ANTHROPIC_URL,
        ProviderId::Mistral => MISTRAL_URL,
        ProviderId::OpenRouter => OPENROUTER_URL,
    }
}

/// Model identifier as transmitted on the wire: the aggregator routing
/// prefix is stripped, everything else passes through unchanged.
pub fn wire_model(model: &str) -> &str {
    model.strip_prefix(OPENROUTER_PREFIX).unwrap_or(model)
}

fn to_wire_messages(messages: &[Message]) -> Vec<WireMessage> {
    messages
        .iter()
        .map(|m| WireMessage {
            role: m.role.as_str().to_string(),
            content: m.content.clone(),
        })
        .collect()
}

fn to_body<T: Serialize>(request: &T) -> Value {
    serde_json::to_value(request).unwrap_or_default()
}

/// Build the provider-specific request. The families differ in whether the
/// system message is a first-class history entry or extracted into a
/// dedicated field, in parameter field names, and in the auth header.
pub fn build_request(
    provider: ProviderId,
    api_key: &str,
    messages: &[Message],
    params: &ChatParameters,
) -> WireRequest {
    let model = wire_model(&params.model).to_string();

    let (headers, body) = match family(provider) {
        WireFamily::OpenAiCompatible => {
            let mut headers = vec![("Authorization", format!("Bearer {api_key}"))];
            if provider == ProviderId::OpenRouter {
                headers.push(("HTTP-Referer", OPENROUTER_REFERER.to_string()));
                headers.push(("X-Title", OPENROUTER_TITLE.to_string()));
            }
            let body = to_body(&OpenAiRequest {
                model,
                messages: to_wire_messages(messages),
                temperature: params.temperature,
                max_tokens: params.max_output_tokens,
            });
            (headers, body)
        }
        WireFamily::Anthropic => {
            let headers = vec![
                ("x-api-key", api_key.to_string()),
                ("anthropic-version", ANTHROPIC_VERSION.to_string()),
            ];
            // Anthropic takes the system instruction as a dedicated field,
            // not as a history entry.
            let system = match messages.first() {
                Some(m) if m.role == Role::System => Some(m.content.clone()),
                _ => None,
            };
            let rest: Vec<&Message> = messages
                .iter()
                .filter(|m| m.role != Role::System)
                .collect();
            let body = to_body(&AnthropicRequest {
                model,
                messages: rest
                    .iter()
                    .map(|m| WireMessage {
                        role: m.role.as_str().to_string(),
                        content: m.content.clone(),
                    })
                    .collect(),
                system,
                max_tokens: params.max_output_tokens,
                temperature: params.temperature,
            });
            (headers, body)
        }
    };

    WireRequest {
        url: endpoint(provider).to_string(),
        headers,
        body,
    }
}

/// Pull the reply text out of a success payload. A missing field is a typed
/// `MalformedResponse`, never a silently empty string.
pub fn extract_reply(provider: ProviderId, body: &Value) -> Result<String, ChatError> {
    match family(provider) {
        WireFamily::OpenAiCompatible => {
            let parsed: OpenAiResponse = serde_json::from_value(body.clone())
                .map_err(|e| ChatError::MalformedResponse(e.to_string()))?;
            parsed
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message)
                .and_then(|message| message.content)
                .ok_or_else(|| {
                    ChatError::MalformedResponse(
                        "missing choices[0].message.content".to_string(),
                    )
                })
        }
        WireFamily::Anthropic => {
            let parsed: AnthropicResponse = serde_json::from_value(body.clone())
                .map_err(|e| ChatError::MalformedResponse(e.to_string()))?;
            parsed
                .content
                .into_iter()
                .find_map(|block| match block {
                    AnthropicBlock::Text { text } => Some(text),
                    AnthropicBlock::Other => None,
                })
                .ok_or_else(|| {
                    ChatError::MalformedResponse("missing content[0].text".to_string())
                })
        }
    }
}

/// Render a non-success response into a message, preferring the provider's
/// own `error.message` when the body carries one.
pub fn parse_error_message(status: u16, body: &Value) -> String {
    if let Ok(envelope) = serde_json::from_value::<ErrorEnvelope>(body.clone()) {
        return format!("HTTP {}: {}", status, envelope.error.message);
    }
    format!("HTTP {}: Request failed", status)
}
