use serde::{Deserialize, Serialize};

/// Routing prefix that aggregator model identifiers carry, e.g.
/// `openrouter/anthropic/claude-3-opus`. Stripped before transmission.
pub const OPENROUTER_PREFIX: &str = "openrouter/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenAi,
    Anthropic,
    Mistral,
    OpenRouter,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "openai",
            ProviderId::Anthropic => "anthropic",
            ProviderId::Mistral => "mistral",
            ProviderId::OpenRouter => "openrouter",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "OpenAI",
            ProviderId::Anthropic => "Anthropic",
            ProviderId::Mistral => "Mistral",
            ProviderId::OpenRouter => "OpenRouter",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "openai" => Some(ProviderId::OpenAi),
            "anthropic" => Some(ProviderId::Anthropic),
            "mistral" => Some(ProviderId::Mistral),
            "openrouter" => Some(ProviderId::OpenRouter),
            _ => None,
        }
    }

    /// Map a model identifier to its provider by prefix. Deterministic and
    /// purely local; `None` means the caller must fail fast with
    /// `UnsupportedProvider` before any network call.
    pub fn resolve(model: &str) -> Option<Self> {
        let model = model.trim();
        if model.starts_with(OPENROUTER_PREFIX) {
            return Some(ProviderId::OpenRouter);
        }
        if model.starts_with("gpt-")
            || model.starts_with("chatgpt")
            || model.starts_with("o1")
            || model.starts_with("o3")
            || model.starts_with("o4")
        {
            return Some(ProviderId::OpenAi);
        }
        if model.starts_with("claude") {
            return Some(ProviderId::Anthropic);
        }
        if model.starts_with("mistral")
            || model.starts_with("mixtral")
            || model.starts_with("ministral")
            || model.starts_with("codestral")
        {
            return Some(ProviderId::Mistral);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_prefixes() {
        assert_eq!(ProviderId::resolve("gpt-4"), Some(ProviderId::OpenAi));
        assert_eq!(ProviderId::resolve("o3-mini"), Some(ProviderId::OpenAi));
        assert_eq!(
            ProviderId::resolve("claude-3-opus"),
            Some(ProviderId::Anthropic)
        );
        assert_eq!(
            ProviderId::resolve("mistral-large-latest"),
            Some(ProviderId::Mistral)
        );
        assert_eq!(
            ProviderId::resolve("mixtral-8x7b"),
            Some(ProviderId::Mistral)
        );
        assert_eq!(
            ProviderId::resolve("openrouter/meta-llama/llama-3-70b"),
            Some(ProviderId::OpenRouter)
        );
    }

    #[test]
    fn unknown_model_resolves_to_none() {
        assert_eq!(ProviderId::resolve("llama-3-70b"), None);
        assert_eq!(ProviderId::resolve(""), None);
    }

    #[test]
    fn resolve_is_deterministic() {
        for model in ["gpt-4", "claude-3-opus", "mistral-small", "unknown-1"] {
            assert_eq!(ProviderId::resolve(model), ProviderId::resolve(model));
        }
    }
}
