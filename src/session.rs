use std::sync::Arc;

use crate::context;
use crate::models::{ChatParameters, Conversation, GlobalSettings, Message, ProviderId, Role};
use crate::providers::{self, ChatError, ChatTransport};
use crate::services::{truncate_title, ConversationStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingResponse,
    ErrorDisplayed,
}

/// Orchestrates one conversation: accepts user messages, trims the replayed
/// context, invokes the provider adapter, updates in-memory state and
/// triggers persistence. Only one send may be outstanding at a time,
/// enforced by the `AwaitingResponse` guard rather than a lock.
pub struct ConversationSession {
    conversation: Conversation,
    state: SessionState,
    settings: GlobalSettings,
    transport: Arc<dyn ChatTransport>,
    store: ConversationStore,
}

impl ConversationSession {
    pub fn new(
        conversation: Conversation,
        settings: GlobalSettings,
        transport: Arc<dyn ChatTransport>,
        store: ConversationStore,
    ) -> Self {
        Self {
            conversation,
            state: SessionState::Idle,
            settings,
            transport,
            store,
        }
    }

    /// Fresh conversation from the stored chat defaults; an empty template
    /// model falls back to the global default model.
    pub fn start(
        mut defaults: ChatParameters,
        settings: GlobalSettings,
        transport: Arc<dyn ChatTransport>,
        store: ConversationStore,
    ) -> Self {
        if defaults.model.is_empty() {
            defaults.model = settings.default_model.clone();
        }
        Self::new(Conversation::new(defaults), settings, transport, store)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Settings are threaded in as an explicit context value; the owner
    /// wires this to the SettingsStore subscription instead of re-reading
    /// the store ad hoc.
    pub fn apply_settings(&mut self, settings: GlobalSettings) {
        self.settings = settings;
    }

    /// Drive one exchange. `Ok(None)` is a rejection no-op (blank text, or
    /// a send already outstanding). On success the user message and reply
    /// are appended and the conversation persisted (unless history saving
    /// is off). On failure the user message remains appended, no assistant
    /// message is added, and the session shows the error; the next send
    /// proceeds normally.
    pub async fn send(&mut self, text: &str) -> Result<Option<String>, ChatError> {
        if self.state == SessionState::AwaitingResponse || text.trim().is_empty() {
            return Ok(None);
        }

        match self.exchange(text).await {
            Ok(reply) => {
                self.conversation.messages.push(Message::assistant(&reply));
                self.conversation.touch();
                if self.conversation.has_default_title() {
                    self.conversation.title = truncate_title(text);
                }
                self.state = SessionState::Idle;
                self.persist().await;
                Ok(Some(reply))
            }
            Err(err) => {
                self.state = SessionState::ErrorDisplayed;
                Err(err)
            }
        }
    }

    async fn exchange(&mut self, text: &str) -> Result<String, ChatError> {
        let params = self.conversation.parameters.clone();

        // Fail-fast checks run before the user message is appended, so a
        // missing credential leaves the conversation untouched.
        let provider = ProviderId::resolve(&params.model)
            .ok_or_else(|| ChatError::UnsupportedProvider(params.model.clone()))?;
        let api_key = self
            .settings
            .credential_for(provider)
            .ok_or(ChatError::MissingCredential(provider))?
            .to_string();

        // The window limit applies to the prior history; the new user
        // message rides on top of the trimmed context.
        let mut outgoing =
            context::trim(&self.conversation.messages, self.settings.context_window_limit);
        if !params.system_prompt.is_empty()
            && outgoing.first().map(|m| m.role) != Some(Role::System)
        {
            outgoing.insert(0, Message::system(&params.system_prompt));
        }

        let user_message = Message::user(text);
        outgoing.push(user_message.clone());
        self.conversation.messages.push(user_message);
        self.conversation.touch();
        self.state = SessionState::AwaitingResponse;

        providers::complete(self.transport.as_ref(), provider, &api_key, &outgoing, &params).await
    }

    async fn persist(&self) {
        if !self.settings.save_history {
            return;
        }
        if let Err(e) = self
            .store
            .upsert(&self.conversation, self.settings.max_stored_conversations)
            .await
        {
            // The exchange itself succeeded; a persistence failure is
            // logged, not surfaced as a session error.
            tracing::error!("failed to persist conversation: {e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::models::DEFAULT_TITLE;
    use crate::providers::{WireRequest, WireResponse};
    use crate::services::Storage;

    /// Scripted transport: pops pre-queued responses and records every
    /// request it saw.
    struct MockTransport {
        responses: Mutex<VecDeque<Result<WireResponse, ChatError>>>,
        requests: Mutex<Vec<WireRequest>>,
    }

    impl MockTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(VecDeque::new()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn push_reply(&self, text: &str) {
            self.push_response(Ok(WireResponse {
                status: 200,
                body: json!({"choices": [{"message": {"role": "assistant", "content": text}}]}),
            }));
        }

        fn push_response(&self, response: Result<WireResponse, ChatError>) {
            self.responses.lock().unwrap().push_back(response);
        }

        fn requests(&self) -> Vec<WireRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatTransport for MockTransport {
        async fn execute(&self, request: WireRequest) -> Result<WireResponse, ChatError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ChatError::Transport("no scripted response".into())))
        }
    }

    fn settings_with_key(provider: &str) -> GlobalSettings {
        let mut settings = GlobalSettings::default();
        settings
            .credentials
            .insert(provider.to_string(), "sk-test".to_string());
        settings
    }

    fn session(
        model: &str,
        settings: GlobalSettings,
        transport: Arc<MockTransport>,
    ) -> (ConversationSession, ConversationStore) {
        let store = ConversationStore::new(Storage::open_in_memory().unwrap());
        let conversation = Conversation::new(ChatParameters::for_model(model));
        (
            ConversationSession::new(conversation, settings, transport, store.clone()),
            store,
        )
    }

    #[tokio::test]
    async fn successful_exchange_appends_persists_and_titles() {
        let transport = MockTransport::new();
        transport.push_reply("hello there");
        let (mut session, store) =
            session("gpt-4", settings_with_key("openai"), transport.clone());

        let reply = session.send("hi").await.unwrap();
        assert_eq!(reply.as_deref(), Some("hello there"));
        assert_eq!(session.state(), SessionState::Idle);

        let messages = &session.conversation().messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], Message::user("hi"));
        assert_eq!(messages[1], Message::assistant("hello there"));
        assert_eq!(session.conversation().title, "hi");

        let persisted = store.list().await.unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].id, session.conversation().id);
    }

    #[tokio::test]
    async fn blank_text_is_a_noop() {
        let transport = MockTransport::new();
        let (mut session, _) = session("gpt-4", settings_with_key("openai"), transport.clone());

        assert_eq!(session.send("   ").await.unwrap(), None);
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.conversation().messages.is_empty());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn missing_credential_fails_before_append() {
        let transport = MockTransport::new();
        let (mut session, _) = session("gpt-4", GlobalSettings::default(), transport.clone());

        let err = session.send("hi").await.unwrap_err();
        assert!(matches!(
            err,
            ChatError::MissingCredential(ProviderId::OpenAi)
        ));
        assert!(session.conversation().messages.is_empty());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn unknown_model_fails_fast() {
        let transport = MockTransport::new();
        let (mut session, _) =
            session("llama-3-70b", settings_with_key("openai"), transport.clone());

        let err = session.send("hi").await.unwrap_err();
        assert!(matches!(err, ChatError::UnsupportedProvider(_)));
        assert!(session.conversation().messages.is_empty());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn provider_error_keeps_user_message_and_displays_error() {
        let transport = MockTransport::new();
        transport.push_response(Ok(WireResponse {
            status: 429,
            body: json!({"error": {"message": "rate_limit"}}),
        }));
        let (mut session, store) =
            session("claude-3-opus", settings_with_key("anthropic"), transport);

        let err = session.send("hi").await.unwrap_err();
        match err {
            ChatError::Provider { status, message } => {
                assert_eq!(status, 429);
                assert!(message.contains("rate_limit"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(session.state(), SessionState::ErrorDisplayed);
        let messages = &session.conversation().messages;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0], Message::user("hi"));
        // Failed exchanges are not persisted.
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn error_state_is_not_sticky() {
        let transport = MockTransport::new();
        transport.push_response(Err(ChatError::Transport("connection refused".into())));
        transport.push_reply("recovered");
        let (mut session, _) = session("gpt-4", settings_with_key("openai"), transport);

        assert!(session.send("first").await.is_err());
        assert_eq!(session.state(), SessionState::ErrorDisplayed);

        let reply = session.send("second").await.unwrap();
        assert_eq!(reply.as_deref(), Some("recovered"));
        assert_eq!(session.state(), SessionState::Idle);
        // first (failed), second, and the reply.
        assert_eq!(session.conversation().messages.len(), 3);
    }

    #[tokio::test]
    async fn window_limit_bounds_replayed_history() {
        let transport = MockTransport::new();
        transport.push_reply("ok");

        let mut settings = settings_with_key("openai");
        settings.context_window_limit = 2;

        let mut parameters = ChatParameters::for_model("gpt-4");
        parameters.system_prompt = "be brief".to_string();
        let mut conversation = Conversation::new(parameters);
        for i in 0..6 {
            conversation.messages.push(if i % 2 == 0 {
                Message::user(format!("u{i}"))
            } else {
                Message::assistant(format!("a{i}"))
            });
        }

        let store = ConversationStore::new(Storage::open_in_memory().unwrap());
        let mut session =
            ConversationSession::new(conversation, settings, transport.clone(), store);

        session.send("new question").await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let sent = requests[0].body["messages"].as_array().unwrap();
        // System + last 2 history entries + the new user message.
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[0]["role"], "system");
        assert_eq!(sent[1]["content"], "u4");
        assert_eq!(sent[2]["content"], "a5");
        assert_eq!(sent[3]["content"], "new question");
    }

    #[tokio::test]
    async fn save_history_off_skips_persistence() {
        let transport = MockTransport::new();
        transport.push_reply("ok");

        let mut settings = settings_with_key("openai");
        settings.save_history = false;
        let (mut session, store) = session("gpt-4", settings, transport);

        session.send("hi").await.unwrap();
        // In-memory state still updates.
        assert_eq!(session.conversation().messages.len(), 2);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn title_derivation_happens_once() {
        let transport = MockTransport::new();
        transport.push_reply("one");
        transport.push_reply("two");
        let (mut session, _) = session("gpt-4", settings_with_key("openai"), transport);

        assert_eq!(session.conversation().title, DEFAULT_TITLE);
        session.send("first question").await.unwrap();
        assert_eq!(session.conversation().title, "first question");

        session.send("second question").await.unwrap();
        // The automatic rename is one-time.
        assert_eq!(session.conversation().title, "first question");
    }
}
