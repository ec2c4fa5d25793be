mod adapter;
mod transport;
mod types;
mod wire;

pub use adapter::{build_request, extract_reply, wire_model};
pub use transport::{ChatTransport, HttpTransport};
pub use types::{ChatError, WireRequest, WireResponse};

use crate::models::{ChatParameters, Message, ProviderId};

/// One full provider round trip: build the wire request, execute it,
/// normalize the failure modes, extract the reply text.
pub async fn complete(
    transport: &dyn ChatTransport,
    provider: ProviderId,
    api_key: &str,
    messages: &[Message],
    params: &ChatParameters,
) -> Result<String, ChatError> {
    let request = build_request(provider, api_key, messages, params);
    tracing::debug!(
        provider = provider.as_str(),
        model = %params.model,
        messages = messages.len(),
        "dispatching chat request"
    );

    let response = transport.execute(request).await?;

    if !response.is_success() {
        return Err(ChatError::Provider {
            status: response.status,
            message: adapter::parse_error_message(response.status, &response.body),
        });
    }

    extract_reply(provider, &response.body)
}
