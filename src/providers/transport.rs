use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::types::{ChatError, WireRequest, WireResponse};

/// Seam between the adapter and the network, so tests can script responses
/// without a server.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn execute(&self, request: WireRequest) -> Result<WireResponse, ChatError>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn execute(&self, request: WireRequest) -> Result<WireResponse, ChatError> {
        let mut builder = self.client.post(&request.url).json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        // A non-JSON body is not fatal here: error rendering falls back to a
        // generic message and reply extraction reports MalformedResponse.
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);

        Ok(WireResponse { status, body })
    }
}
