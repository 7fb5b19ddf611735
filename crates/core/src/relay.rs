use crate::error::UpstreamError;
use crate::wire::{ChatReply, ChatRequest, ErrorBody};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;

// The `ChatRelay` trait is the only way the session talks to the tutor backend.
// `TutorSession` depends on this abstraction, so tests can swap in
// `MockChatRelay` (generated by mockall) or a hand-written fake that controls
// when a reply resolves.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait ChatRelay: Send + Sync {
    /// Sends one learner message and returns the tutor's reply text.
    async fn send_turn(&self, request: &ChatRequest) -> Result<String, UpstreamError>;
}

/// Talks to the relay server over HTTP.
pub struct RelayClient {
    client: Client,
    endpoint: String,
}

impl RelayClient {
    /// `base_url` is the server origin, e.g. `http://localhost:5000`.
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatRelay for RelayClient {
    async fn send_turn(&self, request: &ChatRequest) -> Result<String, UpstreamError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            // The server answers `{ "error": ... }`; anything else is passed through verbatim.
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            tracing::warn!(status = status.as_u16(), "Tutor endpoint rejected turn: {message}");
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let reply = resp
            .json::<ChatReply>()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;
        Ok(reply.message)
    }
}
