use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tutor_core::wire::ChatRequest;

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: Message,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub content: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("OpenAI API error: {status} - {body}")]
    Status { status: u16, body: String },
    #[error("OpenAI request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("OpenAI response contained no choices")]
    EmptyResponse,
}

// `Completions` is the seam between the HTTP routes and the language-model
// provider. Routes only see this trait, so tests drive them with
// `MockCompletions` instead of a live API key.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait Completions: Send + Sync {
    /// Produces the tutor's reply to one learner message.
    async fn tutor_reply(&self, request: &ChatRequest) -> Result<String, CompletionError>;
}

/// The system prompt that frames the model as a tutor for this learner.
pub fn tutor_prompt(request: &ChatRequest) -> String {
    format!(
        "You are a helpful language tutor. The student's native language is {} and they are learning {} at a {} level. Keep responses appropriate for their level.",
        request.native_language, request.target_language, request.difficulty
    )
}

pub struct OpenAiCompletions {
    client: Client,
    api_key: SecretString,
    model: String,
    endpoint: String,
}

impl OpenAiCompletions {
    pub fn new(api_key: SecretString, model: String, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl Completions for OpenAiCompletions {
    async fn tutor_reply(&self, request: &ChatRequest) -> Result<String, CompletionError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": tutor_prompt(request) },
                { "role": "user", "content": request.message }
            ]
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let resp = resp.json::<LlmResponse>().await?;
        tracing::debug!(choices = resp.choices.len(), "OpenAI response received");

        resp.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(CompletionError::EmptyResponse)
    }
}
