use midas_config::LlmSettings;
use midas_models::MidasError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{instrument, warn};

/// Per-call hints that shape the prompt without changing the contract
/// (spec §4.7/§4.9: `{format: markdown, source: ...}`).
#[derive(Debug, Clone, Copy)]
pub struct SummarizeHints {
    pub format: &'static str,
    pub source: &'static str,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

const MAX_TRANSPORT_RETRIES: u32 = 2;

/// Talks to an OpenAI-compatible chat-completion endpoint (C6).
pub struct LlmSummarizer {
    client: reqwest::Client,
    settings: LlmSettings,
}

impl LlmSummarizer {
    pub fn new(client: reqwest::Client, settings: LlmSettings) -> Self {
        Self { client, settings }
    }

    pub fn enabled(&self) -> bool {
        self.settings.enabled
    }

    #[instrument(skip(self, text), fields(source = hints.source, chars = text.len()))]
    pub async fn summarize(&self, text: &str, hints: SummarizeHints) -> Result<String, MidasError> {
        if !self.settings.enabled {
            return Err(MidasError::internal("LLM summarizer is disabled"));
        }

        let request = ChatRequest {
            model: self.settings.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: build_prompt(text, hints),
            }],
        };

        let url = format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'));
        let timeout = Duration::from_secs(self.settings.timeout_seconds);

        let mut attempt = 0;
        loop {
            let result = self
                .client
                .post(&url)
                .bearer_auth(&self.settings.api_key)
                .timeout(timeout)
                .json(&request)
                .send()
                .await;

            match result {
                Ok(response) => return self.handle_response(response).await,
                Err(e) => {
                    if attempt >= MAX_TRANSPORT_RETRIES {
                        return Err(MidasError::upstream(format!(
                            "LLM transport failure after {attempt} retries: {e}"
                        )));
                    }
                    let backoff = Duration::from_millis(200 * 2u64.pow(attempt));
                    warn!(attempt, error = %e, "retrying LLM call after transport error");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn handle_response(&self, response: reqwest::Response) -> Result<String, MidasError> {
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(MidasError::auth_expired("LLM endpoint rejected credentials"));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30);
            return Err(MidasError::rate_limited("LLM endpoint rate-limited the request", retry_after));
        }

        if status.is_server_error() {
            return Err(MidasError::upstream(format!(
                "LLM endpoint returned server error {status}"
            )));
        }

        if !status.is_success() {
            return Err(MidasError::upstream(format!("LLM endpoint returned {status}")));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| MidasError::upstream(format!("LLM response was not valid JSON: {e}")))?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| MidasError::upstream("LLM response contained no choices".to_string()))
    }
}

fn build_prompt(text: &str, hints: SummarizeHints) -> String {
    format!(
        "Summarize the following {source} content as {format}. Be faithful to the source and concise.\n\n{text}",
        source = hints.source,
        format = hints.format,
    )
}
