//! Transcript reformatting through an OpenAI-compatible chat-completion API.
//!
//! This is an external collaborator: the core only depends on the
//! request/response shape, not on what the model does with the text.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::FormattingConfig;
use crate::Result;

/// Groq's OpenAI-compatible endpoint, the collaborator used by default.
pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";

pub const DEFAULT_MODEL: &str = "llama3-70b-8192";

pub const DEFAULT_INSTRUCTIONS: &str = "Format this YouTube transcript into a \
well-structured, readable format. Correct any obvious transcription errors.";

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that formats YouTube video transcripts.";

const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 4000;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

fn build_request<'a>(model: &'a str, instructions: &str, transcript: &str) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user",
                content: format!("{instructions}\n\nHere is the transcript:\n{transcript}"),
            },
        ],
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
    }
}

/// Sends raw transcript text plus free-form instructions to the completion
/// API and returns the reformatted text.
pub struct TranscriptFormatter {
    client: Client,
    api_base: String,
    default_model: String,
}

impl TranscriptFormatter {
    pub fn new(client: Client, config: &FormattingConfig) -> Self {
        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            default_model: config.model.clone(),
        }
    }

    pub async fn format(
        &self,
        transcript: &str,
        api_key: &str,
        instructions: &str,
        model: Option<&str>,
    ) -> Result<String> {
        let model = model.unwrap_or(&self.default_model);
        tracing::debug!(model, "requesting transcript reformat");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(api_key)
            .json(&build_request(model, instructions, transcript))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<ApiErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error)
                .map(|err| err.message)
                .unwrap_or_else(|| format!("API request failed with status {status}"));
            anyhow::bail!(message);
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow::anyhow!("completion response contained no choices"))?;

        Ok(content.trim().to_string())
    }
}
