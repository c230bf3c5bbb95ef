//! Response generation: prompt composition and the chat-completions client
//!
//! One system message plus one composite user message per request. The
//! system carries the assistant persona; the user message is the transcript
//! followed by the available context snippets, each prefixed by its source
//! kind. There is no cross-request conversation memory.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::context::AugmentedContext;
use crate::voice::Transcript;
use crate::{Error, Result};

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Default assistant persona
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful voice assistant. \
Answer concisely in a natural, spoken style. Lines prefixed with `search:` \
or `weather:` are live context gathered for this question; use them when \
relevant and ignore them otherwise.";

/// A role-tagged message on the wire
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

/// The single exchange sent to the chat model, built fresh per request
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub system: String,
    pub user: String,
}

impl ConversationTurn {
    /// Compose the turn from a transcript and its augmented context.
    ///
    /// Sentinel (unavailable) snippets are excluded; available ones appear
    /// after the transcript, one per line, prefixed by source kind.
    #[must_use]
    pub fn compose(system_prompt: &str, transcript: &Transcript, context: &AugmentedContext) -> Self {
        let mut user = transcript.text.clone();
        for (kind, text) in context.available() {
            user.push_str("\n\n");
            user.push_str(&format!("{kind}: {text}"));
        }

        Self {
            system: system_prompt.to_string(),
            user,
        }
    }

    /// Wire-format messages
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage {
                role: "system",
                content: self.system.clone(),
            },
            ChatMessage {
                role: "user",
                content: self.user.clone(),
            },
        ]
    }
}

/// The model's answer for one request
#[derive(Debug, Clone)]
pub struct ReplyText(pub String);

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

/// Chat-completions client
pub struct ChatClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl ChatClient {
    /// Create a new chat client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("OpenAI API key required for chat".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()?,
            api_key,
            model,
        })
    }

    /// Obtain the full reply for one conversation turn, non-streaming.
    ///
    /// # Errors
    ///
    /// Same upstream taxonomy as transcription: `UpstreamAuth`,
    /// `UpstreamRateLimited`, `UpstreamUnavailable`.
    pub async fn generate(&self, turn: &ConversationTurn) -> Result<ReplyText> {
        let messages = turn.messages();
        let request = CompletionRequest {
            model: &self.model,
            messages: &messages,
        };

        tracing::debug!(model = %self.model, "requesting chat completion");

        let response = self
            .client
            .post(COMPLETIONS_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "chat request failed");
                Error::upstream_request("chat", &e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "chat API error");
            return Err(Error::from_upstream("chat", status, &body));
        }

        let result: CompletionResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse chat response");
            Error::UpstreamUnavailable(format!("chat returned malformed body: {e}"))
        })?;

        let reply = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        tracing::info!(reply = %reply, "chat completion received");
        Ok(ReplyText(reply))
    }
}
