//! Speech-to-text (STT) processing

use std::time::Duration;

use crate::audio::HandoffStore;
use crate::{Error, Result};

const TRANSCRIPTION_URL: &str = "https://api.openai.com/v1/audio/transcriptions";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Response from the Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// A transcription result.
///
/// Empty text is valid: a silent clip transcribes to "".
#[derive(Debug, Clone)]
pub struct Transcript {
    pub text: String,
    pub language: Option<String>,
}

/// Transcribes speech to text via `OpenAI` Whisper
pub struct Transcriber {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl Transcriber {
    /// Create a new transcriber
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for Whisper".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()?,
            api_key,
            model,
        })
    }

    /// Transcribe staged audio to text, streaming the file from disk
    ///
    /// # Errors
    ///
    /// `UpstreamAuth` on credential rejection, `UpstreamRateLimited` on
    /// throttling, `UpstreamUnavailable` on network or service failure,
    /// `Io` when the staged file cannot be read back.
    pub async fn transcribe(
        &self,
        staged: &HandoffStore,
        language: Option<&str>,
    ) -> Result<Transcript> {
        let file = tokio::fs::File::open(staged.path()).await?;
        let audio_bytes = file.metadata().await?.len();

        tracing::debug!(
            audio_bytes,
            format = ?staged.format(),
            "starting Whisper transcription"
        );

        let mut form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::stream_with_length(reqwest::Body::from(file), audio_bytes)
                    .file_name(staged.upload_name().to_string())
                    .mime_str(staged.format().mime())
                    .map_err(|e| Error::UnsupportedFormat(e.to_string()))?,
            )
            .text("model", self.model.clone());

        if let Some(lang) = language {
            form = form.text("language", lang.to_string());
        }

        let response = self
            .client
            .post(TRANSCRIPTION_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Whisper request failed");
                Error::upstream_request("whisper", &e)
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::from_upstream("whisper", status, &body));
        }

        let result: WhisperResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse Whisper response");
            Error::UpstreamUnavailable(format!("whisper returned malformed body: {e}"))
        })?;

        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(Transcript {
            text: result.text,
            language: language.map(ToString::to_string),
        })
    }
}
