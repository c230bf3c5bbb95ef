//! Text-to-speech (TTS) processing

use std::time::Duration;

use crate::{Error, Result};

const SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Synthesized speech, raw bytes plus the encoding used.
///
/// Base64 encoding happens only at the response boundary, never here.
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub bytes: Vec<u8>,
    /// Container of `bytes` ("mp3")
    pub format: &'static str,
    /// Voice identity used to render the text
    pub voice: String,
}

/// Synthesizes speech from text via the `OpenAI` speech API
pub struct SpeechSynthesizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    voice: String,
}

impl SpeechSynthesizer {
    /// Create a new synthesizer with a fixed voice profile
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(api_key: String, model: String, voice: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()?,
            api_key,
            model,
            voice,
        })
    }

    /// Synthesize text to speech.
    ///
    /// The full audio stream is obtained before returning; there is no
    /// partial or streaming output.
    ///
    /// # Errors
    ///
    /// `Error::Synthesis` on any failure. Synthesis failure is terminal for
    /// the request, never degraded.
    pub async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio> {
        #[derive(serde::Serialize)]
        struct SpeechRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
        }

        tracing::debug!(chars = text.len(), voice = %self.voice, "starting synthesis");

        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
        };

        let response = self
            .client
            .post(SPEECH_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "TTS request failed");
                Error::Synthesis(format!("speech request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "TTS API error");
            return Err(Error::Synthesis(format!("speech API error {status}: {body}")));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| Error::Synthesis(format!("speech body read failed: {e}")))?;

        tracing::info!(audio_bytes = audio.len(), "synthesis complete");
        Ok(SynthesizedAudio {
            bytes: audio.to_vec(),
            format: "mp3",
            voice: self.voice.clone(),
        })
    }
}
