//! Per-request pipeline orchestration
//!
//! Sequences ingest → transcribe → augment → generate → synthesize for one
//! request and assembles the final result. Stages run sequentially; only the
//! augmentation sub-lookups overlap. A request either completes with both
//! text and audio or fails with exactly one stage-tagged error.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::audio::{self, HandoffStore};
use crate::chat::{ChatClient, ConversationTurn, ReplyText};
use crate::context::{Augmenter, LocationHint};
use crate::voice::{SpeechSynthesizer, SynthesizedAudio, Transcriber, Transcript};
use crate::{Error, Result};

/// Transcription seam, faked in tests.
///
/// Implementations read the audio back from the staged handoff file.
#[async_trait]
pub trait Transcribe: Send + Sync {
    async fn transcribe(&self, staged: &HandoffStore, language: Option<&str>)
    -> Result<Transcript>;
}

/// Reply generation seam, faked in tests
#[async_trait]
pub trait Generate: Send + Sync {
    async fn generate(&self, turn: &ConversationTurn) -> Result<ReplyText>;
}

/// Speech synthesis seam, faked in tests
#[async_trait]
pub trait Synthesize: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio>;
}

#[async_trait]
impl Transcribe for Transcriber {
    async fn transcribe(
        &self,
        staged: &HandoffStore,
        language: Option<&str>,
    ) -> Result<Transcript> {
        Self::transcribe(self, staged, language).await
    }
}

#[async_trait]
impl Generate for ChatClient {
    async fn generate(&self, turn: &ConversationTurn) -> Result<ReplyText> {
        Self::generate(self, turn).await
    }
}

#[async_trait]
impl Synthesize for SpeechSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio> {
        Self::synthesize(self, text).await
    }
}

/// The stage a failure originated from.
///
/// Augmentation has no variant: its lookups degrade to sentinels and can
/// never fail the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingest,
    Transcribe,
    Generate,
    Synthesize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ingest => write!(f, "ingest"),
            Self::Transcribe => write!(f, "transcribe"),
            Self::Generate => write!(f, "generate"),
            Self::Synthesize => write!(f, "synthesize"),
        }
    }
}

/// Outcome of one pipeline invocation: success with both text and audio, or
/// a single stage-tagged error. Never both, never neither.
#[derive(Debug)]
pub enum PipelineResult {
    Completed {
        text: String,
        audio: SynthesizedAudio,
    },
    Failed {
        stage: Stage,
        error: Error,
    },
}

/// An inbound audio request, as handed over by the transport layer
#[derive(Debug)]
pub struct AudioRequest {
    pub bytes: Vec<u8>,
    /// Declared MIME type or extension, if the transport knows it
    pub declared_format: Option<String>,
    /// Original upload filename
    pub filename_hint: Option<String>,
    pub location: Option<LocationHint>,
}

/// Orchestrates the five stages for one request.
///
/// Holds only read-only collaborators; invocations are independent and a
/// re-run with the same input produces a fresh result.
pub struct Pipeline {
    transcriber: Arc<dyn Transcribe>,
    augmenter: Augmenter,
    generator: Arc<dyn Generate>,
    synthesizer: Arc<dyn Synthesize>,
    system_prompt: String,
    language: Option<String>,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        transcriber: Arc<dyn Transcribe>,
        augmenter: Augmenter,
        generator: Arc<dyn Generate>,
        synthesizer: Arc<dyn Synthesize>,
        system_prompt: String,
        language: Option<String>,
    ) -> Self {
        Self {
            transcriber,
            augmenter,
            generator,
            synthesizer,
            system_prompt,
            language,
        }
    }

    /// Run the full pipeline on an audio request
    pub async fn run(&self, request: AudioRequest) -> PipelineResult {
        let payload = match audio::ingest(
            request.bytes,
            request.declared_format.as_deref(),
            request.filename_hint.as_deref(),
        ) {
            Ok(payload) => payload,
            Err(error) => return Self::fail(Stage::Ingest, error),
        };

        // Staged handoff lives exactly as long as the transcription stage;
        // the temp file is removed on success, failure, and abort alike.
        // Once staging succeeds the disk copy is the only one the
        // transcriber sees, so the in-memory payload can go.
        let staged = match HandoffStore::stage(&payload) {
            Ok(staged) => staged,
            Err(error) => return Self::fail(Stage::Ingest, error),
        };
        drop(payload);

        let transcript = {
            let result = self.transcribe_with_retry(&staged).await;
            drop(staged);
            match result {
                Ok(transcript) => transcript,
                Err(error) => return Self::fail(Stage::Transcribe, error),
            }
        };

        self.answer(&transcript, request.location.as_ref()).await
    }

    /// Run the text variant, skipping ingest and transcription
    pub async fn run_text(&self, message: &str, location: Option<LocationHint>) -> PipelineResult {
        let transcript = Transcript {
            text: message.to_string(),
            language: self.language.clone(),
        };
        self.answer(&transcript, location.as_ref()).await
    }

    /// Augment, generate, and synthesize: the shared tail of both variants
    async fn answer(
        &self,
        transcript: &Transcript,
        location: Option<&LocationHint>,
    ) -> PipelineResult {
        // Sub-lookup failures are absorbed into sentinels; this stage
        // cannot fail the request.
        let context = self.augmenter.augment(transcript, location).await;
        tracing::debug!(
            snippets = context.snippets.len(),
            available = context.available().count(),
            "context augmented"
        );

        let turn = ConversationTurn::compose(&self.system_prompt, transcript, &context);

        let reply = match self.generator.generate(&turn).await {
            Ok(reply) => reply,
            Err(error) => return Self::fail(Stage::Generate, error),
        };

        // The product contract promises both text and audio; a synthesis
        // failure is terminal even though the text answer exists.
        match self.synthesizer.synthesize(&reply.0).await {
            Ok(audio) => {
                tracing::info!(
                    reply_chars = reply.0.len(),
                    audio_bytes = audio.bytes.len(),
                    "pipeline completed"
                );
                PipelineResult::Completed {
                    text: reply.0,
                    audio,
                }
            }
            Err(error) => {
                // Normalize: every synthesis failure surfaces as Synthesis
                let error = match error {
                    already @ Error::Synthesis(_) => already,
                    other => Error::Synthesis(other.to_string()),
                };
                Self::fail(Stage::Synthesize, error)
            }
        }
    }

    /// One transcription attempt plus a single retry on transient failure.
    /// Auth, rate-limit, and format errors propagate immediately.
    async fn transcribe_with_retry(&self, staged: &HandoffStore) -> Result<Transcript> {
        let language = self.language.as_deref();
        match self.transcriber.transcribe(staged, language).await {
            Err(error) if error.is_transient() => {
                tracing::warn!(error = %error, "transcription failed, retrying once");
                self.transcriber.transcribe(staged, language).await
            }
            result => result,
        }
    }

    fn fail(stage: Stage, error: Error) -> PipelineResult {
        tracing::error!(stage = %stage, error = %error, "pipeline failed");
        PipelineResult::Failed { stage, error }
    }
}
