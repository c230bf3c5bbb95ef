//! Shared test utilities: fake collaborators for the pipeline seams

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use parley_gateway::audio::HandoffStore;
use parley_gateway::chat::{ConversationTurn, ReplyText};
use parley_gateway::context::{
    Augmenter, Coordinates, SearchLookup, SearchResult, WeatherLookup,
};
use parley_gateway::pipeline::{Generate, Pipeline, Synthesize, Transcribe};
use parley_gateway::voice::{SynthesizedAudio, Transcript};
use parley_gateway::{Error, Result};

/// Minimal valid WAV header for ingest tests
#[must_use]
pub fn wav_bytes() -> Vec<u8> {
    let mut bytes = b"RIFF".to_vec();
    bytes.extend_from_slice(&36u32.to_le_bytes());
    bytes.extend_from_slice(b"WAVEfmt ");
    bytes
}

type ErrorFactory = fn() -> Error;

/// Fake transcriber with scripted failures and a call counter.
///
/// Reads the staged handoff file like the real one and records its path
/// and content so tests can check the handoff and its cleanup.
pub struct FakeTranscriber {
    pub text: String,
    pub calls: AtomicUsize,
    pub staged: Mutex<Option<(PathBuf, Vec<u8>)>>,
    fail_first: Option<ErrorFactory>,
    fail_always: Option<ErrorFactory>,
}

impl FakeTranscriber {
    #[must_use]
    pub fn ok(text: &str) -> Self {
        Self {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
            staged: Mutex::new(None),
            fail_first: None,
            fail_always: None,
        }
    }

    /// Fails the first call, succeeds afterwards
    #[must_use]
    pub fn flaky_once(text: &str, error: ErrorFactory) -> Self {
        Self {
            fail_first: Some(error),
            ..Self::ok(text)
        }
    }

    /// Fails every call
    #[must_use]
    pub fn failing(error: ErrorFactory) -> Self {
        Self {
            fail_always: Some(error),
            ..Self::ok("")
        }
    }
}

#[async_trait]
impl Transcribe for FakeTranscriber {
    async fn transcribe(
        &self,
        staged: &HandoffStore,
        language: Option<&str>,
    ) -> Result<Transcript> {
        let bytes = tokio::fs::read(staged.path())
            .await
            .expect("staged file readable during transcription");
        *self.staged.lock().await = Some((staged.path().to_path_buf(), bytes));

        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(make_error) = self.fail_always {
            return Err(make_error());
        }
        if call == 0 {
            if let Some(make_error) = self.fail_first {
                return Err(make_error());
            }
        }
        Ok(Transcript {
            text: self.text.clone(),
            language: language.map(ToString::to_string),
        })
    }
}

/// Fake generator that records the turn it was given
pub struct FakeGenerator {
    pub reply: String,
    pub calls: AtomicUsize,
    pub last_turn: Mutex<Option<ConversationTurn>>,
    fail: Option<ErrorFactory>,
}

impl FakeGenerator {
    #[must_use]
    pub fn ok(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
            last_turn: Mutex::new(None),
            fail: None,
        }
    }

    #[must_use]
    pub fn failing(error: ErrorFactory) -> Self {
        Self {
            fail: Some(error),
            ..Self::ok("")
        }
    }
}

#[async_trait]
impl Generate for FakeGenerator {
    async fn generate(&self, turn: &ConversationTurn) -> Result<ReplyText> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_turn.lock().await = Some(turn.clone());
        if let Some(make_error) = self.fail {
            return Err(make_error());
        }
        Ok(ReplyText(self.reply.clone()))
    }
}

/// Fake synthesizer emitting a fixed MP3-ish blob
pub struct FakeSynthesizer {
    pub calls: AtomicUsize,
    fail: bool,
}

pub const FAKE_AUDIO: &[u8] = &[0x49, 0x44, 0x33, 0x04, 0x00];

impl FakeSynthesizer {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }
}

#[async_trait]
impl Synthesize for FakeSynthesizer {
    async fn synthesize(&self, _text: &str) -> Result<SynthesizedAudio> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Synthesis("voice backend down".to_string()));
        }
        Ok(SynthesizedAudio {
            bytes: FAKE_AUDIO.to_vec(),
            format: "mp3",
            voice: "test-voice".to_string(),
        })
    }
}

/// Fake search lookup
pub struct FakeSearch {
    fail: bool,
    delay: Option<Duration>,
}

impl FakeSearch {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            fail: false,
            delay: None,
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            delay: None,
        }
    }
}

#[async_trait]
impl SearchLookup for FakeSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(Error::UpstreamUnavailable("search down".to_string()));
        }
        Ok((0..limit.min(1))
            .map(|_| SearchResult {
                title: "result".to_string(),
                url: "https://example.com".to_string(),
                snippet: format!("about {query}"),
            })
            .collect())
    }
}

/// Fake weather lookup, optionally slow
pub struct FakeWeather {
    fail: bool,
    delay: Option<Duration>,
}

impl FakeWeather {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            fail: false,
            delay: None,
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            delay: None,
        }
    }

    #[must_use]
    pub fn slow(delay: Duration) -> Self {
        Self {
            fail: false,
            delay: Some(delay),
        }
    }
}

#[async_trait]
impl WeatherLookup for FakeWeather {
    async fn current(&self, coords: Coordinates) -> Result<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(Error::UpstreamUnavailable("weather down".to_string()));
        }
        Ok(format!("clear sky, 21°C at {:.1},{:.1}", coords.lat, coords.lon))
    }
}

/// Assemble a pipeline from fakes with a short lookup deadline
#[must_use]
pub fn build_pipeline(
    transcriber: Arc<FakeTranscriber>,
    generator: Arc<FakeGenerator>,
    synthesizer: Arc<FakeSynthesizer>,
    search: FakeSearch,
    weather: FakeWeather,
) -> Pipeline {
    let augmenter = Augmenter::new(Some(Arc::new(search)), Arc::new(weather))
        .with_timeout(Duration::from_millis(100));
    Pipeline::new(
        transcriber,
        augmenter,
        generator,
        synthesizer,
        "test system prompt".to_string(),
        None,
    )
}
