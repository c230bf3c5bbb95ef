//! Process configuration
//!
//! Loaded once at startup from environment variables and read-only for the
//! process lifetime. Every component receives what it needs at construction;
//! nothing reads the environment after this point.

use crate::{Error, Result};

/// Default chat model when `PARLEY_CHAT_MODEL` is unset
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Default port when `PARLEY_PORT`/`PORT` are unset
pub const DEFAULT_PORT: u16 = 18990;

/// Which web search provider to use for context augmentation
#[derive(Debug, Clone)]
pub enum SearchProviderConfig {
    /// Brave Search API
    Brave {
        /// API key for Brave Search
        api_key: String,
    },
    /// Serper (Google) Search API
    Serper {
        /// API key for Serper
        api_key: String,
    },
}

/// Process-wide configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// `OpenAI` API key, used for transcription, chat, and synthesis
    pub openai_api_key: String,

    /// STT model (e.g. "whisper-1")
    pub stt_model: String,

    /// Chat model (e.g. "gpt-4o-mini")
    pub chat_model: String,

    /// TTS model (e.g. "tts-1")
    pub tts_model: String,

    /// TTS voice identifier, fixed per deployment
    pub tts_voice: String,

    /// Default language hint passed to transcription (e.g. "en", "zh")
    pub language: Option<String>,

    /// Search provider, if any key is configured.
    ///
    /// When absent the search sub-lookup degrades to an unavailable snippet
    /// rather than failing requests.
    pub search: Option<SearchProviderConfig>,

    /// Override for the assistant system prompt
    pub system_prompt: Option<String>,

    /// Port for the HTTP server
    pub port: u16,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `OPENAI_API_KEY` is unset or empty.
    pub fn load() -> Result<Self> {
        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Config("OPENAI_API_KEY is required".to_string()))?;

        let search = std::env::var("BRAVE_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .map(|api_key| SearchProviderConfig::Brave { api_key })
            .or_else(|| {
                std::env::var("SERPER_API_KEY")
                    .ok()
                    .filter(|k| !k.is_empty())
                    .map(|api_key| SearchProviderConfig::Serper { api_key })
            });

        let port = std::env::var("PARLEY_PORT")
            .or_else(|_| std::env::var("PORT"))
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Ok(Self {
            openai_api_key,
            stt_model: std::env::var("PARLEY_STT_MODEL")
                .unwrap_or_else(|_| "whisper-1".to_string()),
            chat_model: std::env::var("PARLEY_CHAT_MODEL")
                .unwrap_or_else(|_| DEFAULT_CHAT_MODEL.to_string()),
            tts_model: std::env::var("PARLEY_TTS_MODEL").unwrap_or_else(|_| "tts-1".to_string()),
            tts_voice: std::env::var("PARLEY_TTS_VOICE").unwrap_or_else(|_| "alloy".to_string()),
            language: std::env::var("PARLEY_LANGUAGE").ok().filter(|l| !l.is_empty()),
            search,
            system_prompt: std::env::var("PARLEY_SYSTEM_PROMPT").ok(),
            port,
        })
    }
}
