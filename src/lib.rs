//! Parley Gateway - single-request voice assistant pipeline
//!
//! Accepts an audio clip (plus optional location context), produces a
//! transcript, optionally enriches it with live web search and weather,
//! obtains an answer from a chat model, synthesizes that answer to speech,
//! and returns both text and audio to the caller.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                  HTTP surface                     │
//! │        POST /chat   │   GET / (liveness)          │
//! └───────────────────┬──────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────┐
//! │              Pipeline (per request)               │
//! │  ingest → transcribe → augment → generate → tts  │
//! │                      └ search ∥ weather           │
//! └───────────────────┬──────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────┐
//! │        Collaborators (external services)          │
//! │   Whisper │ Chat │ Speech │ Brave/Serper │ Meteo  │
//! └──────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod audio;
pub mod chat;
pub mod config;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod voice;

pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineResult, Stage};
