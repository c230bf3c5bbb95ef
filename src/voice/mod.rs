//! Speech processing: transcription (STT) and synthesis (TTS)

pub mod stt;
pub mod tts;

pub use stt::{Transcriber, Transcript};
pub use tts::{SpeechSynthesizer, SynthesizedAudio};
