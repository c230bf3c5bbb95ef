//! Audio ingest: payload validation, format normalization, and the scoped
//! temp-file handoff store.
//!
//! The payload lives exactly as long as one pipeline invocation. The handoff
//! store wraps a [`tempfile::NamedTempFile`] so the staged file is removed on
//! every exit path, including stage failures and pipeline aborts.

use std::path::Path;

use crate::{Error, Result};

/// Audio container formats the transcriber accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
    M4a,
    Webm,
    Ogg,
    Flac,
    /// Declared but unrecognized format, kept for error reporting
    Other(String),
}

impl AudioFormat {
    /// Resolve a declared format from a MIME type or file extension
    #[must_use]
    pub fn from_declared(declared: &str) -> Self {
        let lower = declared.to_ascii_lowercase();
        // Strip MIME parameters ("audio/webm;codecs=opus")
        let base = lower.split(';').next().unwrap_or(&lower).trim();

        match base {
            "audio/wav" | "audio/x-wav" | "audio/wave" | "wav" => Self::Wav,
            "audio/mpeg" | "audio/mp3" | "mp3" => Self::Mp3,
            "audio/mp4" | "audio/m4a" | "audio/x-m4a" | "m4a" | "mp4" => Self::M4a,
            "audio/webm" | "video/webm" | "webm" => Self::Webm,
            "audio/ogg" | "application/ogg" | "ogg" | "oga" | "opus" => Self::Ogg,
            "audio/flac" | "audio/x-flac" | "flac" => Self::Flac,
            other => Self::Other(other.to_string()),
        }
    }

    /// Sniff the container from magic bytes
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(b"WAVE") {
            return Some(Self::Wav);
        }
        if bytes.starts_with(b"ID3")
            || (bytes.len() > 1 && bytes[0] == 0xFF && (bytes[1] & 0xE0) == 0xE0)
        {
            return Some(Self::Mp3);
        }
        if bytes.get(4..8) == Some(b"ftyp") {
            return Some(Self::M4a);
        }
        if bytes.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
            return Some(Self::Webm);
        }
        if bytes.starts_with(b"OggS") {
            return Some(Self::Ogg);
        }
        if bytes.starts_with(b"fLaC") {
            return Some(Self::Flac);
        }
        None
    }

    /// File extension used for the handoff store and upstream file names
    #[must_use]
    pub fn extension(&self) -> &str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::M4a => "m4a",
            Self::Webm => "webm",
            Self::Ogg => "ogg",
            Self::Flac => "flac",
            Self::Other(_) => "bin",
        }
    }

    /// MIME type for multipart uploads
    #[must_use]
    pub fn mime(&self) -> &str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
            Self::M4a => "audio/mp4",
            Self::Webm => "audio/webm",
            Self::Ogg => "audio/ogg",
            Self::Flac => "audio/flac",
            Self::Other(_) => "application/octet-stream",
        }
    }
}

/// A validated audio payload, owned by the ingest stage until handed to the
/// transcriber. Never retained past transcription.
#[derive(Debug)]
pub struct AudioPayload {
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
    /// Original upload filename, kept as a hint for upstream services
    pub filename_hint: String,
}

impl AudioPayload {
    /// Upstream-facing file name ("clip.webm" style)
    #[must_use]
    pub fn upload_name(&self) -> String {
        let hint = Path::new(&self.filename_hint);
        if hint.extension().is_some() {
            self.filename_hint.clone()
        } else {
            format!("audio.{}", self.format.extension())
        }
    }
}

/// Validate an incoming audio payload.
///
/// The declared format (MIME type or extension) wins when recognized;
/// otherwise the container is sniffed from magic bytes.
///
/// # Errors
///
/// `Error::MissingInput` when `bytes` is empty, `Error::UnsupportedFormat`
/// when neither the declaration nor the content identify a usable container.
pub fn ingest(
    bytes: Vec<u8>,
    declared_format: Option<&str>,
    filename_hint: Option<&str>,
) -> Result<AudioPayload> {
    if bytes.is_empty() {
        return Err(Error::MissingInput("no audio data supplied".to_string()));
    }

    let declared = declared_format
        .filter(|d| !d.is_empty())
        .map(AudioFormat::from_declared);

    let format = match declared {
        Some(AudioFormat::Other(name)) => AudioFormat::sniff(&bytes).ok_or_else(|| {
            Error::UnsupportedFormat(format!("declared '{name}', content unrecognized"))
        })?,
        Some(known) => known,
        None => AudioFormat::sniff(&bytes)
            .ok_or_else(|| Error::UnsupportedFormat("unrecognized audio content".to_string()))?,
    };

    tracing::debug!(
        bytes = bytes.len(),
        format = ?format,
        "audio payload ingested"
    );

    Ok(AudioPayload {
        bytes,
        format,
        filename_hint: filename_hint.unwrap_or("audio.m4a").to_string(),
    })
}

/// Scoped temporary store for the ingest → transcribe handoff.
///
/// The transcriber reads the audio back from [`HandoffStore::path`]; the
/// in-memory payload can be released once staging succeeds. Dropping the
/// store deletes the staged file. Callers must not persist the path beyond
/// the transcription stage.
pub struct HandoffStore {
    file: tempfile::NamedTempFile,
    format: AudioFormat,
    upload_name: String,
}

impl HandoffStore {
    /// Stage a payload to a temporary file.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the temp file cannot be created or written.
    pub fn stage(payload: &AudioPayload) -> Result<Self> {
        use std::io::Write;

        let mut file = tempfile::Builder::new()
            .prefix("parley-audio-")
            .suffix(&format!(".{}", payload.format.extension()))
            .tempfile()?;
        file.write_all(&payload.bytes)?;
        file.flush()?;

        tracing::debug!(path = %file.path().display(), "audio staged for handoff");

        Ok(Self {
            file,
            format: payload.format.clone(),
            upload_name: payload.upload_name(),
        })
    }

    /// Path of the staged file
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Container of the staged audio
    #[must_use]
    pub const fn format(&self) -> &AudioFormat {
        &self.format
    }

    /// Upstream-facing file name, carried over from the payload
    #[must_use]
    pub fn upload_name(&self) -> &str {
        &self.upload_name
    }
}
