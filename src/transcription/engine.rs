//! Engine-facing types and the speech engine seam.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::audio::AudioError;
use crate::transcription::whisper::WhisperModel;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to download model: {0}")]
    Download(String),
    #[error("Failed to initialize engine: {0}")]
    Init(String),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error("Transcription failed: {0}")]
    Transcription(String),
}

/// One transcription invocation. Immutable, discarded after use.
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    pub audio_path: PathBuf,
    pub model: WhisperModel,
    /// Language hint; `None` means auto-detect
    pub language: Option<String>,
}

/// One-time summary the engine produces before segment iteration.
#[derive(Debug, Clone)]
pub struct TranscriptionInfo {
    pub language: String,
    /// Confidence of the language decision, 0.0 to 1.0
    pub language_probability: f64,
    pub duration_secs: f64,
}

/// A contiguous span of recognized speech.
///
/// Segments arrive in monotonically non-decreasing time order; that is an
/// engine invariant, not enforced here. Text may carry leading/trailing
/// whitespace from the decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub start_secs: f64,
    pub end_secs: f64,
    pub text: String,
}

/// Lazy, finite, forward-only segment sequence. Consumed exactly once;
/// not restartable. Each pull may fail.
pub type SegmentStream = Box<dyn Iterator<Item = Result<Segment, EngineError>>>;

/// What an engine hands back for one audio file: the summary plus the
/// segment sequence still to be consumed.
pub struct TranscriptionOutput {
    pub info: TranscriptionInfo,
    pub segments: SegmentStream,
}

/// The external transcription engine, behind a trait so the driver can be
/// exercised against a synthetic engine in tests.
pub trait SpeechEngine {
    fn transcribe(
        &mut self,
        audio_path: &Path,
        language: Option<&str>,
        beam_size: i32,
    ) -> Result<TranscriptionOutput, EngineError>;
}
