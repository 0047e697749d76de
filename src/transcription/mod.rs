mod driver;
mod engine;
mod transcript;
mod whisper;

pub use driver::{transcribe, TranscribeError, BEAM_SIZE};
pub use engine::{
    EngineError, Segment, SpeechEngine, TranscriptionInfo, TranscriptionOutput,
    TranscriptionRequest,
};
pub use transcript::{format_timestamp, output_path, Transcript};
pub use whisper::{download_model, is_model_downloaded, model_path, WhisperEngine, WhisperModel};
