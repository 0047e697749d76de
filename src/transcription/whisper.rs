//! Whisper.cpp engine via the whisper-rs bindings.
//!
//! Runs on the CPU; reduced-precision inference is fixed by shipping a
//! quantized ggml model file rather than a runtime switch.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio;
use crate::transcription::engine::{
    EngineError, Segment, SpeechEngine, TranscriptionInfo, TranscriptionOutput,
};

/// Available Whisper model sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhisperModel {
    Tiny,
    Base,
    Small,
    Medium,
    LargeV3,
    /// large-v3 with 5-bit quantized weights; the fixed low-precision build
    /// this tool runs with
    LargeV3Quantized,
}

impl WhisperModel {
    /// On-disk filename for this model
    pub fn filename(&self) -> &'static str {
        match self {
            WhisperModel::Tiny => "ggml-tiny.bin",
            WhisperModel::Base => "ggml-base.bin",
            WhisperModel::Small => "ggml-small.bin",
            WhisperModel::Medium => "ggml-medium.bin",
            WhisperModel::LargeV3 => "ggml-large-v3.bin",
            WhisperModel::LargeV3Quantized => "ggml-large-v3-q5_0.bin",
        }
    }

    /// Hugging Face URL for this model
    pub fn hf_url(&self) -> String {
        format!(
            "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/{}",
            self.filename()
        )
    }

    /// Approximate model size in MB
    pub fn size_mb(&self) -> u64 {
        match self {
            WhisperModel::Tiny => 75,
            WhisperModel::Base => 142,
            WhisperModel::Small => 466,
            WhisperModel::Medium => 1500,
            WhisperModel::LargeV3 => 3100,
            WhisperModel::LargeV3Quantized => 1100,
        }
    }
}

impl std::fmt::Display for WhisperModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WhisperModel::Tiny => write!(f, "tiny"),
            WhisperModel::Base => write!(f, "base"),
            WhisperModel::Small => write!(f, "small"),
            WhisperModel::Medium => write!(f, "medium"),
            WhisperModel::LargeV3 => write!(f, "large-v3"),
            WhisperModel::LargeV3Quantized => write!(f, "large-v3-q5_0"),
        }
    }
}

impl std::str::FromStr for WhisperModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tiny" => Ok(WhisperModel::Tiny),
            "base" => Ok(WhisperModel::Base),
            "small" => Ok(WhisperModel::Small),
            "medium" => Ok(WhisperModel::Medium),
            "large" | "large-v3" => Ok(WhisperModel::LargeV3),
            "large-v3-q5_0" => Ok(WhisperModel::LargeV3Quantized),
            _ => Err(format!(
                "Unknown model: {s}. Use tiny, base, small, medium, large-v3 or large-v3-q5_0"
            )),
        }
    }
}

/// Directory where downloaded models are cached
pub fn models_dir() -> PathBuf {
    PathBuf::from("models").join("whisper")
}

/// Path to a specific model file
pub fn model_path(model: WhisperModel) -> PathBuf {
    models_dir().join(model.filename())
}

/// Whether a model file is present and plausibly complete
pub fn is_model_downloaded(model: WhisperModel) -> bool {
    match fs::metadata(model_path(model)) {
        // At least half the expected size, or it is a truncated download
        Ok(meta) => meta.len() >= model.size_mb() * 1024 * 1024 / 2,
        Err(_) => false,
    }
}

/// Fetch a model from Hugging Face into the local cache, once.
pub fn download_model(model: WhisperModel) -> Result<PathBuf, EngineError> {
    let path = model_path(model);

    if is_model_downloaded(model) {
        info!("Model {} already cached at {:?}", model, path);
        return Ok(path);
    }

    fs::create_dir_all(models_dir())?;

    let url = model.hf_url();
    info!("Downloading Whisper {} model (~{}MB)...", model, model.size_mb());

    let mut response = reqwest::blocking::Client::new()
        .get(&url)
        .send()
        .map_err(|e| EngineError::Download(format!("HTTP request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(EngineError::Download(format!(
            "HTTP {} from {url}",
            response.status()
        )));
    }

    let total_size = response.content_length().unwrap_or(0);
    let pb = indicatif::ProgressBar::new(total_size);
    pb.set_style(
        indicatif::ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );

    // Download to a temp file so a partial fetch never looks like a model
    let temp_path = path.with_extension("bin.tmp");
    let mut file = File::create(&temp_path)?;
    io::copy(&mut response, &mut pb.wrap_write(&mut file))
        .map_err(|e| EngineError::Download(format!("Failed to read response: {e}")))?;
    pb.finish_with_message("Download complete");

    fs::rename(&temp_path, &path)?;
    info!("Model downloaded to {:?}", path);

    Ok(path)
}

/// Whisper engine: one loaded model, CPU inference.
pub struct WhisperEngine {
    ctx: WhisperContext,
    n_threads: i32,
}

impl WhisperEngine {
    /// Download the model if needed and load it.
    pub fn load(model: WhisperModel) -> Result<Self, EngineError> {
        let path = download_model(model)?;

        info!("Loading Whisper {} model...", model);
        let path_str = path
            .to_str()
            .ok_or_else(|| EngineError::Init(format!("non-UTF8 model path: {path:?}")))?;
        let ctx = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .map_err(|e| EngineError::Init(format!("Failed to load model: {e}")))?;

        // Use available CPU threads (leave 1 for the system)
        let n_threads = std::thread::available_parallelism()
            .map(|p| (p.get() as i32 - 1).max(1))
            .unwrap_or(4);

        info!("Whisper model loaded ({} threads)", n_threads);

        Ok(Self { ctx, n_threads })
    }
}

impl SpeechEngine for WhisperEngine {
    fn transcribe(
        &mut self,
        audio_path: &Path,
        language: Option<&str>,
        beam_size: i32,
    ) -> Result<TranscriptionOutput, EngineError> {
        let audio = audio::load_audio(audio_path)?;

        let mut params = FullParams::new(SamplingStrategy::BeamSearch {
            beam_size,
            patience: -1.0,
        });
        params.set_n_threads(self.n_threads);
        params.set_translate(false);
        params.set_token_timestamps(false);
        match language {
            Some(lang) => params.set_language(Some(lang)),
            None => params.set_language(Some("auto")),
        }
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_print_special(false);

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| EngineError::Transcription(format!("Failed to create state: {e}")))?;

        state
            .full(params, &audio.samples)
            .map_err(|e| EngineError::Transcription(format!("Inference failed: {e}")))?;

        let num_segments = state
            .full_n_segments()
            .map_err(|e| EngineError::Transcription(format!("Failed to get segments: {e}")))?;

        // With an explicit hint the language is taken as given; otherwise
        // report whisper's detection. whisper.cpp does not expose a detection
        // probability through these bindings, so the confidence is nominal.
        let detected = match language {
            Some(lang) => lang.to_string(),
            None => state
                .full_lang_id_from_state()
                .ok()
                .and_then(|id| whisper_rs::get_lang_str(id).map(str::to_string))
                .unwrap_or_else(|| "unknown".to_string()),
        };

        let info = TranscriptionInfo {
            language: detected,
            language_probability: 1.0,
            duration_secs: audio.duration_secs,
        };

        Ok(TranscriptionOutput {
            info,
            segments: Box::new(SegmentIter {
                state,
                num_segments,
                next: 0,
            }),
        })
    }
}

/// Pull-based view over a finished decode: each `next()` extracts one
/// segment from the whisper state. Forward-only, not restartable.
struct SegmentIter {
    state: whisper_rs::WhisperState,
    num_segments: i32,
    next: i32,
}

impl Iterator for SegmentIter {
    type Item = Result<Segment, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.num_segments {
            return None;
        }
        let i = self.next;
        self.next += 1;
        Some(self.extract(i))
    }
}

impl SegmentIter {
    fn extract(&self, i: i32) -> Result<Segment, EngineError> {
        let t0 = self
            .state
            .full_get_segment_t0(i)
            .map_err(|e| EngineError::Transcription(format!("Failed to get start time: {e}")))?;
        let t1 = self
            .state
            .full_get_segment_t1(i)
            .map_err(|e| EngineError::Transcription(format!("Failed to get end time: {e}")))?;
        let text = self
            .state
            .full_get_segment_text(i)
            .map_err(|e| EngineError::Transcription(format!("Failed to get text: {e}")))?;

        // Timestamps are in centiseconds
        Ok(Segment {
            start_secs: t0 as f64 / 100.0,
            end_secs: t1 as f64 / 100.0,
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_parsing() {
        assert_eq!("tiny".parse::<WhisperModel>().unwrap(), WhisperModel::Tiny);
        assert_eq!("SMALL".parse::<WhisperModel>().unwrap(), WhisperModel::Small);
        assert_eq!(
            "large-v3".parse::<WhisperModel>().unwrap(),
            WhisperModel::LargeV3
        );
        assert!("invalid".parse::<WhisperModel>().is_err());
    }

    #[test]
    fn test_model_paths() {
        assert!(
            model_path(WhisperModel::LargeV3Quantized)
                .to_str()
                .unwrap()
                .contains("ggml-large-v3-q5_0.bin")
        );
    }

    #[test]
    fn test_model_urls_point_at_whisper_cpp() {
        for model in [
            WhisperModel::Tiny,
            WhisperModel::Base,
            WhisperModel::Small,
            WhisperModel::Medium,
            WhisperModel::LargeV3,
            WhisperModel::LargeV3Quantized,
        ] {
            let url = model.hf_url();
            assert!(url.starts_with("https://huggingface.co/ggerganov/whisper.cpp/"));
            assert!(url.ends_with(model.filename()));
        }
    }
}
