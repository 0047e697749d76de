//! The transcription driver: validate input, run the engine, report
//! progress, write the transcript file.

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;

use crate::transcription::engine::{EngineError, Segment, SpeechEngine, TranscriptionRequest};
use crate::transcription::transcript::{
    format_segment_line, format_timestamp, output_path, Transcript,
};
use crate::transcription::whisper::WhisperEngine;

/// Fixed decoding beam width
pub const BEAM_SIZE: i32 = 5;

const RULE_WIDTH: usize = 60;

#[derive(Error, Debug)]
pub enum TranscribeError {
    #[error("Bestand niet gevonden: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transcribe one audio file and write its `.txt` transcript.
///
/// The input path is the only validated precondition; it is checked before
/// any model work. The model is loaded fresh per call.
pub fn transcribe(request: &TranscriptionRequest) -> Result<PathBuf, TranscribeError> {
    if !request.audio_path.exists() {
        return Err(TranscribeError::FileNotFound(request.audio_path.clone()));
    }

    println!("Model laden ({})...", request.model);
    let mut engine = WhisperEngine::load(request.model)?;

    run_with_engine(&mut engine, &request.audio_path, request.language.as_deref())
}

/// Steps after model load, generic over the engine so tests can drive a
/// synthetic one.
pub fn run_with_engine<E: SpeechEngine>(
    engine: &mut E,
    audio_path: &Path,
    language: Option<&str>,
) -> Result<PathBuf, TranscribeError> {
    let source_name = audio_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| audio_path.display().to_string());

    println!("Transcriberen: {source_name}");
    let output = engine.transcribe(audio_path, language, BEAM_SIZE)?;
    let info = output.info;

    println!(
        "Taal gedetecteerd: {} (waarschijnlijkheid: {:.2})",
        info.language, info.language_probability
    );
    println!("Duur: {}", format_timestamp(info.duration_secs));
    println!("{}", "-".repeat(RULE_WIDTH));

    let pb = progress_bar(info.duration_secs);
    let lines = consume_segments(output.segments, &pb)?;
    pb.finish();

    let mut transcript = Transcript::new(source_name, info.language, info.duration_secs);
    for line in lines {
        transcript.push_line(line);
    }

    let out_path = output_path(audio_path);
    transcript.save(&out_path)?;
    println!("\nOpgeslagen: {}", out_path.display());

    Ok(out_path)
}

/// Progress bar over cumulative audio seconds covered.
fn progress_bar(duration_secs: f64) -> ProgressBar {
    let pb = ProgressBar::new(duration_secs as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len}s [{elapsed_precise}]")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb.set_message("Voortgang");
    pb
}

/// Drain the segment sequence, formatting one line per segment and moving
/// the bar to the end of the last consumed segment. Segments arrive in time
/// order, so the position never regresses.
fn consume_segments<I>(segments: I, pb: &ProgressBar) -> Result<Vec<String>, EngineError>
where
    I: IntoIterator<Item = Result<Segment, EngineError>>,
{
    let mut lines = Vec::new();
    for segment in segments {
        let segment = segment?;
        lines.push(format_segment_line(&segment));
        pb.set_position(segment.end_secs as u64);
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::engine::{TranscriptionInfo, TranscriptionOutput};
    use crate::transcription::whisper::WhisperModel;
    use indicatif::ProgressDrawTarget;

    struct StubEngine {
        info: TranscriptionInfo,
        segments: Vec<Segment>,
    }

    impl StubEngine {
        fn new(duration_secs: f64, segments: Vec<Segment>) -> Self {
            Self {
                info: TranscriptionInfo {
                    language: "nl".to_string(),
                    language_probability: 0.97,
                    duration_secs,
                },
                segments,
            }
        }
    }

    impl SpeechEngine for StubEngine {
        fn transcribe(
            &mut self,
            _audio_path: &Path,
            _language: Option<&str>,
            _beam_size: i32,
        ) -> Result<TranscriptionOutput, EngineError> {
            Ok(TranscriptionOutput {
                info: self.info.clone(),
                segments: Box::new(self.segments.clone().into_iter().map(Ok)),
            })
        }
    }

    fn segment(start_secs: f64, end_secs: f64, text: &str) -> Segment {
        Segment {
            start_secs,
            end_secs,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_stub_engine_produces_exact_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("opname.m4a");

        let mut engine = StubEngine::new(
            10.0,
            vec![segment(0.0, 2.5, " hallo "), segment(2.5, 10.0, "wereld")],
        );

        let out = run_with_engine(&mut engine, &input, Some("nl")).unwrap();
        assert_eq!(out, dir.path().join("opname.txt"));

        let contents = std::fs::read_to_string(&out).unwrap();
        let (header, body) = contents.split_once("\n\n").unwrap();
        assert!(header.starts_with("Transcriptie: opname.m4a\nTaal: nl\nDuur: 00:00:10\n"));
        assert_eq!(
            body,
            "[00:00:00 -> 00:00:02]  hallo\n[00:00:02 -> 00:00:10]  wereld"
        );
    }

    #[test]
    fn test_progress_ends_at_total_duration() {
        let pb = progress_bar(10.0);
        pb.set_draw_target(ProgressDrawTarget::hidden());

        let segments = vec![
            Ok(segment(0.0, 1.0, "a")),
            Ok(segment(1.0, 4.5, "b")),
            Ok(segment(4.5, 4.5, "c")),
            Ok(segment(4.5, 10.0, "d")),
        ];
        consume_segments(segments, &pb).unwrap();

        assert_eq!(pb.position(), 10);
        assert_eq!(pb.length(), Some(10));
    }

    #[test]
    fn test_missing_file_fails_before_model_load() {
        let request = TranscriptionRequest {
            audio_path: PathBuf::from("/nonexistent/opname.m4a"),
            model: WhisperModel::Tiny,
            language: Some("nl".to_string()),
        };
        // Must fail on the path check; a model load attempt would try to
        // touch the network or the models directory.
        match transcribe(&request) {
            Err(TranscribeError::FileNotFound(path)) => {
                assert_eq!(path, request.audio_path);
            }
            other => panic!("expected FileNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_engine_failure_propagates() {
        struct FailingEngine;
        impl SpeechEngine for FailingEngine {
            fn transcribe(
                &mut self,
                _audio_path: &Path,
                _language: Option<&str>,
                _beam_size: i32,
            ) -> Result<TranscriptionOutput, EngineError> {
                Err(EngineError::Transcription("corrupt audio".to_string()))
            }
        }

        let result = run_with_engine(&mut FailingEngine, Path::new("x.m4a"), None);
        assert!(matches!(result, Err(TranscribeError::Engine(_))));
    }
}
