use std::path::PathBuf;

use anyhow::Context as _;

mod audio;
mod transcription;

use transcription::{transcribe, TranscribeError, TranscriptionRequest, WhisperModel};

/// Fixed model and language for this workflow
const MODEL: WhisperModel = WhisperModel::LargeV3Quantized;
const LANGUAGE: &str = "nl";

/// The recordings to transcribe, in order.
fn audio_files() -> Vec<PathBuf> {
    let downloads = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Downloads");
    vec![
        downloads.join("Helene en AnneMarie.m4a"),
        downloads.join("Joke Swiebel.m4a"),
    ]
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    for audio_path in audio_files() {
        let request = TranscriptionRequest {
            audio_path,
            model: MODEL,
            language: Some(LANGUAGE.to_string()),
        };

        match transcribe(&request) {
            Ok(_) => {}
            Err(TranscribeError::FileNotFound(path)) => {
                println!("Bestand niet gevonden: {}", path.display());
                std::process::exit(1);
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("transcriptie mislukt: {}", request.audio_path.display())
                });
            }
        }

        println!("\n{}\n", "=".repeat(60));
    }

    Ok(())
}
