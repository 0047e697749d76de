//! Audio decoding front-end for the transcription engine.
//!
//! Whisper wants 16kHz mono f32. WAV files go through hound directly;
//! everything else (m4a/AAC, MP3) is decoded with symphonia and downmixed,
//! then resampled with rubato when the source rate differs.

mod resample;

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;
use tracing::{debug, warn};

pub use resample::resample;

/// Whisper's required sample rate
pub const WHISPER_SAMPLE_RATE: u32 = 16000;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("Failed to decode audio: {0}")]
    Decode(String),
    #[error("Unsupported audio: {0}")]
    Unsupported(String),
    #[error("Resampling failed: {0}")]
    Resample(String),
}

/// Audio decoded and converted to Whisper's input format.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Samples at 16kHz, mono, normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Duration in seconds, from the source sample count
    pub duration_secs: f64,
}

/// Decode an audio file into 16kHz mono f32 samples.
pub fn load_audio(path: &Path) -> Result<DecodedAudio, AudioError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let (samples, source_rate) = match ext.as_deref() {
        Some("wav") => load_wav(path)?,
        _ => decode_compressed(path)?,
    };

    let duration_secs = samples.len() as f64 / source_rate as f64;
    debug!(
        "Decoded {} samples at {}Hz ({:.2}s)",
        samples.len(),
        source_rate,
        duration_secs
    );

    let samples = if source_rate == WHISPER_SAMPLE_RATE {
        samples
    } else {
        resample(&samples, source_rate, WHISPER_SAMPLE_RATE)?
    };

    Ok(DecodedAudio {
        samples,
        duration_secs,
    })
}

/// Read a WAV file, downmixed to mono.
fn load_wav(path: &Path) -> Result<(Vec<f32>, u32), AudioError> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AudioError::Decode(format!("failed to read float samples: {e}")))?,
        hound::SampleFormat::Int => reader
            .samples::<i16>()
            .map(|s| s.map(|s| s as f32 / 32768.0))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AudioError::Decode(format!("failed to read int samples: {e}")))?,
    };

    Ok((downmix(&samples, spec.channels as usize), spec.sample_rate))
}

/// Decode a compressed container (m4a, mp3, ...) with symphonia.
fn decode_compressed(path: &Path) -> Result<(Vec<f32>, u32), AudioError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::Unsupported(format!("{}: {e}", path.display())))?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| AudioError::Unsupported("no default audio track".to_string()))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::Unsupported(format!("no decoder for track: {e}")))?;

    let mut sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| AudioError::Decode("source sample rate unknown".to_string()))?;
    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            // End of stream surfaces as an unexpected EOF
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(AudioError::Decode(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                let channels = spec.channels.count();

                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                samples.extend(downmix(buf.samples(), channels));
            }
            // Recoverable per symphonia's contract: skip the corrupt packet
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("Skipping undecodable packet: {e}");
            }
            Err(e) => return Err(AudioError::Decode(e.to_string())),
        }
    }

    if samples.is_empty() {
        return Err(AudioError::Decode("no audio frames decoded".to_string()));
    }

    Ok((samples, sample_rate))
}

/// Average interleaved channels down to mono.
fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
