use rubato::{FastFixedIn, PolynomialDegree, Resampler};

use super::AudioError;

/// Input frames fed to rubato per process call
const CHUNK_SIZE: usize = 1024;

/// Resample mono audio from `source_rate` to `target_rate`.
///
/// Input is processed in fixed-size chunks; the last chunk is zero-padded,
/// so the output may carry a sub-chunk of trailing silence.
pub fn resample(input: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>, AudioError> {
    if source_rate == target_rate {
        return Ok(input.to_vec());
    }

    let ratio = target_rate as f64 / source_rate as f64;
    let mut resampler = FastFixedIn::<f32>::new(ratio, 2.0, PolynomialDegree::Linear, CHUNK_SIZE, 1)
        .map_err(|e| AudioError::Resample(e.to_string()))?;

    let mut output = Vec::with_capacity((input.len() as f64 * ratio) as usize + CHUNK_SIZE);

    for chunk in input.chunks(CHUNK_SIZE) {
        let frames = if chunk.len() == CHUNK_SIZE {
            chunk.to_vec()
        } else {
            let mut padded = chunk.to_vec();
            padded.resize(CHUNK_SIZE, 0.0);
            padded
        };

        let mut resampled = resampler
            .process(&[frames], None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        output.append(&mut resampled[0]);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_same_rate_is_identity() {
        let input = vec![0.5f32; 4096];
        let output = resample(&input, 16000, 16000).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_resample_halves_sample_count() {
        // Two seconds of a 440Hz tone at 32kHz
        let input: Vec<f32> = (0..64000)
            .map(|i| (i as f32 / 32000.0 * 440.0 * 2.0 * std::f32::consts::PI).sin())
            .collect();

        let output = resample(&input, 32000, 16000).unwrap();

        // Expect roughly half the samples, allowing for chunk padding
        let expected = input.len() / 2;
        assert!(
            output.len() >= expected && output.len() <= expected + CHUNK_SIZE,
            "unexpected output length {}",
            output.len()
        );
        assert!(output.iter().all(|s| s.abs() <= 1.01));
    }

    #[test]
    fn test_resample_upsamples() {
        let input = vec![0.0f32; 8000];
        let output = resample(&input, 8000, 16000).unwrap();
        assert!(output.len() >= 16000);
    }
}
