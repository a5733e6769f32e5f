//! Sample rate conversion using rubato
//!
//! Segments that do not match the assembly target (rate, 16-bit, mono) are
//! conformed here before concatenation: multi-channel input is downmixed by
//! averaging, then sinc-interpolated to the target rate.

use rubato::{
    calculate_cutoff, Resampler as RubatoResampler, SincFixedIn, SincInterpolationParameters,
    SincInterpolationType, WindowFunction,
};

use crate::audio::segment::{segment_from_f32, AudioSegment};
use crate::core::error::{AudioOperation, Result, TtsError};

/// Chunk size for incremental processing of long buffers
const CHUNK_SIZE: usize = 1024;

/// Conform a segment to (target_rate, 16-bit, mono)
///
/// Segments already in the target format pass through untouched.
pub fn conform(segment: AudioSegment, target_rate: u32) -> Result<AudioSegment> {
    if segment.matches(target_rate) {
        return Ok(segment);
    }

    let mono = segment.to_mono_f32()?;
    let resampled = resample(&mono, segment.sample_rate, target_rate)?;

    Ok(segment_from_f32(&resampled, target_rate))
}

/// Resample mono f32 audio from one rate to another
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    if samples.len() <= CHUNK_SIZE * 2 {
        resample_whole(samples, from_rate, to_rate)
    } else {
        resample_chunked(samples, from_rate, to_rate)
    }
}

fn resample_error(e: impl std::fmt::Display) -> TtsError {
    TtsError::Audio {
        operation: AudioOperation::Resampling,
        message: e.to_string(),
    }
}

/// Single-pass resampling for short buffers
fn resample_whole(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    let sinc_len = 256;
    let window = WindowFunction::BlackmanHarris2;
    let params = SincInterpolationParameters {
        sinc_len,
        f_cutoff: calculate_cutoff(sinc_len, window),
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window,
    };

    let mut resampler = SincFixedIn::<f32>::new(
        to_rate as f64 / from_rate as f64,
        2.0,
        params,
        samples.len(),
        1,
    )
    .map_err(resample_error)?;

    let output = resampler
        .process(&[samples.to_vec()], None)
        .map_err(resample_error)?;

    Ok(output.into_iter().next().unwrap_or_default())
}

/// Chunked resampling keeps memory bounded on long buffers
fn resample_chunked(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    let sinc_len = 128;
    let window = WindowFunction::Blackman2;
    let params = SincInterpolationParameters {
        sinc_len,
        f_cutoff: calculate_cutoff(sinc_len, window),
        interpolation: SincInterpolationType::Quadratic,
        oversampling_factor: 256,
        window,
    };

    let ratio = to_rate as f64 / from_rate as f64;
    let mut resampler =
        SincFixedIn::<f32>::new(ratio, 1.1, params, CHUNK_SIZE, 1).map_err(resample_error)?;

    let mut output = Vec::with_capacity((samples.len() as f64 * ratio * 1.1) as usize);

    let mut pos = 0;
    while pos + CHUNK_SIZE <= samples.len() {
        let chunk = vec![samples[pos..pos + CHUNK_SIZE].to_vec()];
        let processed = resampler.process(&chunk, None).map_err(resample_error)?;
        if let Some(chunk_out) = processed.into_iter().next() {
            output.extend(chunk_out);
        }
        pos += CHUNK_SIZE;
    }

    if pos < samples.len() {
        let remaining = [&samples[pos..]];
        let processed = resampler
            .process_partial(Some(&remaining[..]), None)
            .map_err(resample_error)?;
        if let Some(chunk_out) = processed.into_iter().next() {
            output.extend(chunk_out);
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(rate: u32, freq: f32, secs: f32) -> Vec<f32> {
        let n = (rate as f32 * secs) as usize;
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_same_rate_passthrough() {
        let samples = sine(16000, 440.0, 0.1);
        let result = resample(&samples, 16000, 16000).unwrap();
        assert_eq!(result, samples);
    }

    #[test]
    fn test_upsample_scales_length() {
        let samples = sine(16000, 440.0, 0.5);
        let result = resample(&samples, 16000, 22050).unwrap();

        let expected = samples.len() as f64 * 22050.0 / 16000.0;
        let tolerance = expected * 0.15;
        assert!((result.len() as f64 - expected).abs() < tolerance);
    }

    #[test]
    fn test_downsample_scales_length() {
        let samples = sine(44100, 440.0, 0.2);
        let result = resample(&samples, 44100, 22050).unwrap();
        assert!(result.len() < samples.len());
        assert!(result.len() > samples.len() / 3);
    }

    #[test]
    fn test_conform_passthrough_is_lossless() {
        let segment = AudioSegment::silence(100, 22050, 2, 1);
        let before = segment.data.len();
        let conformed = conform(segment, 22050).unwrap();
        assert_eq!(conformed.data.len(), before);
    }

    #[test]
    fn test_conform_promotes_rate() {
        let samples = sine(16000, 440.0, 1.0);
        let segment = segment_from_f32(&samples, 16000);
        let conformed = conform(segment, 22050).unwrap();

        assert_eq!(conformed.sample_rate, 22050);
        assert_eq!(conformed.channels, 1);
        // Frame count scales with the rate ratio, not copied verbatim
        let expected = 16000.0f64 * 22050.0 / 16000.0;
        assert!((conformed.num_frames() as f64 - expected).abs() < expected * 0.15);
    }
}
