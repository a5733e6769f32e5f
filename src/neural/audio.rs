//! Mel-spectrogram and PCM conversions for the neural pipeline
//!
//! The vocoder was trained on dynamic-range-compressed amplitude mels, so
//! the acoustic model's normalized dB output must be denormalized,
//! converted dB -> amplitude, and re-compressed in exactly that order
//! before vocoding. Getting the order wrong produces noise, not speech.

use ndarray::ArrayD;

const MAX_NORM: f32 = 1.0;
const REF_LEVEL_DB: f32 = 20.0;
const MIN_LEVEL_DB: f32 = -100.0;
const COMPRESSION_CLIP: f32 = 1e-5;

/// Maximum int16 magnitude used for peak normalization
const MAX_WAV_VALUE: f32 = 32767.0;

/// Pull normalized mel values back into dB (symmetric norm, clipped)
pub fn denormalize(mel: ArrayD<f32>) -> ArrayD<f32> {
    mel.mapv(|x| {
        let clipped = x.clamp(-MAX_NORM, MAX_NORM);
        (clipped + MAX_NORM) * -MIN_LEVEL_DB / (2.0 * MAX_NORM) + MIN_LEVEL_DB + REF_LEVEL_DB
    })
}

/// dB to amplitude
pub fn db_to_amp(mel: ArrayD<f32>) -> ArrayD<f32> {
    mel.mapv(|x| 10.0f32.powf(x))
}

/// Compression applied during vocoder training: log of clipped amplitude
pub fn dynamic_range_compression(mel: ArrayD<f32>) -> ArrayD<f32> {
    mel.mapv(|x| x.max(COMPRESSION_CLIP).ln())
}

/// Peak-normalize f32 audio into the int16 range
///
/// The divisor never goes below 0.01 so near-silent buffers are not blown
/// up into full-scale noise.
pub fn float_to_int16(audio: &[f32]) -> Vec<i16> {
    let peak = audio.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
    let gain = MAX_WAV_VALUE / peak.max(0.01);

    audio
        .iter()
        .map(|&s| (s * gain).clamp(-MAX_WAV_VALUE, MAX_WAV_VALUE) as i16)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    fn mel_of(values: &[f32]) -> ArrayD<f32> {
        ArrayD::from_shape_vec(IxDyn(&[1, 1, values.len()]), values.to_vec()).unwrap()
    }

    #[test]
    fn test_denormalize_range() {
        // -1 maps to min_level_db + ref, +1 maps to ref
        let out = denormalize(mel_of(&[-1.0, 1.0]));
        let values: Vec<f32> = out.iter().copied().collect();
        assert!((values[0] - (MIN_LEVEL_DB + REF_LEVEL_DB)).abs() < 1e-4);
        assert!((values[1] - REF_LEVEL_DB).abs() < 1e-4);
    }

    #[test]
    fn test_denormalize_clips_outliers() {
        let out = denormalize(mel_of(&[5.0]));
        let clipped = denormalize(mel_of(&[1.0]));
        assert_eq!(out.iter().next(), clipped.iter().next());
    }

    #[test]
    fn test_db_to_amp() {
        let out = db_to_amp(mel_of(&[0.0, 2.0]));
        let values: Vec<f32> = out.iter().copied().collect();
        assert!((values[0] - 1.0).abs() < 1e-5);
        assert!((values[1] - 100.0).abs() < 1e-2);
    }

    #[test]
    fn test_compression_clips_small_values() {
        let out = dynamic_range_compression(mel_of(&[0.0]));
        let expected = COMPRESSION_CLIP.ln();
        assert!((out.iter().next().unwrap() - expected).abs() < 1e-4);
    }

    #[test]
    fn test_float_to_int16_peak_normalizes() {
        let pcm = float_to_int16(&[0.5, -0.25]);
        assert_eq!(pcm[0], 32767);
        assert_eq!(pcm[1], -16383);
    }

    #[test]
    fn test_float_to_int16_silence_floor() {
        // Peak 0.001 is below the 0.01 floor: gain tops out at 100x
        let pcm = float_to_int16(&[0.001]);
        assert!((pcm[0] as f32 - 0.001 * MAX_WAV_VALUE / 0.01).abs() < 2.0);
    }
}
