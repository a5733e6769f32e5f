//! WAV container encoding
//!
//! The gateway's wire format is canonical WAV: RIFF/WAVE, PCM, 16-bit
//! little-endian samples. Engines hand back self-describing WAVs in
//! whatever format they produce; this module writes the final container
//! and the intermediate WAVs produced by the neural pipeline.

use std::io::Cursor;

use crate::core::error::{AudioOperation, Result, TtsError};

fn encode_error(e: hound::Error) -> TtsError {
    TtsError::Audio {
        operation: AudioOperation::Encoding,
        message: e.to_string(),
    }
}

/// Wrap raw 16-bit mono PCM bytes in a RIFF/WAVE container
pub fn encode_wav_pcm16(pcm: &[u8], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut buffer, spec).map_err(encode_error)?;
        for frame in pcm.chunks_exact(2) {
            let sample = i16::from_le_bytes([frame[0], frame[1]]);
            writer.write_sample(sample).map_err(encode_error)?;
        }
        writer.finalize().map_err(encode_error)?;
    }

    Ok(buffer.into_inner())
}

/// Encode i16 samples as a WAV with the given rate and channel count
pub fn encode_wav_i16(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut buffer, spec).map_err(encode_error)?;
        for &sample in samples {
            writer.write_sample(sample).map_err(encode_error)?;
        }
        writer.finalize().map_err(encode_error)?;
    }

    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_pcm16_header() {
        let pcm = vec![0u8; 64];
        let wav = encode_wav_pcm16(&pcm, 22050).unwrap();

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");

        let reader = hound::WavReader::new(Cursor::new(&wav)).unwrap();
        assert_eq!(reader.spec().sample_rate, 22050);
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().bits_per_sample, 16);
        assert_eq!(reader.len(), 32);
    }

    #[test]
    fn test_encode_i16_preserves_samples() {
        let samples = vec![100i16, -100, 32767, -32768];
        let wav = encode_wav_i16(&samples, 8000, 1).unwrap();

        let reader = hound::WavReader::new(Cursor::new(&wav)).unwrap();
        let decoded: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, samples);
    }
}
