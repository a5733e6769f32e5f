//! Canonical in-memory audio representation
//!
//! Every engine's WAV output is decoded into an `AudioSegment` before it
//! enters assembly: raw little-endian PCM frames plus sample rate, sample
//! width, and channel count. Decoding normalizes the sample width to
//! 16-bit; rate and channel count are preserved and conformed later.

use std::io::Cursor;

use crate::core::error::{AudioOperation, Result, TtsError};

/// Raw PCM audio with its format parameters
#[derive(Debug, Clone)]
pub struct AudioSegment {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Bytes per sample
    pub sample_width: u16,
    /// Channel count
    pub channels: u16,
    /// Little-endian PCM frames
    pub data: Vec<u8>,
}

impl AudioSegment {
    /// Decode a self-describing WAV into canonical 16-bit PCM
    ///
    /// Integer formats wider than 16 bits are shifted down; float formats
    /// are scaled. Rate and channel count pass through unchanged.
    pub fn from_wav_bytes(wav: &[u8]) -> Result<AudioSegment> {
        let reader = hound::WavReader::new(Cursor::new(wav)).map_err(|e| TtsError::Audio {
            operation: AudioOperation::Decoding,
            message: format!("invalid WAV: {e}"),
        })?;

        let spec = reader.spec();
        let samples: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Int, bits) if bits <= 16 => reader
                .into_samples::<i16>()
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| TtsError::Audio {
                    operation: AudioOperation::Decoding,
                    message: format!("bad sample data: {e}"),
                })?,
            (hound::SampleFormat::Int, bits) => {
                let shift = bits - 16;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| (v >> shift) as i16))
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| TtsError::Audio {
                        operation: AudioOperation::Decoding,
                        message: format!("bad sample data: {e}"),
                    })?
            }
            (hound::SampleFormat::Float, _) => reader
                .into_samples::<f32>()
                .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * 32767.0) as i16))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| TtsError::Audio {
                    operation: AudioOperation::Decoding,
                    message: format!("bad sample data: {e}"),
                })?,
        };

        let mut data = Vec::with_capacity(samples.len() * 2);
        for sample in samples {
            data.extend_from_slice(&sample.to_le_bytes());
        }

        Ok(AudioSegment {
            sample_rate: spec.sample_rate,
            sample_width: 2,
            channels: spec.channels,
            data,
        })
    }

    /// All-zero PCM covering `millis` of silence in the given format
    ///
    /// The byte count is `ceil(seconds * rate * width * channels)`, rounded
    /// down to a whole frame so the buffer stays frame-aligned.
    pub fn silence(millis: u64, sample_rate: u32, sample_width: u16, channels: u16) -> AudioSegment {
        let seconds = millis as f64 / 1000.0;
        let mut num_bytes = (seconds
            * sample_rate as f64
            * sample_width as f64
            * channels as f64)
            .ceil() as usize;
        let frame = (sample_width * channels) as usize;
        num_bytes -= num_bytes % frame;

        AudioSegment {
            sample_rate,
            sample_width,
            channels,
            data: vec![0u8; num_bytes],
        }
    }

    /// Whether this segment can be appended to the output without conversion
    pub fn matches(&self, target_rate: u32) -> bool {
        self.sample_rate == target_rate && self.sample_width == 2 && self.channels == 1
    }

    /// Interpret the PCM as f32 samples in [-1, 1], downmixed to mono
    pub fn to_mono_f32(&self) -> Result<Vec<f32>> {
        if self.sample_width != 2 {
            return Err(TtsError::Audio {
                operation: AudioOperation::Resampling,
                message: format!("unsupported sample width: {}", self.sample_width),
            });
        }

        let channels = self.channels.max(1) as usize;
        let mut mono = Vec::with_capacity(self.data.len() / 2 / channels);

        for frame in self.data.chunks_exact(2 * channels) {
            let mut acc = 0.0f32;
            for sample in frame.chunks_exact(2) {
                let value = i16::from_le_bytes([sample[0], sample[1]]);
                acc += value as f32 / 32768.0;
            }
            mono.push(acc / channels as f32);
        }

        Ok(mono)
    }

    /// Number of frames in this segment
    pub fn num_frames(&self) -> usize {
        let frame = (self.sample_width * self.channels).max(1) as usize;
        self.data.len() / frame
    }

    /// Playback duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.num_frames() as f64 / self.sample_rate as f64
    }
}

/// Build a segment from f32 samples in [-1, 1] (mono, 16-bit)
pub fn segment_from_f32(samples: &[f32], sample_rate: u32) -> AudioSegment {
    let mut data = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
        data.extend_from_slice(&value.to_le_bytes());
    }

    AudioSegment {
        sample_rate,
        sample_width: 2,
        channels: 1,
        data,
    }
}
