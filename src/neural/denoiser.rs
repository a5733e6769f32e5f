//! Spectral subtraction denoiser
//!
//! HiFi-GAN vocoders emit a faint, constant hiss even for silent input.
//! Running the vocoder once on an all-zero mel captures that bias; at
//! synthesis time the bias magnitude (scaled by the configured strength)
//! is subtracted from each STFT frame's magnitude, clipped at zero, and
//! the waveform is rebuilt with the original phase.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

const FFT_SIZE: usize = 1024;
const HOP_SIZE: usize = 256;

/// Precomputed vocoder bias spectrum
pub struct Denoiser {
    bias_magnitude: Vec<f32>,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
}

impl Denoiser {
    /// Build from the waveform the vocoder produced for an all-zero mel
    pub fn new(bias_audio: &[f32]) -> Self {
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(FFT_SIZE);
        let inverse = planner.plan_fft_inverse(FFT_SIZE);
        let window = hann_window(FFT_SIZE);

        let (magnitudes, _phases) = stft(bias_audio, &*forward, &window);
        // Only the first frame matters: the bias is constant over time
        let bias_magnitude = magnitudes
            .into_iter()
            .next()
            .unwrap_or_else(|| vec![0.0; FFT_SIZE / 2 + 1]);

        Self {
            bias_magnitude,
            forward,
            inverse,
            window,
        }
    }

    /// Subtract the scaled bias from the waveform's magnitude spectrum
    pub fn apply(&self, audio: &[f32], strength: f32) -> Vec<f32> {
        if strength <= 0.0 || audio.len() < FFT_SIZE {
            return audio.to_vec();
        }

        let (mut magnitudes, phases) = stft(audio, &*self.forward, &self.window);
        for frame in magnitudes.iter_mut() {
            for (bin, magnitude) in frame.iter_mut().enumerate() {
                *magnitude = (*magnitude - self.bias_magnitude[bin] * strength).max(0.0);
            }
        }

        istft(&magnitudes, &phases, &*self.inverse, &self.window)
    }
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|n| {
            let phase = 2.0 * std::f32::consts::PI * n as f32 / (size - 1) as f32;
            0.5 - 0.5 * phase.cos()
        })
        .collect()
}

/// Short-time Fourier transform: per-frame magnitude and phase
fn stft(audio: &[f32], fft: &dyn Fft<f32>, window: &[f32]) -> (Vec<Vec<f32>>, Vec<Vec<f32>>) {
    let bins = FFT_SIZE / 2 + 1;
    let mut magnitudes = Vec::new();
    let mut phases = Vec::new();

    let mut start = 0;
    while start + FFT_SIZE < audio.len() {
        let mut buffer: Vec<Complex<f32>> = audio[start..start + FFT_SIZE]
            .iter()
            .zip(window)
            .map(|(&sample, &w)| Complex::new(sample * w, 0.0))
            .collect();
        fft.process(&mut buffer);

        let mut magnitude = Vec::with_capacity(bins);
        let mut phase = Vec::with_capacity(bins);
        for value in &buffer[..bins] {
            magnitude.push(value.norm());
            phase.push(value.im.atan2(value.re));
        }
        magnitudes.push(magnitude);
        phases.push(phase);

        start += HOP_SIZE;
    }

    (magnitudes, phases)
}

/// Inverse STFT via overlap-add of windowed frames
fn istft(
    magnitudes: &[Vec<f32>],
    phases: &[Vec<f32>],
    fft: &dyn Fft<f32>,
    window: &[f32],
) -> Vec<f32> {
    let bins = FFT_SIZE / 2 + 1;
    let num_frames = magnitudes.len();
    let mut output = vec![0.0f32; num_frames * HOP_SIZE + FFT_SIZE];

    for (frame_index, (magnitude, phase)) in magnitudes.iter().zip(phases).enumerate() {
        // Rebuild the full spectrum from the half-spectrum by symmetry
        let mut buffer = vec![Complex::new(0.0f32, 0.0); FFT_SIZE];
        for bin in 0..bins {
            buffer[bin] = Complex::from_polar(magnitude[bin], phase[bin]);
        }
        for bin in bins..FFT_SIZE {
            buffer[bin] = buffer[FFT_SIZE - bin].conj();
        }

        fft.process(&mut buffer);

        let start = frame_index * HOP_SIZE;
        for (offset, value) in buffer.iter().enumerate() {
            output[start + offset] += window[offset] * value.re / FFT_SIZE as f32;
        }
    }

    output
}
