//! Shared test utilities

use vocalink::voice::SAMPLE_RATE;
use vocalink::AudioFrame;

/// Generate sine wave audio samples
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Generate silence
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn generate_silence(duration_secs: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    vec![0.0; num_samples]
}

/// Wrap samples as one capture frame
#[must_use]
pub fn frame_of(samples: Vec<f32>) -> AudioFrame {
    AudioFrame::new(samples, SAMPLE_RATE, 1)
}

/// A run of 100 ms frames at the given amplitude
#[must_use]
pub fn frames(amplitude: f32, count: usize) -> Vec<AudioFrame> {
    (0..count)
        .map(|_| frame_of(vec![amplitude; SAMPLE_RATE as usize / 10]))
        .collect()
}
