//! Voice activity detection
//!
//! Classifies each captured frame as speech or silence against a fixed RMS
//! threshold and tracks the end-of-utterance condition. A session ends only
//! after at least one voiced frame AND continuous silence reaching the
//! configured timeout; silence-only sessions never auto-terminate.

use std::time::Duration;

use crate::voice::AudioFrame;

/// Per-session voice activity state
pub struct VoiceActivityDetector {
    /// Fixed decision threshold (static configuration, never adapted)
    threshold: f32,
    silence_timeout: Duration,
    silence: Duration,
    speech_detected: bool,
    /// Loudest RMS seen this session. Display normalization only, never an
    /// input to the speech/silence decision.
    peak_volume: f32,
}

impl VoiceActivityDetector {
    /// Create a detector for one capture session
    #[must_use]
    pub const fn new(threshold: f32, silence_timeout: Duration) -> Self {
        Self {
            threshold,
            silence_timeout,
            silence: Duration::ZERO,
            speech_detected: false,
            peak_volume: 0.0,
        }
    }

    /// Feed one frame; returns whether the frame was voiced
    pub fn observe(&mut self, frame: &AudioFrame) -> bool {
        let volume = rms(frame.samples());
        self.peak_volume = self.peak_volume.max(volume);

        let voiced = volume >= self.threshold;
        if voiced {
            self.silence = Duration::ZERO;
            if !self.speech_detected {
                self.speech_detected = true;
                tracing::debug!(volume, "speech detected");
            }
        } else {
            self.silence += frame.duration();
        }

        voiced
    }

    /// Whether the end-of-utterance condition has been reached
    #[must_use]
    pub fn session_ended(&self) -> bool {
        self.speech_detected && self.silence >= self.silence_timeout
    }

    /// Whether any voiced frame has occurred this session
    #[must_use]
    pub const fn speech_detected(&self) -> bool {
        self.speech_detected
    }

    /// Continuous silence since the last voiced frame
    #[must_use]
    pub const fn silence_duration(&self) -> Duration {
        self.silence
    }

    /// Loudest RMS volume seen this session (display only)
    #[must_use]
    pub const fn peak_volume(&self) -> f32 {
        self.peak_volume
    }

    /// Normalize a volume reading against the session peak for a live meter.
    /// Presentation only.
    #[must_use]
    pub fn display_fraction(&self, volume: f32) -> f32 {
        (volume / self.peak_volume.max(self.threshold)).clamp(0.0, 1.0)
    }
}

/// RMS energy of a sample buffer
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::SAMPLE_RATE;

    fn frame(amplitude: f32, duration_secs: f32) -> AudioFrame {
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let n = (SAMPLE_RATE as f32 * duration_secs) as usize;
        AudioFrame::new(vec![amplitude; n], SAMPLE_RATE, 1)
    }

    #[test]
    fn rms_of_silence_is_zero() {
        assert!(rms(&vec![0.0f32; 160]) < 1e-6);
        assert!(rms(&[]) < 1e-6);
    }

    #[test]
    fn silence_only_session_never_ends() {
        let mut vad = VoiceActivityDetector::new(0.01, Duration::from_secs(5));

        // 6 s of pure silence, well past the timeout
        for _ in 0..60 {
            vad.observe(&frame(0.0, 0.1));
        }

        assert!(!vad.speech_detected());
        assert!(!vad.session_ended());
    }

    #[test]
    fn voiced_then_silence_ends_session() {
        let mut vad = VoiceActivityDetector::new(0.01, Duration::from_secs(5));

        assert!(vad.observe(&frame(0.5, 0.1)));
        assert!(vad.speech_detected());

        // 4.9 s of silence: not yet
        for _ in 0..49 {
            vad.observe(&frame(0.0, 0.1));
        }
        assert!(!vad.session_ended());

        // crossing 5.0 s ends it
        vad.observe(&frame(0.0, 0.1));
        assert!(vad.session_ended());
    }

    #[test]
    fn voiced_frame_resets_silence_counter() {
        let mut vad = VoiceActivityDetector::new(0.01, Duration::from_secs(5));

        vad.observe(&frame(0.5, 0.1));
        for _ in 0..30 {
            vad.observe(&frame(0.0, 0.1));
        }
        assert_eq!(vad.silence_duration(), Duration::from_secs(3));

        vad.observe(&frame(0.5, 0.1));
        assert_eq!(vad.silence_duration(), Duration::ZERO);
    }

    #[test]
    fn peak_volume_never_changes_decision() {
        let mut vad = VoiceActivityDetector::new(0.01, Duration::from_secs(5));

        // A very loud frame raises the peak
        vad.observe(&frame(0.9, 0.1));
        assert!(vad.peak_volume() > 0.8);

        // A quiet-but-voiced frame still counts as voiced against the fixed
        // threshold even though it is far below the peak
        assert!(vad.observe(&frame(0.02, 0.1)));
    }

    #[test]
    fn display_fraction_is_clamped() {
        let mut vad = VoiceActivityDetector::new(0.01, Duration::from_secs(5));
        vad.observe(&frame(0.5, 0.1));

        assert!(vad.display_fraction(0.25) <= 1.0);
        assert!(vad.display_fraction(0.0) >= 0.0);
        assert!(vad.display_fraction(2.0) <= 1.0);
    }
}
