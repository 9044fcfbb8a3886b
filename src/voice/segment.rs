//! Segment accumulation for transcription
//!
//! Groups captured frames into bounded segments. Segments are disjoint: the
//! buffer is cleared on every flush, never grown cumulatively across flushes.

use std::time::Duration;

use crate::voice::AudioFrame;

/// An ordered run of frames submitted as one transcription unit.
///
/// Owned exclusively by the accumulator until handed to the recognizer, which
/// consumes it.
#[derive(Debug)]
pub struct AudioSegment {
    frames: Vec<AudioFrame>,
    sample_rate: u32,
}

impl AudioSegment {
    /// Total samples across all frames
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.frames.iter().map(|f| f.samples().len()).sum()
    }

    /// Wall-clock length of the segment
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.sample_count() as f64 / f64::from(self.sample_rate))
    }

    /// Sample rate of the segment
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Consume the segment into one contiguous sample buffer
    #[must_use]
    pub fn into_samples(self) -> Vec<f32> {
        let mut samples = Vec::with_capacity(self.sample_count());
        for frame in self.frames {
            samples.extend(frame.into_samples());
        }
        samples
    }
}

/// Buffers frames until a segment's worth of samples has accumulated
pub struct SegmentAccumulator {
    frames: Vec<AudioFrame>,
    buffered_samples: usize,
    capacity_samples: usize,
    sample_rate: u32,
}

impl SegmentAccumulator {
    /// Create an accumulator that flushes every `segment_duration` of audio
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn new(segment_duration: Duration, sample_rate: u32) -> Self {
        let capacity_samples = (segment_duration.as_secs_f64() * f64::from(sample_rate)) as usize;
        Self {
            frames: Vec::new(),
            buffered_samples: 0,
            capacity_samples: capacity_samples.max(1),
            sample_rate,
        }
    }

    /// Buffer one frame; returns a full segment once the sample threshold is
    /// reached. The internal buffer is cleared by the flush.
    pub fn push(&mut self, frame: AudioFrame) -> Option<AudioSegment> {
        self.buffered_samples += frame.samples().len();
        self.frames.push(frame);

        if self.buffered_samples >= self.capacity_samples {
            self.flush()
        } else {
            None
        }
    }

    /// Flush whatever is buffered, if anything. Used at stream end and on
    /// cancellation so the partial tail still reaches the recognizer.
    pub fn flush(&mut self) -> Option<AudioSegment> {
        if self.frames.is_empty() {
            return None;
        }

        let frames = std::mem::take(&mut self.frames);
        self.buffered_samples = 0;

        let segment = AudioSegment {
            frames,
            sample_rate: self.sample_rate,
        };
        tracing::debug!(
            samples = segment.sample_count(),
            duration_ms = segment.duration().as_millis(),
            "segment flushed"
        );
        Some(segment)
    }

    /// Whether nothing is currently buffered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::{FRAME_SAMPLES, SAMPLE_RATE};

    fn frame() -> AudioFrame {
        AudioFrame::new(vec![0.1; FRAME_SAMPLES], SAMPLE_RATE, 1)
    }

    #[test]
    fn flushes_at_sample_threshold() {
        // 3 s at 16 kHz = 48000 samples = 30 frames of 100 ms
        let mut acc = SegmentAccumulator::new(Duration::from_secs(3), SAMPLE_RATE);

        for _ in 0..29 {
            assert!(acc.push(frame()).is_none());
        }

        let segment = acc.push(frame()).expect("30th frame crosses threshold");
        assert_eq!(segment.sample_count(), 30 * FRAME_SAMPLES);
        assert!(acc.is_empty());
    }

    #[test]
    fn segments_are_disjoint() {
        let mut acc = SegmentAccumulator::new(Duration::from_secs(1), SAMPLE_RATE);

        let first = (0..10).find_map(|_| acc.push(frame())).unwrap();
        let second = (0..10).find_map(|_| acc.push(frame())).unwrap();

        // each flush carries exactly one segment's worth, not a growing total
        assert_eq!(first.sample_count(), 10 * FRAME_SAMPLES);
        assert_eq!(second.sample_count(), 10 * FRAME_SAMPLES);
    }

    #[test]
    fn flush_returns_partial_tail() {
        let mut acc = SegmentAccumulator::new(Duration::from_secs(3), SAMPLE_RATE);

        acc.push(frame());
        acc.push(frame());

        let tail = acc.flush().expect("partial tail");
        assert_eq!(tail.sample_count(), 2 * FRAME_SAMPLES);
        assert!(acc.flush().is_none());
    }

    #[test]
    fn into_samples_preserves_order() {
        let mut acc = SegmentAccumulator::new(Duration::from_millis(200), SAMPLE_RATE);

        acc.push(AudioFrame::new(vec![0.1; FRAME_SAMPLES], SAMPLE_RATE, 1));
        let segment = acc
            .push(AudioFrame::new(vec![0.2; FRAME_SAMPLES], SAMPLE_RATE, 1))
            .unwrap();

        let samples = segment.into_samples();
        assert_eq!(samples.len(), 2 * FRAME_SAMPLES);
        assert!((samples[0] - 0.1).abs() < f32::EPSILON);
        assert!((samples[FRAME_SAMPLES] - 0.2).abs() < f32::EPSILON);
    }
}
