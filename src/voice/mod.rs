//! Voice processing module
//!
//! Audio capture, voice activity detection, segment accumulation,
//! speech-to-text, text-to-speech, and playback.

mod capture;
mod playback;
mod segment;
mod stt;
mod tts;
mod vad;

pub use capture::{AudioCapture, AudioFrame, FRAME_SAMPLES, SAMPLE_RATE, samples_to_wav};
pub use playback::{AudioPlayback, ClipPlayer};
pub use segment::{AudioSegment, SegmentAccumulator};
pub use stt::{Recognizer, SpeechToText};
pub use tts::{Synthesizer, TextToSpeech};
pub use vad::{VoiceActivityDetector, rms};
