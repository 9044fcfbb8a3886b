//! Vocalink - streaming duplex voice pipeline for AI assistants
//!
//! This library bridges a human speaker and a streaming text-generation
//! backend:
//! - Input path: microphone capture with voice-activity detection and
//!   segment-based speech-to-text
//! - Output path: incremental text split into sentences, each synthesized to
//!   a clip and played back strictly in generation order
//!
//! # Architecture
//!
//! ```text
//! device ─▶ AudioCapture ─▶ VAD ─▶ SegmentAccumulator ─▶ Recognizer ─▶ text
//!
//! text deltas ─▶ SentenceSplitter ─▶ [sentence queue]
//!                                          │ synthesis worker
//!                                          ▼
//!                                    [clip queue]
//!                                          │ playback worker (FIFO)
//!                                          ▼
//!                                   audible output
//! ```
//!
//! Both paths run concurrently and independently of engine latency. Chat
//! orchestration, history persistence, and transport are external
//! collaborators; this crate is the pipeline only.

pub mod config;
pub mod error;
pub mod session;
pub mod text;
pub mod voice;

pub use config::{Config, ListenConfig, PipelineConfig, SttConfig, TtsConfig};
pub use error::{Error, Result};
pub use session::{AudioClip, InputLevel, ResponseSpeaker, SynthesisJob, VoiceSession};
pub use text::{SentenceSplitter, strip_markup};
pub use voice::{
    AudioCapture, AudioFrame, AudioPlayback, AudioSegment, ClipPlayer, Recognizer,
    SegmentAccumulator, SpeechToText, Synthesizer, TextToSpeech, VoiceActivityDetector,
};
