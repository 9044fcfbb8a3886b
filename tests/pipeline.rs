//! Speak-pipeline integration tests
//!
//! Exercises the sentence → synthesis → playback pipeline with fake engines,
//! so ordering, drain, discard, and temp-file invariants are verified without
//! audio hardware or network access.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use vocalink::voice::{ClipPlayer, Recognizer, Synthesizer};
use vocalink::{AudioSegment, Config, Result, VoiceSession};

/// Recognizer stub; the speak pipeline never calls it
struct NoopRecognizer;

#[async_trait]
impl Recognizer for NoopRecognizer {
    async fn transcribe(&self, _segment: AudioSegment) -> Result<String> {
        Ok(String::new())
    }
}

/// Synthesizer that sleeps a per-sentence latency, then emits the sentence
/// text as the "audio" payload so the player can recover it
struct FakeSynthesizer {
    latency: fn(&str) -> Duration,
}

#[async_trait]
impl Synthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        tokio::time::sleep((self.latency)(text)).await;
        Ok(text.as_bytes().to_vec())
    }
}

/// Player that records the recovered sentence of every clip it plays
struct RecordingPlayer {
    played: Arc<Mutex<Vec<String>>>,
}

impl ClipPlayer for RecordingPlayer {
    fn play(&mut self, path: &Path) -> Result<()> {
        let text = std::fs::read_to_string(path)?;
        self.played.lock().unwrap().push(text);
        Ok(())
    }
}

fn test_config(temp_dir: &Path) -> Config {
    let mut config = Config::default();
    config.pipeline.temp_dir = temp_dir.to_path_buf();
    config
}

fn build_session(
    temp_dir: &Path,
    latency: fn(&str) -> Duration,
) -> (VoiceSession, Arc<Mutex<Vec<String>>>) {
    let played = Arc::new(Mutex::new(Vec::new()));
    let session = VoiceSession::new(
        Arc::new(NoopRecognizer),
        Arc::new(FakeSynthesizer { latency }),
        Box::new(RecordingPlayer {
            played: Arc::clone(&played),
        }),
        test_config(temp_dir),
    )
    .expect("session");
    (session, played)
}

fn leftover_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

#[tokio::test]
async fn playback_order_matches_enqueue_order_despite_latency() {
    let dir = tempfile::tempdir().unwrap();

    // The first sentence synthesizes far slower than the rest; FIFO
    // discipline still forces it to play first
    let (session, played) = build_session(dir.path(), |text| {
        if text.contains("slow") {
            Duration::from_millis(300)
        } else {
            Duration::from_millis(10)
        }
    });

    let mut speaker = session.speaker();
    speaker.push("A slow opener. Quick middle. Quick ending.");
    speaker.finish();

    session.stop().await;

    assert_eq!(
        *played.lock().unwrap(),
        vec!["A slow opener.", "Quick middle.", "Quick ending."]
    );
    assert_eq!(leftover_files(dir.path()), 0, "temp dir must end empty");
}

#[tokio::test]
async fn streamed_deltas_play_in_generation_order() {
    let dir = tempfile::tempdir().unwrap();
    let (session, played) = build_session(dir.path(), |_| Duration::from_millis(5));

    let mut speaker = session.speaker();
    speaker.push("Hel");
    speaker.push("lo. Wor");
    speaker.push("ld! And a trailing fragment");
    speaker.finish();

    session.stop().await;

    assert_eq!(
        *played.lock().unwrap(),
        vec!["Hello.", "World!", "And a trailing fragment"]
    );
    assert_eq!(leftover_files(dir.path()), 0);
}

#[tokio::test]
async fn markup_is_not_vocalized() {
    let dir = tempfile::tempdir().unwrap();
    let (session, played) = build_session(dir.path(), |_| Duration::from_millis(1));

    session.speak("**bold** *italic* `code` - item.");
    session.stop().await;

    assert_eq!(*played.lock().unwrap(), vec!["bold italic code item."]);
}

#[tokio::test]
async fn stop_drains_everything_enqueued() {
    let dir = tempfile::tempdir().unwrap();
    let (session, played) = build_session(dir.path(), |_| Duration::from_millis(20));

    session.speak("One. Two. Three. Four. Five.");
    session.stop().await;

    assert_eq!(played.lock().unwrap().len(), 5);
    assert_eq!(leftover_files(dir.path()), 0);
}

#[tokio::test]
async fn abort_discards_queued_work_and_leaves_no_files() {
    let dir = tempfile::tempdir().unwrap();
    let (session, played) = build_session(dir.path(), |_| Duration::from_millis(500));

    session.speak("Never spoken one. Never spoken two. Never spoken three.");
    session.abort().await;

    // abort lands before the first (slow) synthesis completes, so nothing
    // reaches the speakers, and no clip file survives
    assert!(played.lock().unwrap().is_empty());
    assert_eq!(leftover_files(dir.path()), 0);
}

#[tokio::test]
async fn full_sentence_queue_rejects_overflow_without_blocking() {
    let dir = tempfile::tempdir().unwrap();

    let mut config = test_config(dir.path());
    config.pipeline.queue_capacity = 2;

    let played = Arc::new(Mutex::new(Vec::new()));
    let session = VoiceSession::new(
        Arc::new(NoopRecognizer),
        Arc::new(FakeSynthesizer {
            latency: |_| Duration::from_millis(50),
        }),
        Box::new(RecordingPlayer {
            played: Arc::clone(&played),
        }),
        config,
    )
    .unwrap();

    // On the current-thread test runtime the synthesis worker cannot run
    // between these enqueues, so the bounded queue accepts exactly two
    // sentences and rejects the rest
    session.speak("One. Two. Three. Four. Five.");
    session.stop().await;

    let played = played.lock().unwrap();
    assert_eq!(*played, vec!["One.", "Two."]);
    assert_eq!(leftover_files(dir.path()), 0);
}

#[tokio::test]
async fn engine_failure_skips_sentence_but_pipeline_continues() {
    struct FlakySynthesizer;

    #[async_trait]
    impl Synthesizer for FlakySynthesizer {
        async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
            if text.contains("broken") {
                Err(vocalink::Error::Tts("engine exploded".to_string()))
            } else {
                Ok(text.as_bytes().to_vec())
            }
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let played = Arc::new(Mutex::new(Vec::new()));
    let session = VoiceSession::new(
        Arc::new(NoopRecognizer),
        Arc::new(FlakySynthesizer),
        Box::new(RecordingPlayer {
            played: Arc::clone(&played),
        }),
        test_config(dir.path()),
    )
    .unwrap();

    session.speak("Good start. A broken middle. Good ending.");
    session.stop().await;

    // the failed sentence is skipped, later ones still play in order
    assert_eq!(*played.lock().unwrap(), vec!["Good start.", "Good ending."]);
    assert_eq!(leftover_files(dir.path()), 0);
}

#[tokio::test]
async fn sessions_sharing_a_temp_dir_do_not_collide() {
    let dir = tempfile::tempdir().unwrap();

    let (first, first_played) = build_session(dir.path(), |_| Duration::from_millis(5));
    let (second, second_played) = build_session(dir.path(), |_| Duration::from_millis(5));

    first.speak("First session speaks.");
    second.speak("Second session speaks.");

    first.stop().await;
    second.stop().await;

    assert_eq!(*first_played.lock().unwrap(), vec!["First session speaks."]);
    assert_eq!(*second_played.lock().unwrap(), vec!["Second session speaks."]);
    assert_eq!(leftover_files(dir.path()), 0);
}
