//! Voice session orchestration
//!
//! Owns the duplex pipeline: the capture/VAD/segmentation loop behind
//! [`VoiceSession::listen`], and the sentence→synthesis→playback pipeline
//! behind [`VoiceSession::speaker`]/[`VoiceSession::speak`]. The two paths
//! run independently of each other and of engine latency.
//!
//! All collaborators are injected at construction; the workers and queues
//! are wired before the session is handed out, never patched in afterwards.

mod workers;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Notify, mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};

use crate::config::Config;
use crate::text::SentenceSplitter;
use crate::voice::{
    AudioCapture, AudioPlayback, ClipPlayer, Recognizer, SAMPLE_RATE, SegmentAccumulator,
    SpeechToText, Synthesizer, TextToSpeech, VoiceActivityDetector, rms,
};
use crate::Result;

pub use workers::{AudioClip, SynthesisJob};

/// Capture poll cadence. Cancellation latency for the listen loop is bounded
/// by one tick.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Live input volume reading, for display only
#[derive(Debug, Clone, Copy, Default)]
pub struct InputLevel {
    /// RMS volume of the most recent frame
    pub volume: f32,

    /// Loudest RMS seen this session
    pub peak: f32,
}

/// A conversational voice session: one microphone listener plus one ordered
/// speak pipeline.
pub struct VoiceSession {
    recognizer: Arc<dyn Recognizer>,
    config: Config,
    sentence_tx: mpsc::Sender<SynthesisJob>,
    synthesis_handle: JoinHandle<()>,
    playback_handle: JoinHandle<()>,
    registry: workers::ClipRegistry,
    discard: Arc<AtomicBool>,
    sequence: Arc<AtomicU64>,
    cancel: Arc<Notify>,
    level_tx: watch::Sender<InputLevel>,
}

impl VoiceSession {
    /// Wire up a session from its collaborators.
    ///
    /// Spawns the synthesis worker (async) and the playback worker (dedicated
    /// blocking thread) immediately; both stay parked on their queues until
    /// work arrives. Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if the temp directory cannot be created
    pub fn new(
        recognizer: Arc<dyn Recognizer>,
        synthesizer: Arc<dyn Synthesizer>,
        player: Box<dyn ClipPlayer>,
        config: Config,
    ) -> Result<Self> {
        std::fs::create_dir_all(&config.pipeline.temp_dir)?;

        let capacity = config.pipeline.queue_capacity;
        let (sentence_tx, sentence_rx) = mpsc::channel::<SynthesisJob>(capacity);
        let (clip_tx, clip_rx) = mpsc::channel::<AudioClip>(capacity);

        let registry: workers::ClipRegistry = Arc::default();
        let discard = Arc::new(AtomicBool::new(false));

        let synthesis_handle = tokio::spawn(workers::run_synthesis_worker(
            sentence_rx,
            clip_tx,
            synthesizer,
            config.pipeline.temp_dir.clone(),
            Arc::clone(&registry),
            Arc::clone(&discard),
        ));

        let playback_registry = Arc::clone(&registry);
        let playback_discard = Arc::clone(&discard);
        let playback_handle = tokio::task::spawn_blocking(move || {
            workers::run_playback_worker(clip_rx, player, playback_registry, playback_discard);
        });

        let (level_tx, _) = watch::channel(InputLevel::default());

        Ok(Self {
            recognizer,
            config,
            sentence_tx,
            synthesis_handle,
            playback_handle,
            registry,
            discard,
            sequence: Arc::new(AtomicU64::new(0)),
            cancel: Arc::new(Notify::new()),
            level_tx,
        })
    }

    /// Build a session from configuration using the HTTP engines and the
    /// default output device.
    ///
    /// # Errors
    ///
    /// Returns error on invalid provider config or unavailable output device
    pub fn from_config(config: Config) -> Result<Self> {
        let recognizer = SpeechToText::from_config(&config.stt)?;
        let synthesizer = TextToSpeech::from_config(&config.tts)?;
        let player = AudioPlayback::new()?;

        Self::new(
            Arc::new(recognizer),
            Arc::new(synthesizer),
            Box::new(player),
            config,
        )
    }

    /// Run one voice-activity session against the microphone and return the
    /// recognized utterance.
    ///
    /// Frames are polled every 50 ms and fed through VAD and the
    /// segment accumulator; each full segment is transcribed concurrently so
    /// capture never waits on the engine. The session ends once speech has
    /// been heard and the silence timeout elapses, or on
    /// [`cancel_listen`](Self::cancel_listen); either way the partial tail
    /// segment still reaches the recognizer.
    ///
    /// Transcripts of all segments are concatenated in order. Engine failures
    /// are logged and their segments skipped, so the result may be empty;
    /// recoverable faults never surface as errors here.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Device`] only: the capture device could not
    /// be opened or started
    #[allow(clippy::future_not_send)] // cpal streams aren't Send
    pub async fn listen(&self) -> Result<String> {
        let mut capture = AudioCapture::new()?;
        capture.start()?;

        let mut vad = VoiceActivityDetector::new(
            self.config.listen.vad_threshold,
            self.config.listen.silence_timeout,
        );
        let mut accumulator =
            SegmentAccumulator::new(self.config.listen.segment_duration, SAMPLE_RATE);

        let mut tasks: JoinSet<(u64, Result<String>)> = JoinSet::new();
        let mut next_segment: u64 = 0;

        tracing::info!(
            threshold = self.config.listen.vad_threshold,
            silence_timeout_ms = self.config.listen.silence_timeout.as_millis(),
            "listening"
        );

        'session: loop {
            tokio::select! {
                () = self.cancel.notified() => {
                    tracing::info!("listen cancelled");
                    break 'session;
                }
                () = tokio::time::sleep(POLL_INTERVAL) => {
                    for frame in capture.take_frames() {
                        let volume = rms(frame.samples());
                        vad.observe(&frame);
                        self.level_tx.send_replace(InputLevel {
                            volume,
                            peak: vad.peak_volume(),
                        });

                        if let Some(segment) = accumulator.push(frame) {
                            self.spawn_transcription(&mut tasks, next_segment, segment);
                            next_segment += 1;
                        }
                    }

                    if vad.session_ended() {
                        tracing::info!(
                            silence_ms = vad.silence_duration().as_millis(),
                            "silence timeout reached"
                        );
                        break 'session;
                    }
                }
            }
        }

        capture.stop();

        // Flush the buffered tail so cancelled and timed-out sessions alike
        // get their last partial segment transcribed
        if let Some(segment) = accumulator.flush() {
            self.spawn_transcription(&mut tasks, next_segment, segment);
        }

        let mut transcripts: Vec<(u64, String)> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((sequence, Ok(text))) => {
                    let text = text.trim().to_string();
                    if !text.is_empty() {
                        transcripts.push((sequence, text));
                    }
                }
                Ok((sequence, Err(e))) => {
                    tracing::warn!(error = %e, segment = sequence, "segment skipped");
                }
                Err(e) => {
                    tracing::error!(error = %e, "transcription task failed");
                }
            }
        }

        transcripts.sort_unstable_by_key(|(sequence, _)| *sequence);
        let utterance = transcripts
            .into_iter()
            .map(|(_, text)| text)
            .collect::<Vec<_>>()
            .join(" ");

        tracing::info!(transcript = %utterance, "listen complete");
        Ok(utterance)
    }

    /// Transcribe a segment without blocking the capture loop
    fn spawn_transcription(
        &self,
        tasks: &mut JoinSet<(u64, Result<String>)>,
        sequence: u64,
        segment: crate::voice::AudioSegment,
    ) {
        let recognizer = Arc::clone(&self.recognizer);
        tasks.spawn(async move { (sequence, recognizer.transcribe(segment).await) });
    }

    /// End an in-progress [`listen`](Self::listen) within one poll tick
    pub fn cancel_listen(&self) {
        self.cancel.notify_one();
    }

    /// Subscribe to the live input-level readout. Presentation only.
    #[must_use]
    pub fn input_level(&self) -> watch::Receiver<InputLevel> {
        self.level_tx.subscribe()
    }

    /// Begin one response stream. Feed generation deltas through the returned
    /// handle; completed sentences are enqueued for synthesis as they appear.
    #[must_use]
    pub fn speaker(&self) -> ResponseSpeaker {
        ResponseSpeaker {
            splitter: SentenceSplitter::new(),
            tx: self.sentence_tx.clone(),
            sequence: Arc::clone(&self.sequence),
        }
    }

    /// Enqueue a complete text for vocalization and return immediately.
    ///
    /// Fire-and-forget: a full queue drops the overflow with a warning log,
    /// never an error.
    pub fn speak(&self, text: &str) {
        let mut speaker = self.speaker();
        speaker.push(text);
        speaker.finish();
    }

    /// Drain both queues, join both workers, and remove any remaining temp
    /// artifacts. Every sentence already enqueued completes playback.
    ///
    /// Outstanding [`ResponseSpeaker`] handles must be finished or dropped
    /// first, since they hold the sentence queue open.
    pub async fn stop(self) {
        tracing::debug!("stopping speak pipeline");
        self.teardown().await;
    }

    /// Tear down without playing queued work: remaining sentences and clips
    /// are discarded, each one logged, and their temp files removed.
    pub async fn abort(self) {
        tracing::debug!("aborting speak pipeline");
        self.discard.store(true, Ordering::SeqCst);
        self.teardown().await;
    }

    async fn teardown(self) {
        let Self {
            sentence_tx,
            synthesis_handle,
            playback_handle,
            registry,
            ..
        } = self;

        // Closing the sentence queue is the stop signal; each worker drains
        // then closes the next queue down
        drop(sentence_tx);

        let (synthesis, playback) = futures::future::join(synthesis_handle, playback_handle).await;
        if let Err(e) = synthesis {
            tracing::error!(error = %e, "synthesis worker panicked");
        }
        if let Err(e) = playback {
            tracing::error!(error = %e, "playback worker panicked");
        }

        // Normally empty by now; anything left means a worker died early
        let stragglers: Vec<_> = registry
            .lock()
            .map(|files| files.iter().cloned().collect())
            .unwrap_or_default();
        for path in stragglers {
            tracing::warn!(path = %path.display(), "removing leftover clip file");
            workers::remove_clip_file(&path, &registry);
        }

        tracing::info!("speak pipeline stopped");
    }
}

/// Streaming producer handle for one response.
///
/// Owns the single live sentence buffer for its stream; dropping the handle
/// without [`finish`](Self::finish) discards the unterminated tail.
pub struct ResponseSpeaker {
    splitter: SentenceSplitter,
    tx: mpsc::Sender<SynthesisJob>,
    sequence: Arc<AtomicU64>,
}

impl ResponseSpeaker {
    /// Feed one generation delta; enqueues every sentence it completes
    pub fn push(&mut self, delta: &str) {
        for sentence in self.splitter.push(delta) {
            enqueue_sentence(&self.tx, &self.sequence, sentence);
        }
    }

    /// End of stream: the remaining buffer is enqueued as a final sentence
    /// even without a terminating delimiter
    pub fn finish(self) {
        let Self {
            splitter,
            tx,
            sequence,
        } = self;
        if let Some(tail) = splitter.finish() {
            enqueue_sentence(&tx, &sequence, tail);
        }
    }
}

/// Enqueue one sentence with the next sequence number. Bounded-queue
/// overflow rejects the sentence and logs it, so producers never block and
/// nothing is dropped silently.
fn enqueue_sentence(tx: &mpsc::Sender<SynthesisJob>, sequence: &AtomicU64, sentence: String) {
    if sentence.trim().is_empty() {
        return;
    }

    let job = SynthesisJob {
        sentence,
        sequence: sequence.fetch_add(1, Ordering::SeqCst),
    };

    match tx.try_send(job) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(job)) => {
            tracing::warn!(
                sequence = job.sequence,
                sentence = %job.sentence,
                "sentence queue full, sentence dropped"
            );
        }
        Err(mpsc::error::TrySendError::Closed(job)) => {
            tracing::warn!(
                sequence = job.sequence,
                sentence = %job.sentence,
                "speak pipeline stopped, sentence dropped"
            );
        }
    }
}
