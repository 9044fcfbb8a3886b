//! Queue workers for the speak pipeline
//!
//! Single-consumer FIFO discipline is the ordering guarantee: the synthesis
//! worker drains sentences strictly in arrival order, the playback worker
//! drains clips strictly in arrival order and blocks until each clip has
//! finished playing. A slow synthesis therefore can never be overtaken: its
//! clip cannot reach the clip queue out of sequence.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;

use crate::text::strip_markup;
use crate::voice::{ClipPlayer, Synthesizer};

/// One sentence queued for synthesis, in strict generation order
#[derive(Debug, Clone)]
pub struct SynthesisJob {
    /// Sentence text, markup still present (stripped by the worker)
    pub sentence: String,

    /// Position in the generation stream
    pub sequence: u64,
}

/// One synthesized clip awaiting playback. Consumed exactly once, then the
/// temp file is deleted.
#[derive(Debug)]
pub struct AudioClip {
    /// Temp file holding the rendered audio
    pub path: PathBuf,

    /// Sequence number carried over from the synthesis job
    pub sequence: u64,
}

/// Files created by this session that have not been deleted yet
pub(crate) type ClipRegistry = Arc<Mutex<HashSet<PathBuf>>>;

/// Build a collision-free clip path inside the shared temp directory.
///
/// Multiple sessions share one temp dir; unix-millis plus a random suffix is
/// the only isolation mechanism, so both components are required.
fn unique_clip_path(temp_dir: &std::path::Path) -> PathBuf {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let id = uuid::Uuid::new_v4().simple().to_string();
    let suffix = &id[..8];
    temp_dir.join(format!("clip_{millis}_{suffix}.mp3"))
}

/// Drain the sentence queue in arrival order, rendering each sentence to a
/// uniquely named temp file and forwarding the clip with its sequence number.
///
/// Terminates when the sentence channel closes, after draining remaining
/// work. Dropping the clip sender then lets the playback worker drain and
/// stop in turn.
pub(crate) async fn run_synthesis_worker(
    mut jobs: mpsc::Receiver<SynthesisJob>,
    clips: mpsc::Sender<AudioClip>,
    synthesizer: Arc<dyn Synthesizer>,
    temp_dir: PathBuf,
    registry: ClipRegistry,
    discard: Arc<AtomicBool>,
) {
    while let Some(job) = jobs.recv().await {
        if discard.load(Ordering::SeqCst) {
            tracing::warn!(
                sequence = job.sequence,
                sentence = %job.sentence,
                "discarding queued sentence"
            );
            continue;
        }

        let text = strip_markup(&job.sentence);
        let text = text.trim();
        if text.is_empty() {
            tracing::debug!(sequence = job.sequence, "sentence empty after markup strip");
            continue;
        }

        let audio = match synthesizer.synthesize(text).await {
            Ok(audio) => audio,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    sequence = job.sequence,
                    sentence = %job.sentence,
                    "synthesis failed, sentence dropped"
                );
                continue;
            }
        };

        let path = unique_clip_path(&temp_dir);
        if let Err(e) = tokio::fs::write(&path, &audio).await {
            tracing::warn!(
                error = %e,
                path = %path.display(),
                sequence = job.sequence,
                "failed to write clip, sentence dropped"
            );
            continue;
        }
        if let Ok(mut files) = registry.lock() {
            files.insert(path.clone());
        }

        tracing::debug!(
            sequence = job.sequence,
            bytes = audio.len(),
            path = %path.display(),
            "clip rendered"
        );

        let clip = AudioClip {
            path,
            sequence: job.sequence,
        };
        if let Err(e) = clips.send(clip).await {
            // Playback side is gone; clean up the orphaned file ourselves
            let clip = e.0;
            tracing::warn!(sequence = clip.sequence, "clip queue closed, discarding clip");
            remove_clip_file(&clip.path, &registry);
            break;
        }
    }

    tracing::debug!("synthesis worker stopped");
}

/// Drain the clip queue in strict FIFO order on a dedicated blocking thread.
///
/// Each clip is played to completion before the next is dequeued, then its
/// temp file is deleted regardless of playback outcome.
pub(crate) fn run_playback_worker(
    mut clips: mpsc::Receiver<AudioClip>,
    mut player: Box<dyn ClipPlayer>,
    registry: ClipRegistry,
    discard: Arc<AtomicBool>,
) {
    while let Some(clip) = clips.blocking_recv() {
        if discard.load(Ordering::SeqCst) {
            tracing::warn!(sequence = clip.sequence, "discarding unplayed clip");
        } else if let Err(e) = player.play(&clip.path) {
            tracing::error!(
                error = %e,
                sequence = clip.sequence,
                path = %clip.path.display(),
                "clip playback failed"
            );
        }

        // Deleted exactly once, played or not
        remove_clip_file(&clip.path, &registry);
    }

    tracing::debug!("playback worker stopped");
}

/// Delete a clip file and drop it from the session registry
pub(crate) fn remove_clip_file(path: &std::path::Path, registry: &ClipRegistry) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!(error = %e, path = %path.display(), "failed to delete clip file");
    }
    if let Ok(mut files) = registry.lock() {
        files.remove(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_paths_are_unique() {
        let dir = std::env::temp_dir();
        let mut seen = HashSet::new();
        for _ in 0..100 {
            assert!(seen.insert(unique_clip_path(&dir)));
        }
    }

    #[test]
    fn clip_path_shape() {
        let path = unique_clip_path(std::path::Path::new("/tmp/x"));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("clip_"));
        assert!(name.ends_with(".mp3"));
    }
}
