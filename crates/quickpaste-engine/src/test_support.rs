//! Test support utilities for quickpaste-engine unit and integration tests.
//! These helpers are public so the integration suite can share them; they are
//! intended for use by the test suite only.

use std::{
    env, fs,
    path::PathBuf,
    process,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use keychord::{Chord, Modifier};
use parking_lot::Mutex;
use tokio::time::{Instant, timeout};

use crate::{
    Error, Result, SequencePlayer, Status, StatusReceiver,
    player::{ClipboardSink, ImageFrame, KeySender},
};

/// One recorded side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Text placed on the clipboard.
    Text(String),
    /// Image placed on the clipboard.
    Image {
        /// Width in pixels.
        width: usize,
        /// Height in pixels.
        height: usize,
    },
    /// Chord sent, in canonical form.
    Keys(String),
}

/// Shared log of side effects with the (tokio) time each happened.
#[derive(Clone, Default)]
pub struct Recorder {
    /// Effects in the order they happened.
    log: Arc<Mutex<Vec<(Instant, Effect)>>>,
    /// When set, clipboard writes fail.
    fail_clipboard: Arc<AtomicBool>,
}

impl Recorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// A clipboard that records into this recorder.
    pub fn clipboard(&self) -> RecordingClipboard {
        RecordingClipboard {
            rec: self.clone(),
        }
    }

    /// A key sender that records into this recorder.
    pub fn keys(&self) -> RecordingKeys {
        RecordingKeys { rec: self.clone() }
    }

    /// A player wired to this recorder, pasting with `ctrl+v` on every platform.
    pub fn player(&self) -> SequencePlayer {
        SequencePlayer::new(Box::new(self.clipboard()), Box::new(self.keys()))
            .with_paste_chord(Chord::new(&[Modifier::Control], "v"))
    }

    /// Make clipboard writes fail (or succeed again).
    pub fn fail_clipboard(&self, fail: bool) {
        self.fail_clipboard.store(fail, Ordering::SeqCst);
    }

    /// Recorded effects with timestamps.
    pub fn timed(&self) -> Vec<(Instant, Effect)> {
        self.log.lock().clone()
    }

    /// Recorded effects without timestamps.
    pub fn effects(&self) -> Vec<Effect> {
        self.log.lock().iter().map(|(_, e)| e.clone()).collect()
    }

    /// Append an effect stamped with the current tokio time.
    fn push(&self, effect: Effect) {
        self.log.lock().push((Instant::now(), effect));
    }
}

/// [`ClipboardSink`] that records writes.
pub struct RecordingClipboard {
    /// Destination log.
    rec: Recorder,
}

impl ClipboardSink for RecordingClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        if self.rec.fail_clipboard.load(Ordering::SeqCst) {
            return Err(Error::Clipboard("clipboard unavailable".into()));
        }
        self.rec.push(Effect::Text(text.to_string()));
        Ok(())
    }

    fn set_image(&mut self, image: ImageFrame) -> Result<()> {
        if self.rec.fail_clipboard.load(Ordering::SeqCst) {
            return Err(Error::Clipboard("clipboard unavailable".into()));
        }
        self.rec.push(Effect::Image {
            width: image.width,
            height: image.height,
        });
        Ok(())
    }
}

/// [`KeySender`] that records chords.
pub struct RecordingKeys {
    /// Destination log.
    rec: Recorder,
}

impl KeySender for RecordingKeys {
    fn send(&mut self, chord: &Chord) -> Result<()> {
        self.rec.push(Effect::Keys(chord.to_string()));
        Ok(())
    }
}

/// Create a unique, empty temporary directory.
pub fn temp_dir(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let dir = env::temp_dir().join(format!(
        "quickpaste-engine-{label}-{}-{nanos}",
        process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    let _ = fs::create_dir_all(&dir);
    dir
}

/// Receive status events until `pred` matches or `timeout_ms` elapses.
pub async fn recv_until<F>(rx: &mut StatusReceiver, timeout_ms: u64, mut pred: F) -> bool
where
    F: FnMut(&Status) -> bool,
{
    timeout(Duration::from_millis(timeout_ms), async {
        while let Some(status) = rx.recv().await {
            if pred(&status) {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false)
}

/// Drain status events until `count` sequences have finished, returning every
/// event seen. Gives up after `timeout_ms`.
pub async fn collect_until_idle(
    rx: &mut StatusReceiver,
    count: usize,
    timeout_ms: u64,
) -> Vec<Status> {
    let mut seen = Vec::new();
    let mut idle = 0;
    timeout(Duration::from_millis(timeout_ms), async {
        while let Some(status) = rx.recv().await {
            if matches!(status, Status::Idle { .. }) {
                idle += 1;
            }
            seen.push(status);
            if idle >= count {
                break;
            }
        }
    })
    .await
    .unwrap_or(());
    seen
}
