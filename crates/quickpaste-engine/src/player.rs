//! Sequence playback.
//!
//! A [`SequencePlayer`] runs one action list end-to-end: each step's effect,
//! then the step's post-delay, strictly in order. Side effects go through the
//! [`ClipboardSink`] and [`KeySender`] traits so tests can record them.
//!
//! Every wait is a `tokio` timer raced against the player's cancellation
//! token. Cancellation ends playback after the current step.

use std::{path::Path, time::Duration};

use keychord::{Chord, Modifier};
use quickpaste_config::{Action, ActionKind};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::{Error, Result};

/// Wait between putting text on the clipboard and sending the paste chord.
pub const TEXT_SETTLE: Duration = Duration::from_millis(50);

/// Wait between putting an image on the clipboard and sending the paste chord.
pub const IMAGE_SETTLE: Duration = Duration::from_millis(100);

/// Decoded RGBA pixels ready for the clipboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFrame {
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
    /// Row-major RGBA8 bytes, `width * height * 4` long.
    pub rgba: Vec<u8>,
}

impl ImageFrame {
    /// Read and decode an image file.
    pub fn load(path: &Path) -> Result<Self> {
        let err = |message: String| Error::Image {
            path: path.to_path_buf(),
            message,
        };
        if !path.is_file() {
            return Err(err("file not found".into()));
        }
        let img = image::open(path).map_err(|e| err(e.to_string()))?.to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self {
            width: width as usize,
            height: height as usize,
            rgba: img.into_raw(),
        })
    }
}

/// Destination for clipboard writes.
pub trait ClipboardSink {
    /// Replace the clipboard contents with text.
    fn set_text(&mut self, text: &str) -> Result<()>;
    /// Replace the clipboard contents with an image.
    fn set_image(&mut self, image: ImageFrame) -> Result<()>;
}

/// Sender of synthetic key input.
pub trait KeySender {
    /// Press and release a chord: modifiers held while the keys are clicked.
    fn send(&mut self, chord: &Chord) -> Result<()>;
}

/// The chord that pastes in the focused application.
pub fn paste_chord() -> Chord {
    if cfg!(target_os = "macos") {
        Chord::new(&[Modifier::Super], "v")
    } else {
        Chord::new(&[Modifier::Control], "v")
    }
}

/// Outcome of one [`SequencePlayer::play`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayReport {
    /// Steps started.
    pub attempted: usize,
    /// Indices of steps that failed.
    pub failed: Vec<usize>,
}

impl PlayReport {
    /// Number of failed steps.
    pub fn failed_steps(&self) -> usize {
        self.failed.len()
    }
}

/// Plays action sequences against a clipboard and a key sender.
pub struct SequencePlayer {
    /// Clipboard writes.
    clipboard: Box<dyn ClipboardSink>,
    /// Synthetic input.
    keys: Box<dyn KeySender>,
    /// Chord sent after text and image steps.
    paste: Chord,
    /// Cancels pending waits on shutdown.
    cancel: CancellationToken,
}

impl SequencePlayer {
    /// Create a player using the platform paste chord.
    pub fn new(clipboard: Box<dyn ClipboardSink>, keys: Box<dyn KeySender>) -> Self {
        Self {
            clipboard,
            keys,
            paste: paste_chord(),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the cancellation token.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Replace the paste chord.
    pub fn with_paste_chord(mut self, chord: Chord) -> Self {
        self.paste = chord;
        self
    }

    /// Play every step in order. Failed steps are logged and skipped; this never fails.
    pub async fn play(&mut self, actions: &[Action]) -> PlayReport {
        let mut report = PlayReport::default();
        for (index, action) in actions.iter().enumerate() {
            if self.cancel.is_cancelled() {
                debug!(index, "playback_cancelled");
                break;
            }
            report.attempted += 1;
            trace!(index, kind = %action.kind, "step_start");
            if let Err(e) = self.step(action).await {
                warn!(index, kind = %action.kind, error = %e, "playback_step_failed");
                report.failed.push(index);
            }
            if !self.wait(action.delay()).await {
                debug!(index, "playback_cancelled");
                break;
            }
        }
        report
    }

    /// Perform one step's primary effect.
    async fn step(&mut self, action: &Action) -> Result<()> {
        match action.kind {
            ActionKind::Text => {
                self.clipboard.set_text(&action.value)?;
                self.settle(TEXT_SETTLE).await?;
                self.keys.send(&self.paste)
            }
            ActionKind::Key => {
                let chord = Chord::parse(&action.value)?;
                self.keys.send(&chord)
            }
            ActionKind::Image => {
                let frame = ImageFrame::load(Path::new(&action.value))?;
                self.clipboard.set_image(frame)?;
                self.settle(IMAGE_SETTLE).await?;
                self.keys.send(&self.paste)
            }
        }
    }

    /// Settle wait before a paste; fails if cancelled.
    async fn settle(&self, d: Duration) -> Result<()> {
        if self.wait(d).await {
            Ok(())
        } else {
            Err(Error::ShutDown)
        }
    }

    /// Sleep for `d`; returns false if cancelled first.
    async fn wait(&self, d: Duration) -> bool {
        if d.is_zero() {
            return !self.cancel.is_cancelled();
        }
        tokio::select! {
            _ = time::sleep(d) => true,
            _ = self.cancel.cancelled() => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::test_support::{Effect, Recorder, temp_dir};

    fn player(rec: &Recorder) -> SequencePlayer {
        SequencePlayer::new(Box::new(rec.clipboard()), Box::new(rec.keys()))
            .with_paste_chord(Chord::new(&[Modifier::Control], "v"))
    }

    #[tokio::test(start_paused = true)]
    async fn text_sets_clipboard_then_pastes_after_settle() {
        let rec = Recorder::new();
        let mut p = player(&rec);
        let report = p.play(&[Action::text("hello", 0.3)]).await;
        assert_eq!(report, PlayReport { attempted: 1, failed: vec![] });

        let log = rec.timed();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].1, Effect::Text("hello".into()));
        assert_eq!(log[1].1, Effect::Keys("ctrl+v".into()));
        assert_eq!(log[1].0 - log[0].0, TEXT_SETTLE);
    }

    #[tokio::test(start_paused = true)]
    async fn next_step_waits_for_delay() {
        let rec = Recorder::new();
        let mut p = player(&rec);
        p.play(&[Action::key("tab", 0.25), Action::key("shift+enter", 0.0)])
            .await;
        let log = rec.timed();
        assert_eq!(
            rec.effects(),
            vec![Effect::Keys("tab".into()), Effect::Keys("shift+enter".into())]
        );
        assert!(log[1].0 - log[0].0 >= Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn key_after_text_waits_for_text_delay() {
        let rec = Recorder::new();
        let mut p = player(&rec);
        let report = p
            .play(&[Action::text("A", 0.2), Action::key("enter", 0.1)])
            .await;
        assert_eq!(report.failed_steps(), 0);

        let log = rec.timed();
        let effects: Vec<Effect> = log.iter().map(|(_, e)| e.clone()).collect();
        assert_eq!(
            effects,
            vec![
                Effect::Text("A".into()),
                Effect::Keys("ctrl+v".into()),
                Effect::Keys("enter".into()),
            ]
        );
        assert_eq!(log[1].0 - log[0].0, TEXT_SETTLE);
        assert!(log[2].0 - log[1].0 >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn failing_steps_are_skipped() {
        let rec = Recorder::new();
        let mut p = player(&rec);
        let report = p
            .play(&[
                Action::image("/no/such/image.png", 0.1),
                Action::key("ctrl+shift", 0.1),
                Action::text("after", 0.1),
            ])
            .await;
        assert_eq!(report.attempted, 3);
        assert_eq!(report.failed, vec![0, 1]);
        assert_eq!(
            rec.effects(),
            vec![Effect::Text("after".into()), Effect::Keys("ctrl+v".into())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn clipboard_failure_skips_paste() {
        let rec = Recorder::new();
        rec.fail_clipboard(true);
        let mut p = player(&rec);
        let report = p.play(&[Action::text("x", 0.0), Action::key("esc", 0.0)]).await;
        assert_eq!(report.failed, vec![0]);
        assert_eq!(rec.effects(), vec![Effect::Keys("esc".into())]);
    }

    #[tokio::test(start_paused = true)]
    async fn image_is_decoded_and_pasted() {
        let dir = temp_dir("player-image");
        let path = dir.join("dot.png");
        image::RgbaImage::from_pixel(2, 3, image::Rgba([1, 2, 3, 255]))
            .save(&path)
            .expect("write png");

        let rec = Recorder::new();
        let mut p = player(&rec);
        let report = p.play(&[Action::image(path.to_string_lossy(), 0.0)]).await;
        assert!(report.failed.is_empty());
        let log = rec.timed();
        assert_eq!(log[0].1, Effect::Image { width: 2, height: 3 });
        assert_eq!(log[1].1, Effect::Keys("ctrl+v".into()));
        assert_eq!(log[1].0 - log[0].0, IMAGE_SETTLE);
        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_after_current_step() {
        let rec = Recorder::new();
        let cancel = CancellationToken::new();
        let mut p = player(&rec).with_cancel(cancel.clone());
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(500)).await;
            cancel.cancel();
        });
        let report = p
            .play(&[Action::key("a", 10.0), Action::key("b", 0.0)])
            .await;
        assert_eq!(report.attempted, 1);
        assert_eq!(rec.effects(), vec![Effect::Keys("a".into())]);
    }

    #[test]
    fn paste_chord_uses_platform_modifier() {
        let chord = paste_chord();
        assert_eq!(chord.keys, vec!["v".to_string()]);
        assert_eq!(chord.modifiers.len(), 1);
    }
}
