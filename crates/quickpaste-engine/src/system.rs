//! Platform implementations of the player's side-effect traits.
//!
//! Both handles are created lazily on first use, which happens on the
//! executor thread, and dropped again after an error so the next step gets a
//! fresh connection.

use std::{borrow::Cow, result::Result as StdResult};

use arboard::{Clipboard, ImageData};
use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use keychord::{Chord, Modifier};
use tracing::{debug, trace};

use crate::{
    Error, Result,
    player::{ClipboardSink, ImageFrame, KeySender},
};

/// System clipboard through `arboard`.
#[derive(Default)]
pub struct SystemClipboard {
    /// Lazily opened clipboard handle.
    inner: Option<Clipboard>,
}

impl SystemClipboard {
    /// Create without touching the clipboard yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the clipboard, opening it if needed.
    fn with<T>(
        &mut self,
        f: impl FnOnce(&mut Clipboard) -> StdResult<T, arboard::Error>,
    ) -> Result<T> {
        if self.inner.is_none() {
            let cb = Clipboard::new().map_err(|e| Error::Clipboard(e.to_string()))?;
            debug!("clipboard_opened");
            self.inner = Some(cb);
        }
        let Some(cb) = self.inner.as_mut() else {
            return Err(Error::Clipboard("clipboard unavailable".into()));
        };
        match f(cb) {
            Ok(v) => Ok(v),
            Err(e) => {
                self.inner = None;
                Err(Error::Clipboard(e.to_string()))
            }
        }
    }
}

impl ClipboardSink for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        trace!(chars = text.chars().count(), "clipboard_set_text");
        self.with(|cb| cb.set_text(text))
    }

    fn set_image(&mut self, image: ImageFrame) -> Result<()> {
        trace!(width = image.width, height = image.height, "clipboard_set_image");
        self.with(|cb| {
            cb.set_image(ImageData {
                width: image.width,
                height: image.height,
                bytes: Cow::Owned(image.rgba),
            })
        })
    }
}

/// Map a key name from a chord to an `enigo` key.
///
/// Accepts the usual names (`enter`, `tab`, `esc`, arrows, `f1`..`f12`, ...)
/// and any single character.
pub fn key_for(name: &str) -> Option<Key> {
    let key = match name {
        "enter" | "return" => Key::Return,
        "tab" => Key::Tab,
        "backspace" => Key::Backspace,
        "space" => Key::Space,
        "esc" | "escape" => Key::Escape,
        "delete" | "del" => Key::Delete,
        "home" => Key::Home,
        "end" => Key::End,
        "pageup" => Key::PageUp,
        "pagedown" => Key::PageDown,
        "up" => Key::UpArrow,
        "down" => Key::DownArrow,
        "left" => Key::LeftArrow,
        "right" => Key::RightArrow,
        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Key::Unicode(c),
                _ => return None,
            }
        }
    };
    Some(key)
}

/// Modifier key held during a chord.
fn modifier_key(m: Modifier) -> Key {
    match m {
        Modifier::Control => Key::Control,
        Modifier::Shift => Key::Shift,
        Modifier::Alt => Key::Alt,
        Modifier::Super => Key::Meta,
    }
}

/// Synthetic keyboard input through `enigo`.
#[derive(Default)]
pub struct EnigoSender {
    /// Lazily created input connection.
    inner: Option<Enigo>,
}

impl EnigoSender {
    /// Create without connecting yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Input connection, created on first use.
    fn enigo(&mut self) -> Result<&mut Enigo> {
        if self.inner.is_none() {
            let enigo =
                Enigo::new(&Settings::default()).map_err(|e| Error::Input(e.to_string()))?;
            debug!("input_connection_opened");
            self.inner = Some(enigo);
        }
        self.inner
            .as_mut()
            .ok_or_else(|| Error::Input("input connection unavailable".into()))
    }
}

impl KeySender for EnigoSender {
    fn send(&mut self, chord: &Chord) -> Result<()> {
        let keys = chord
            .keys
            .iter()
            .map(|k| key_for(k).ok_or_else(|| Error::Input(format!("unknown key: {k}"))))
            .collect::<Result<Vec<Key>>>()?;
        trace!(%chord, "send_chord");
        let enigo = self.enigo()?;
        let mut result = Ok(());
        let mut pressed = Vec::new();
        for m in &chord.modifiers {
            let key = modifier_key(*m);
            if let Err(e) = enigo.key(key, Direction::Press) {
                result = Err(Error::Input(e.to_string()));
                break;
            }
            pressed.push(key);
        }
        if result.is_ok() {
            for key in &keys {
                if let Err(e) = enigo.key(*key, Direction::Click) {
                    result = Err(Error::Input(e.to_string()));
                    break;
                }
            }
        }
        // Modifiers are always released, even after a failed click.
        for key in pressed.into_iter().rev() {
            if let Err(e) = enigo.key(key, Direction::Release) {
                debug!(error = %e, "modifier_release_failed");
            }
        }
        if result.is_err() {
            self.inner = None;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_keys_map() {
        assert_eq!(key_for("enter"), Some(Key::Return));
        assert_eq!(key_for("esc"), Some(Key::Escape));
        assert_eq!(key_for("f5"), Some(Key::F5));
        assert_eq!(key_for("v"), Some(Key::Unicode('v')));
        assert_eq!(key_for("pageup"), Some(Key::PageUp));
        assert_eq!(key_for("+"), Some(Key::Unicode('+')));
    }

    #[test]
    fn unknown_names_do_not_map() {
        assert_eq!(key_for("hyper"), None);
        assert_eq!(key_for(""), None);
    }
}
