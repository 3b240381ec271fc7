use std::{fmt, path::Path, result::Result as StdResult, time::Duration};

use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    Error, Result,
    defaults::{self, IMAGE_DELAY_SECS, KEY_DELAY_SECS, TEXT_DELAY_SECS},
};

/// What a playback step does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Paste literal text through the clipboard.
    Text,
    /// Send a key or key combination.
    Key,
    /// Paste an image file through the clipboard.
    Image,
}

impl ActionKind {
    /// Suggested post-step delay when composing a new step of this kind.
    ///
    /// Only a hint for editors; playback uses whatever delay the action carries.
    pub const fn recommended_delay(self) -> f64 {
        match self {
            Self::Text => TEXT_DELAY_SECS,
            Self::Key => KEY_DELAY_SECS,
            Self::Image => IMAGE_DELAY_SECS,
        }
    }

    /// Lowercase name as persisted.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Key => "key",
            Self::Image => "image",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clamp stored delays to a finite, non-negative value.
fn de_delay<'de, D>(deserializer: D) -> StdResult<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    Ok(if raw.is_finite() && raw > 0.0 { raw } else { 0.0 })
}

/// A single playback step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Step kind, persisted as `type` (`kind` accepted on load).
    #[serde(rename = "type", alias = "kind")]
    pub kind: ActionKind,
    /// Literal text, key spec, or image path depending on `kind`.
    pub value: String,
    /// Seconds to wait after the step's effect.
    #[serde(
        rename = "delay",
        alias = "delay_seconds",
        default = "defaults::default_delay",
        deserialize_with = "de_delay"
    )]
    pub delay_seconds: f64,
}

impl Action {
    /// Create an action with an explicit delay (negative values clamp to zero).
    pub fn new(kind: ActionKind, value: impl Into<String>, delay_seconds: f64) -> Self {
        Self {
            kind,
            value: value.into(),
            delay_seconds: if delay_seconds.is_finite() {
                delay_seconds.max(0.0)
            } else {
                0.0
            },
        }
    }

    /// Create an action using the kind's recommended delay.
    pub fn recommended(kind: ActionKind, value: impl Into<String>) -> Self {
        Self::new(kind, value, kind.recommended_delay())
    }

    /// Text step.
    pub fn text(value: impl Into<String>, delay_seconds: f64) -> Self {
        Self::new(ActionKind::Text, value, delay_seconds)
    }

    /// Key step.
    pub fn key(value: impl Into<String>, delay_seconds: f64) -> Self {
        Self::new(ActionKind::Key, value, delay_seconds)
    }

    /// Image step.
    pub fn image(value: impl Into<String>, delay_seconds: f64) -> Self {
        Self::new(ActionKind::Image, value, delay_seconds)
    }

    /// Post-step delay as a `Duration`, saturating for absurdly large values.
    pub fn delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay_seconds).unwrap_or(Duration::MAX)
    }

    /// Check the data model invariants for a step about to be saved.
    ///
    /// Text and Key values must be non-empty (whitespace is a valid value);
    /// Image values must name an existing file.
    pub fn check(&self, index: usize) -> Result<()> {
        let message = match self.kind {
            ActionKind::Text | ActionKind::Key if self.value.is_empty() => {
                format!("{} step has an empty value", self.kind)
            }
            ActionKind::Image if !Path::new(&self.value).is_file() => {
                format!("image file not found: {}", self.value)
            }
            _ => return Ok(()),
        };
        Err(Error::InvalidAction { index, message })
    }
}

/// One configured chord: a label plus the ordered steps it plays.
///
/// The normalized key combo is the table key, not a field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HotkeyBinding {
    /// Free-text label.
    #[serde(default)]
    pub tag: String,
    /// Ordered playback steps.
    pub actions: Vec<Action>,
}

impl HotkeyBinding {
    /// Create a binding from a tag and steps.
    pub fn new(tag: impl Into<String>, actions: Vec<Action>) -> Self {
        Self {
            tag: tag.into(),
            actions,
        }
    }

    /// Create an untagged binding.
    pub fn untagged(actions: Vec<Action>) -> Self {
        Self::new(String::new(), actions)
    }
}
