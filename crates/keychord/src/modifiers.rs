use serde::{Deserialize, Serialize};

/// Modifier keys recognised in a key combination.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Modifier {
    /// Control key.
    Control,
    /// Shift key.
    Shift,
    /// Alt, or Option on macOS.
    Alt,
    /// Command on macOS, the Windows key elsewhere.
    Super,
}

impl Modifier {
    /// All modifiers in canonical order.
    pub const CANONICAL: [Self; 4] = [Self::Control, Self::Shift, Self::Alt, Self::Super];

    /// Parses a modifier token, accepting common aliases (control, opt, option,
    /// cmd, command, win, meta). Case-insensitive. Returns `None` for anything
    /// that is not a modifier.
    pub fn from_spec(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "ctrl" | "control" => Some(Self::Control),
            "shift" => Some(Self::Shift),
            "alt" | "opt" | "option" => Some(Self::Alt),
            "super" | "cmd" | "command" | "win" | "meta" => Some(Self::Super),
            _ => None,
        }
    }

    /// Returns the canonical spec string for this modifier.
    pub fn to_spec(self) -> &'static str {
        match self {
            Self::Control => "ctrl",
            Self::Shift => "shift",
            Self::Alt => "alt",
            Self::Super => "super",
        }
    }

    /// Position of this modifier in the canonical order.
    pub(crate) fn rank(self) -> usize {
        match self {
            Self::Control => 0,
            Self::Shift => 1,
            Self::Alt => 2,
            Self::Super => 3,
        }
    }
}
