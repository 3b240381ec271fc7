//! keychord: key combination specs for quickpaste.
//!
//! - [`normalize`]: canonical string form of a combo, used as the hotkey table key.
//! - [`Modifier`]: modifier keys with aliases and a fixed canonical order.
//! - [`Chord`]: a parsed combo (modifiers plus key tokens) used when synthesizing input.
//!
//! Specs are `+`-separated, case-insensitive and whitespace-insensitive. The
//! canonical form lists modifiers first (`ctrl`, `shift`, `alt`, `super`), then
//! the remaining key tokens in the order they were written, all lowercase.

mod chord;
mod error;
mod modifiers;

pub use chord::{Chord, normalize};
pub use error::{Error, Result};
pub use modifiers::Modifier;
