//! Hotkey table model and persistence for quickpaste.
//!
//! - [`Action`] / [`HotkeyBinding`]: the persisted data model.
//! - [`HotkeyTable`]: the in-memory mapping from normalized combo to binding.
//! - [`ConfigStore`]: JSON load/save with migration of older schema variants,
//!   plus import of image files into the managed `images/` directory.
//! - [`auto_tag`]: derive a short label from an action sequence.

mod defaults;
mod error;
mod images;
mod raw;
mod store;
mod table;
mod tag;
mod types;

pub use defaults::{DEFAULT_CONFIG_FILE, IMAGES_DIR, LEGACY_DELAY_SECS};
pub use error::{Error, Result};
pub use raw::decode_entry;
pub use store::ConfigStore;
pub use table::HotkeyTable;
pub use tag::{TAG_MAX_CHARS, auto_tag};
pub use types::{Action, ActionKind, HotkeyBinding};
