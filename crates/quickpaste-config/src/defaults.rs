// Defaults and constants for the persisted hotkey table

/// Config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Managed image directory, created next to the config file.
pub const IMAGES_DIR: &str = "images";

/// Delay applied to actions stored without one.
pub const LEGACY_DELAY_SECS: f64 = 0.5;

// Recommended per-kind delays for newly composed steps
pub(crate) const TEXT_DELAY_SECS: f64 = 0.3;
pub(crate) const KEY_DELAY_SECS: f64 = 0.1;
pub(crate) const IMAGE_DELAY_SECS: f64 = 1.5;

// Serde default functions
pub(crate) const fn default_delay() -> f64 {
    LEGACY_DELAY_SECS
}
