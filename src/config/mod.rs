//! Configuration Module
//!
//! Generator settings (every fixed path in one struct) and the key casing
//! table applied to the generated OpenSSH config.

pub mod casing;
pub mod settings;

pub use casing::{KeyCasingLookup, CASING_SECTION};
pub use settings::{config_dir, default_live_config_path, settings_file, Settings};
