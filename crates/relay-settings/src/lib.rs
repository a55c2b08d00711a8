//! # relay-settings
//!
//! Configuration for the scan relay.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`RelaySettings::default()`]
//! 2. **Settings file**: optional JSON file, deep-merged over defaults
//! 3. **Environment variables**: `PORT`, `RELAY_*` overrides (highest priority)
//!
//! The token signing secret is kept out of the settings tree entirely and
//! read separately with [`loader::read_signing_secret`].

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    deep_merge, load_settings, load_settings_from_path, read_signing_secret, validate_settings,
};
pub use types::{AuthSettings, LoggingSettings, RelaySettings, ServerSettings};
