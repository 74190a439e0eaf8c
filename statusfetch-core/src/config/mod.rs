//! Configuration module for statusfetch.
//!
//! Installer settings come from defaults, an optional JSON file and
//! environment overrides.

mod settings;

pub use settings::{
    InstallerConfig, CONFIG_ENV, DEFAULT_BINARY_NAME, DEFAULT_RELEASE_BASE_URL,
    DEFAULT_REPOSITORY,
};
