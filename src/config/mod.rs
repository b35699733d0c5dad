//! Configuration module for fingerprint-forge.
//!
//! This module provides configuration management for the generators,
//! including:
//! - Loading settings from files (TOML/JSON)
//! - Environment variable overrides
//! - Validation and defaults
//!
//! # Example
//!
//! ```rust,no_run
//! use fingerprint_forge::config::ForgeSettings;
//!
//! // Create with defaults
//! let settings = ForgeSettings::default();
//!
//! // Load from a specific file
//! let settings = ForgeSettings::from_file("forge.toml").unwrap();
//!
//! // Override with environment variables
//! let settings = settings.apply_env_overrides().unwrap();
//! ```

mod settings;

pub use settings::{ConfigError, ForgeSettings};
