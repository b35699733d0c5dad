//! # fingerprint-forge
//!
//! Statistically realistic browser fingerprint and HTTP header generation,
//! backed by Bayesian networks trained on real traffic.
//!
//! The crate's core is a *joint sampler*: two networks, one over input
//! selectors (browser, operating system, device, HTTP version) and one over
//! header or fingerprint values, stitched together by constraint
//! propagation and backtracking constrained sampling, so every generated
//! tuple is mutually consistent.
//!
//! ## Features
//!
//! - **Bayesian-network engine**: compressed CPT trees, weighted sampling,
//!   backtracking search, and whitelist propagation
//! - **Header generation**: browser/OS/device constraints, HTTP/1 and
//!   HTTP/2 casing, sec-fetch injection, per-browser header ordering
//! - **Fingerprint generation**: screen-constrained sampling pinned to the
//!   generated User-Agent
//! - **Deterministic sampling**: per-generator seedable PRNGs
//! - **Flexible configuration**: TOML/JSON bundle settings with environment
//!   overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fingerprint_forge::headers::{BrowserSpec, HeaderGenerator, HeaderRequest};
//!
//! fn main() -> anyhow::Result<()> {
//!     let generator = HeaderGenerator::from_dir("./data")?;
//!
//!     let request = HeaderRequest::new()
//!         .with_browsers(vec![BrowserSpec::named("chrome").with_min_version(100)])
//!         .with_locales(vec!["en-US".to_string(), "en".to_string()]);
//!
//!     for (name, value) in generator.generate_headers(&request)? {
//!         println!("{name}: {value}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`bayesian`]: CPT trees, nodes, and the network sampler
//! - [`model`]: JSON/ZIP model loading
//! - [`headers`]: the header-generation pipeline
//! - [`fingerprint`]: the fingerprint-generation flow
//! - [`config`]: bundle settings
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                  fingerprint-forge                    │
//! ├───────────────────────────────────────────────────────┤
//! │   ┌───────────┐        ┌─────────────┐                │
//! │   │  headers  │◄───────┤ fingerprint │                │
//! │   └─────┬─────┘        └──────┬──────┘                │
//! │         │                     │                       │
//! │         ▼                     ▼                       │
//! │   ┌───────────────────────────────────┐   ┌────────┐  │
//! │   │           bayesian                │◄──┤ model  │  │
//! │   └───────────────────────────────────┘   └────────┘  │
//! │                     ▲                                 │
//! │                ┌────┴────┐                            │
//! │                │ config  │                            │
//! │                └─────────┘                            │
//! └───────────────────────────────────────────────────────┘
//! ```

// ============================================================================
// Crate Metadata
// ============================================================================

/// The crate version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Full version string including the name.
pub const FULL_VERSION: &str = concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));

/// Dataset sentinel: a sampled header or fingerprint field carrying this
/// value is dropped from the output.
pub const MISSING_VALUE_DATASET_TOKEN: &str = "*MISSING_VALUE*";

/// Prefix marking a sampled value whose remainder is a JSON payload encoded
/// as a string.
pub const STRINGIFIED_PREFIX: &str = "*STRINGIFIED*";

// ============================================================================
// Modules
// ============================================================================

/// The Bayesian-network engine: CPT trees, nodes, sampling, propagation.
pub mod bayesian;

/// Configuration management for bundle locations and generation defaults.
pub mod config;

/// Fingerprint generation on top of the header pipeline.
pub mod fingerprint;

/// The header-generation pipeline.
pub mod headers;

/// Network model loading from JSON documents and ZIP archives.
pub mod model;

// ============================================================================
// Re-exports for Convenience
// ============================================================================

// Engine types
pub use bayesian::{Assignment, Constraints, CptTree, Network, Node};

// Header types
pub use headers::{
    BrowserSpec, BrowserVersion, HeaderGenerationError, HeaderGenerator, HeaderOrders,
    HeaderRequest, HttpBrowserObject, RelaxedList,
};

// Fingerprint types
pub use fingerprint::{
    Fingerprint, FingerprintError, FingerprintGenerator, FingerprintRequest,
    FingerprintWithHeaders, ScreenConstraints,
};

// Model and config types
pub use config::{ConfigError, ForgeSettings};
pub use model::ModelError;

// ============================================================================
// Prelude Module
// ============================================================================

/// Prelude module for convenient imports.
///
/// ```rust
/// use fingerprint_forge::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::ForgeSettings;
    pub use crate::fingerprint::{
        FingerprintGenerator, FingerprintRequest, FingerprintWithHeaders, ScreenConstraints,
    };
    pub use crate::headers::{BrowserSpec, HeaderGenerator, HeaderRequest};
    pub use crate::{FULL_VERSION, NAME, VERSION};
}
