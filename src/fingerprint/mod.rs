//! Browser fingerprint generation.
//!
//! Builds on [`crate::headers`]: every fingerprint is sampled with its
//! `userAgent` node pinned to the User-Agent of a freshly generated header
//! set, so the two surfaces of a client always agree.
//!
//! # Modules
//!
//! - `types` - the structured fingerprint surface and screen constraints
//! - `generator` - the [`FingerprintGenerator`] flow

pub mod generator;
pub mod types;

pub use generator::{FingerprintError, FingerprintGenerator, FingerprintRequest};
pub use types::{
    BatteryFingerprint, Fingerprint, FingerprintWithHeaders, NavigatorFingerprint,
    ScreenConstraints, ScreenFingerprint, VideoCard,
};

/// The fingerprint network's screen-configuration node.
pub const SCREEN_NODE_NAME: &str = "screen";
/// The fingerprint network's user-agent node.
pub const USER_AGENT_NODE_NAME: &str = "userAgent";
