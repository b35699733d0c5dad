//! HTTP header generation.
//!
//! Composes two Bayesian networks, an *input* network choosing the
//! browser/OS/device/HTTP-version tuple and a *value* network producing the
//! header values conditioned on that tuple, and layers on constraint
//! relaxation, derived fields (Accept-Language, the sec-fetch block),
//! filtering, per-browser ordering, and key casing.
//!
//! # Modules
//!
//! - `browsers` - the browser-identifier grammar and request specs
//! - `casing` - pascalisation, sec-fetch tables, Accept-Language synthesis
//! - `order` - per-browser header ordering and browser detection
//! - `generator` - the [`HeaderGenerator`] pipeline itself

pub mod browsers;
pub mod casing;
pub mod generator;
pub mod order;

pub use browsers::{BrowserSpec, BrowserVersion, HttpBrowserObject};
pub use generator::{HeaderGenerationError, HeaderGenerator, HeaderRequest, RelaxedList};
pub use order::HeaderOrders;

/// Node holding the combined `<browser>/<version>|<http>` selector in the
/// input network.
pub const BROWSER_HTTP_NODE_NAME: &str = "*BROWSER_HTTP";
/// Operating-system selector node.
pub const OPERATING_SYSTEM_NODE_NAME: &str = "*OPERATING_SYSTEM";
/// Device-class selector node.
pub const DEVICE_NODE_NAME: &str = "*DEVICE";
/// Browser identifier (without HTTP version) as the value network sees it.
pub const BROWSER_NODE_NAME: &str = "*BROWSER";

/// Browsers the generator knows how to request.
pub const SUPPORTED_BROWSERS: &[&str] = &["chrome", "firefox", "safari", "edge"];
/// Operating systems the generator knows how to request.
pub const SUPPORTED_OPERATING_SYSTEMS: &[&str] = &["windows", "macos", "linux", "android", "ios"];
/// Device classes the generator knows how to request.
pub const SUPPORTED_DEVICES: &[&str] = &["desktop", "mobile"];
/// HTTP versions the generator knows how to request.
pub const SUPPORTED_HTTP_VERSIONS: &[&str] = &["1", "2"];
