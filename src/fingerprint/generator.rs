//! Fingerprint generation.
//!
//! Reuses the header pipeline as a subroutine: a screen-constrained request
//! first propagates through the fingerprint network to find the user-agents
//! that can carry such a screen, headers are generated against that
//! whitelist, and the fingerprint network is then sampled with its
//! `userAgent` node pinned to the User-Agent the headers actually carry.

use std::collections::HashSet;
use std::path::Path;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::bayesian::{Assignment, Constraints, Network};
use crate::config::ForgeSettings;
use crate::fingerprint::types::{
    BatteryFingerprint, Fingerprint, FingerprintWithHeaders, NavigatorFingerprint,
    ScreenConstraints, ScreenFingerprint, VideoCard,
};
use crate::fingerprint::{SCREEN_NODE_NAME, USER_AGENT_NODE_NAME};
use crate::headers::{HeaderGenerationError, HeaderGenerator, HeaderRequest};
use crate::model::ModelError;
use crate::{MISSING_VALUE_DATASET_TOKEN, STRINGIFIED_PREFIX};

/// Errors surfaced by fingerprint generation.
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// Header generation failed underneath.
    #[error(transparent)]
    Headers(#[from] HeaderGenerationError),

    /// The fingerprint network cannot satisfy the request.
    #[error("request constraints cannot be satisfied by the fingerprint network")]
    UnsatisfiableConstraints,

    /// A sampled value could not be interpreted.
    #[error("fingerprint sample could not be interpreted: {0}")]
    Malformed(String),

    /// A model could not be loaded or validated.
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// What a caller asks for: header constraints plus optional screen bounds.
#[derive(Debug, Clone, Default)]
pub struct FingerprintRequest {
    /// Constraints forwarded to header generation.
    pub headers: HeaderRequest,
    /// Bounds on the sampled screen dimensions.
    pub screen: Option<ScreenConstraints>,
}

impl FingerprintRequest {
    /// A request with every default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the header constraints.
    pub fn with_headers(mut self, headers: HeaderRequest) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the screen bounds.
    pub fn with_screen(mut self, screen: ScreenConstraints) -> Self {
        self.screen = Some(screen);
        self
    }
}

/// Generates browser fingerprints consistent with generated headers.
pub struct FingerprintGenerator {
    headers: HeaderGenerator,
    fingerprint_network: Network,
    rng: Mutex<StdRng>,
}

impl std::fmt::Debug for FingerprintGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FingerprintGenerator")
            .field("fingerprint_nodes", &self.fingerprint_network.nodes().len())
            .finish()
    }
}

impl FingerprintGenerator {
    /// Assembles a generator from already-loaded components.
    pub fn from_parts(headers: HeaderGenerator, fingerprint_network: Network) -> Self {
        Self {
            headers,
            fingerprint_network,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Loads a generator from a model bundle directory laid out per
    /// [`ForgeSettings`].
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, FingerprintError> {
        Self::from_settings(&ForgeSettings::new().with_data_dir(dir))
    }

    /// Loads a generator as configured.
    pub fn from_settings(settings: &ForgeSettings) -> Result<Self, FingerprintError> {
        let headers = HeaderGenerator::from_settings(settings)?;
        let fingerprint_network = Network::from_path(settings.fingerprint_network_path()?)?;
        let mut generator = Self::from_parts(headers, fingerprint_network);
        if let Some(seed) = settings.seed {
            generator = generator.with_seed(seed);
        }
        Ok(generator)
    }

    /// Replaces the default PRNGs (header and fingerprint side) with seeded
    /// ones.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.headers = self.headers.with_seed(seed);
        self.rng = Mutex::new(StdRng::seed_from_u64(seed.wrapping_add(1)));
        self
    }

    /// The wrapped header generator.
    pub fn header_generator(&self) -> &HeaderGenerator {
        &self.headers
    }

    /// Generates a fingerprint and its matching header set.
    pub fn generate_fingerprint(
        &self,
        request: &FingerprintRequest,
    ) -> Result<FingerprintWithHeaders, FingerprintError> {
        let strict = request.headers.strict;

        let mut screen_whitelist = match &request.screen {
            None => None,
            Some(constraints) => {
                let candidates = self.screen_candidates(constraints);
                if candidates.is_empty() {
                    if strict {
                        return Err(FingerprintError::UnsatisfiableConstraints);
                    }
                    warn!("no stored screen satisfies the requested bounds, ignoring them");
                    None
                } else {
                    Some(candidates)
                }
            }
        };

        let mut header_request = request.headers.clone();
        if let Some(whitelist) = &screen_whitelist {
            let propagated = self.fingerprint_network.possible_values(&Constraints::from([(
                SCREEN_NODE_NAME.to_string(),
                whitelist.clone(),
            )]));
            match propagated {
                Some(domains) => {
                    if let Some(user_agents) = domains.get(USER_AGENT_NODE_NAME) {
                        header_request.user_agents =
                            Some(user_agents.iter().cloned().collect());
                    }
                }
                None if strict => return Err(FingerprintError::UnsatisfiableConstraints),
                None => {
                    warn!("screen bounds contradict the fingerprint network, ignoring them");
                    screen_whitelist = None;
                }
            }
        }

        let headers = self.headers.generate_headers(&header_request)?;
        let user_agent = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("user-agent"))
            .map(|(_, value)| value.clone())
            .ok_or(HeaderGenerationError::MissingUserAgent)?;

        let mut constraints = Constraints::from([(
            USER_AGENT_NODE_NAME.to_string(),
            HashSet::from([user_agent.clone()]),
        )]);
        if let Some(whitelist) = screen_whitelist {
            constraints.insert(SCREEN_NODE_NAME.to_string(), whitelist);
        }

        let sample = {
            let mut rng = self.rng.lock();
            match self
                .fingerprint_network
                .sample_consistent(&mut *rng, &constraints)
            {
                Some(sample) => Some(sample),
                None if strict => return Err(FingerprintError::UnsatisfiableConstraints),
                None => {
                    debug!("screen-constrained sampling failed, retrying with the pin alone");
                    constraints.remove(SCREEN_NODE_NAME);
                    self.fingerprint_network
                        .sample_consistent(&mut *rng, &constraints)
                }
            }
        };
        let sample = sample.ok_or(FingerprintError::UnsatisfiableConstraints)?;

        let fingerprint = self.assemble(sample, &user_agent, &header_request)?;
        Ok(FingerprintWithHeaders {
            fingerprint,
            headers,
        })
    }

    /// Stored screen configurations whose parsed dimensions satisfy the
    /// bounds.
    fn screen_candidates(&self, constraints: &ScreenConstraints) -> HashSet<String> {
        let Some(node) = self.fingerprint_network.node(SCREEN_NODE_NAME) else {
            return HashSet::new();
        };
        node.possible_values()
            .iter()
            .filter(|candidate| {
                let Some(payload) = candidate.strip_prefix(STRINGIFIED_PREFIX) else {
                    return false;
                };
                let Ok(parsed) = serde_json::from_str::<Value>(payload) else {
                    return false;
                };
                let width = parsed.get("width").and_then(Value::as_u64);
                let height = parsed.get("height").and_then(Value::as_u64);
                match (width, height) {
                    (Some(width), Some(height)) => {
                        constraints.matches(width as u32, height as u32)
                    }
                    _ => false,
                }
            })
            .cloned()
            .collect()
    }

    /// Post-processing: sentinel removal, `*STRINGIFIED*` unwrapping, and
    /// platform-derived fallbacks.
    fn assemble(
        &self,
        sample: Assignment,
        user_agent: &str,
        header_request: &HeaderRequest,
    ) -> Result<Fingerprint, FingerprintError> {
        let mut flat = serde_json::Map::new();
        for node in self.fingerprint_network.nodes() {
            let Some(raw) = sample.get(node.name()) else {
                continue;
            };
            if raw == MISSING_VALUE_DATASET_TOKEN {
                continue;
            }
            flat.insert(node.name().to_string(), unwrap_value(raw)?);
        }

        let screen: ScreenFingerprint = flat
            .remove(SCREEN_NODE_NAME)
            .map(|value| {
                serde_json::from_value(value)
                    .map_err(|e| FingerprintError::Malformed(format!("screen: {e}")))
            })
            .transpose()?
            .unwrap_or_default();

        let languages: Vec<String> = flat
            .remove("languages")
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_else(|| {
                if header_request.locales.is_empty() {
                    vec!["en-US".to_string()]
                } else {
                    header_request.locales.clone()
                }
            });

        let platform = take_string(&mut flat, "platform").unwrap_or_default();

        let navigator = NavigatorFingerprint {
            user_agent: user_agent.to_string(),
            user_agent_data: flat.remove("userAgentData"),
            do_not_track: take_string(&mut flat, "doNotTrack"),
            app_version: take_string(&mut flat, "appVersion")
                .unwrap_or_else(|| user_agent.trim_start_matches("Mozilla/").to_string()),
            oscpu: take_string(&mut flat, "oscpu"),
            language: languages.first().cloned().unwrap_or_default(),
            languages,
            platform: platform.clone(),
            device_memory: take_number(&mut flat, "deviceMemory").map(|n| n as u32),
            hardware_concurrency: take_number(&mut flat, "hardwareConcurrency").unwrap_or(4)
                as u32,
            product_sub: take_string(&mut flat, "productSub").unwrap_or_default(),
            vendor: take_string(&mut flat, "vendor").unwrap_or_default(),
            max_touch_points: take_number(&mut flat, "maxTouchPoints").unwrap_or(0) as u32,
        };

        let battery = flat
            .remove("battery")
            .and_then(|value| serde_json::from_value(value).ok())
            .or_else(|| Some(derive_battery(&platform)));
        let video_card = flat
            .remove("videoCard")
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_else(|| derive_video_card(&platform));
        let multimedia_devices = flat
            .remove("multimediaDevices")
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_else(|| derive_multimedia_devices(&platform));
        let fonts = flat
            .remove("fonts")
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_else(|| derive_fonts(&platform));

        Ok(Fingerprint {
            screen,
            navigator,
            video_codecs: flat
                .remove("videoCodecs")
                .and_then(|value| serde_json::from_value(value).ok())
                .unwrap_or_default(),
            audio_codecs: flat
                .remove("audioCodecs")
                .and_then(|value| serde_json::from_value(value).ok())
                .unwrap_or_default(),
            plugins_data: flat
                .remove("pluginsData")
                .and_then(|value| serde_json::from_value(value).ok())
                .unwrap_or_default(),
            battery,
            video_card,
            multimedia_devices,
            fonts,
        })
    }
}

/// Parses a sampled string, unwrapping the `*STRINGIFIED*` prefix into the
/// JSON value it encodes.
fn unwrap_value(raw: &str) -> Result<Value, FingerprintError> {
    match raw.strip_prefix(STRINGIFIED_PREFIX) {
        Some(payload) => serde_json::from_str(payload)
            .map_err(|e| FingerprintError::Malformed(format!("stringified payload: {e}"))),
        None => Ok(Value::String(raw.to_string())),
    }
}

fn take_string(flat: &mut serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match flat.remove(key)? {
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn take_number(flat: &mut serde_json::Map<String, Value>, key: &str) -> Option<u64> {
    match flat.remove(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Platform families used by the derived-field tables.
enum PlatformFamily {
    Windows,
    Mac,
    Linux,
}

fn platform_family(platform: &str) -> PlatformFamily {
    if platform.contains("Win") {
        PlatformFamily::Windows
    } else if platform.contains("Mac") || platform.contains("iPhone") || platform.contains("iPad")
    {
        PlatformFamily::Mac
    } else {
        PlatformFamily::Linux
    }
}

fn derive_battery(_platform: &str) -> BatteryFingerprint {
    BatteryFingerprint {
        charging: true,
        charging_time: 0.0,
        discharging_time: 0.0,
        level: 1.0,
    }
}

fn derive_video_card(platform: &str) -> VideoCard {
    match platform_family(platform) {
        PlatformFamily::Windows => VideoCard {
            vendor: "Google Inc. (Intel)".to_string(),
            renderer: "ANGLE (Intel, Intel(R) UHD Graphics Direct3D11 vs_5_0 ps_5_0)".to_string(),
        },
        PlatformFamily::Mac => VideoCard {
            vendor: "Apple Inc.".to_string(),
            renderer: "Apple GPU".to_string(),
        },
        PlatformFamily::Linux => VideoCard {
            vendor: "Mesa".to_string(),
            renderer: "Mesa Intel(R) UHD Graphics (CML GT2)".to_string(),
        },
    }
}

fn derive_multimedia_devices(platform: &str) -> Vec<String> {
    let labels: &[&str] = match platform_family(platform) {
        PlatformFamily::Windows => &["Default - Microphone Array", "Default - Speakers"],
        PlatformFamily::Mac => &["MacBook Pro Microphone", "MacBook Pro Speakers"],
        PlatformFamily::Linux => &["Built-in Audio Analog Stereo"],
    };
    labels.iter().map(|label| label.to_string()).collect()
}

const COMMON_FONTS: &[&str] = &[
    "Arial",
    "Arial Black",
    "Comic Sans MS",
    "Courier New",
    "Georgia",
    "Impact",
    "Times New Roman",
    "Trebuchet MS",
    "Verdana",
];

fn derive_fonts(platform: &str) -> Vec<String> {
    let extra: &[&str] = match platform_family(platform) {
        PlatformFamily::Windows => &[
            "Calibri",
            "Cambria",
            "Consolas",
            "Segoe UI",
            "Tahoma",
            "Microsoft Sans Serif",
        ],
        PlatformFamily::Mac => &[
            "Helvetica",
            "Helvetica Neue",
            "Lucida Grande",
            "Monaco",
            "Menlo",
        ],
        PlatformFamily::Linux => &[
            "DejaVu Sans",
            "DejaVu Serif",
            "Liberation Sans",
            "Liberation Serif",
            "Noto Sans",
        ],
    };
    COMMON_FONTS
        .iter()
        .chain(extra)
        .map(|font| font.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwrap_value_parses_stringified_payloads() {
        let value = unwrap_value("*STRINGIFIED*{\"width\":1920}").unwrap();
        assert_eq!(value["width"], 1920);
        let plain = unwrap_value("Win32").unwrap();
        assert_eq!(plain, Value::String("Win32".to_string()));
        assert!(unwrap_value("*STRINGIFIED*{not json").is_err());
    }

    #[test]
    fn derived_fonts_follow_the_platform() {
        assert!(derive_fonts("Win32").iter().any(|f| f == "Segoe UI"));
        assert!(derive_fonts("MacIntel").iter().any(|f| f == "Helvetica"));
        assert!(derive_fonts("Linux x86_64").iter().any(|f| f == "DejaVu Sans"));
    }

    #[test]
    fn derived_video_card_follows_the_platform() {
        assert!(derive_video_card("MacIntel").vendor.contains("Apple"));
        assert!(derive_video_card("Win32").renderer.contains("ANGLE"));
    }
}
