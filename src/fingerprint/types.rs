//! Fingerprint type definitions.
//!
//! The fingerprint network exposes everything as string-valued
//! categoricals; these types are the structured view assembled after
//! sampling. Serialized names are camelCase to match the persisted models.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A complete browser fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    /// Screen geometry and depth properties.
    pub screen: ScreenFingerprint,
    /// Navigator properties.
    pub navigator: NavigatorFingerprint,
    /// Supported video codecs and their confidence strings.
    #[serde(default)]
    pub video_codecs: HashMap<String, String>,
    /// Supported audio codecs and their confidence strings.
    #[serde(default)]
    pub audio_codecs: HashMap<String, String>,
    /// Plugin metadata blobs.
    #[serde(default)]
    pub plugins_data: HashMap<String, serde_json::Value>,
    /// Battery status, when the platform reports one.
    #[serde(default)]
    pub battery: Option<BatteryFingerprint>,
    /// WebGL vendor/renderer pair.
    #[serde(default)]
    pub video_card: VideoCard,
    /// Media device labels.
    #[serde(default)]
    pub multimedia_devices: Vec<String>,
    /// Installed font families.
    #[serde(default)]
    pub fonts: Vec<String>,
}

/// Screen-related fingerprint properties.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScreenFingerprint {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub avail_width: u32,
    #[serde(default)]
    pub avail_height: u32,
    #[serde(default)]
    pub avail_top: u32,
    #[serde(default)]
    pub avail_left: u32,
    #[serde(default)]
    pub color_depth: u32,
    #[serde(default)]
    pub pixel_depth: u32,
    #[serde(default = "default_device_pixel_ratio")]
    pub device_pixel_ratio: f64,
    #[serde(default)]
    pub inner_width: u32,
    #[serde(default)]
    pub inner_height: u32,
    #[serde(default)]
    pub outer_width: u32,
    #[serde(default)]
    pub outer_height: u32,
}

fn default_device_pixel_ratio() -> f64 {
    1.0
}

/// Navigator-related fingerprint properties.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NavigatorFingerprint {
    /// The User-Agent string, pinned to the one in the generated headers.
    pub user_agent: String,
    /// Structured client-hint data, when the browser family has it.
    #[serde(default)]
    pub user_agent_data: Option<serde_json::Value>,
    #[serde(default)]
    pub do_not_track: Option<String>,
    #[serde(default)]
    pub app_version: String,
    #[serde(default)]
    pub oscpu: Option<String>,
    /// Primary language, the head of `languages`.
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub device_memory: Option<u32>,
    #[serde(default)]
    pub hardware_concurrency: u32,
    #[serde(default)]
    pub product_sub: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub max_touch_points: u32,
}

/// WebGL video card information.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VideoCard {
    pub vendor: String,
    pub renderer: String,
}

/// Battery status fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryFingerprint {
    pub charging: bool,
    pub charging_time: f64,
    pub discharging_time: f64,
    pub level: f64,
}

/// A fingerprint combined with the header set it was generated against.
#[derive(Debug, Clone)]
pub struct FingerprintWithHeaders {
    /// The structured fingerprint.
    pub fingerprint: Fingerprint,
    /// The ordered headers, consistent with the fingerprint's User-Agent.
    pub headers: Vec<(String, String)>,
}

/// Screen dimension bounds for fingerprint requests.
#[derive(Debug, Clone, Default)]
pub struct ScreenConstraints {
    pub min_width: Option<u32>,
    pub max_width: Option<u32>,
    pub min_height: Option<u32>,
    pub max_height: Option<u32>,
}

impl ScreenConstraints {
    /// Unbounded constraints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum width.
    pub fn with_min_width(mut self, width: u32) -> Self {
        self.min_width = Some(width);
        self
    }

    /// Sets the maximum width.
    pub fn with_max_width(mut self, width: u32) -> Self {
        self.max_width = Some(width);
        self
    }

    /// Sets the minimum height.
    pub fn with_min_height(mut self, height: u32) -> Self {
        self.min_height = Some(height);
        self
    }

    /// Sets the maximum height.
    pub fn with_max_height(mut self, height: u32) -> Self {
        self.max_height = Some(height);
        self
    }

    /// Whether a candidate screen size satisfies every bound.
    pub fn matches(&self, width: u32, height: u32) -> bool {
        self.min_width.map_or(true, |min| width >= min)
            && self.max_width.map_or(true, |max| width <= max)
            && self.min_height.map_or(true, |min| height >= min)
            && self.max_height.map_or(true, |max| height <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_constraints_match_inclusively() {
        let constraints = ScreenConstraints::new()
            .with_min_width(1280)
            .with_max_width(1920)
            .with_min_height(720);
        assert!(constraints.matches(1280, 720));
        assert!(constraints.matches(1920, 1080));
        assert!(!constraints.matches(1024, 768));
        assert!(!constraints.matches(2560, 1440));
        assert!(!constraints.matches(1280, 600));
    }

    #[test]
    fn fingerprint_deserialises_from_camel_case() {
        let fingerprint: Fingerprint = serde_json::from_value(serde_json::json!({
            "screen": { "width": 1920, "height": 1080, "colorDepth": 24 },
            "navigator": {
                "userAgent": "Mozilla/5.0",
                "hardwareConcurrency": 8,
                "languages": ["en-US", "en"],
                "platform": "Win32"
            },
            "videoCard": { "vendor": "Google Inc.", "renderer": "ANGLE" }
        }))
        .unwrap();
        assert_eq!(fingerprint.screen.width, 1920);
        assert_eq!(fingerprint.screen.color_depth, 24);
        assert_eq!(fingerprint.navigator.hardware_concurrency, 8);
        assert_eq!(fingerprint.video_card.vendor, "Google Inc.");
        assert!(fingerprint.battery.is_none());
    }
}
