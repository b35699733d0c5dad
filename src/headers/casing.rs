//! Header key casing, the sec-fetch block, and Accept-Language synthesis.
//!
//! These are small static lookups kept as compile-time constants; nothing in
//! this module touches loaded data.

use crate::headers::browsers::HttpBrowserObject;

/// Segments emitted fully uppercased by pascalisation.
const UPPERCASE_SEGMENTS: &[&str] = &["dnt", "rtt", "ect"];

/// The sec-fetch block in HTTP/1 casing.
pub const SEC_FETCH_HTTP1: &[(&str, &str)] = &[
    ("Sec-Fetch-Dest", "document"),
    ("Sec-Fetch-Mode", "navigate"),
    ("Sec-Fetch-Site", "none"),
    ("Sec-Fetch-User", "?1"),
];

/// The sec-fetch block in HTTP/2 casing.
pub const SEC_FETCH_HTTP2: &[(&str, &str)] = &[
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "none"),
    ("sec-fetch-user", "?1"),
];

/// Minimum major version at which a browser family sends sec-fetch headers.
const SEC_FETCH_MINIMUMS: &[(&str, u32)] = &[("chrome", 76), ("firefox", 90), ("edge", 79)];

/// Whether the sampled browser sends the sec-fetch block at all.
pub fn sends_sec_fetch(browser: &HttpBrowserObject) -> bool {
    SEC_FETCH_MINIMUMS
        .iter()
        .any(|(name, minimum)| browser.name == *name && browser.version.major() >= *minimum)
}

/// Pascalises a header name: split on `-`, uppercase each segment's first
/// character, lowercase the rest. `dnt`, `rtt` and `ect` segments come out
/// fully uppercased. HTTP/2 pseudo-headers (leading `:`) and `sec-ch-ua`
/// names pass through verbatim. Idempotent.
pub fn pascalize(name: &str) -> String {
    if name.starts_with(':') || name.to_ascii_lowercase().starts_with("sec-ch-ua") {
        return name.to_string();
    }
    name.split('-')
        .map(|segment| {
            let lower = segment.to_ascii_lowercase();
            if UPPERCASE_SEGMENTS.contains(&lower.as_str()) {
                return lower.to_ascii_uppercase();
            }
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Pascalises every key of an ordered header list.
pub fn pascalize_headers(headers: Vec<(String, String)>) -> Vec<(String, String)> {
    headers
        .into_iter()
        .map(|(name, value)| (pascalize(&name), value))
        .collect()
}

/// Synthesises an Accept-Language value from an ordered locale list.
///
/// The first locale is emitted verbatim; the rest carry quality weights
/// descending from 0.9 in steps of 0.1, clamped at 0.1, one fractional
/// digit. At most ten locales are used. An empty list falls back to
/// `en-US,en;q=0.9`.
pub fn accept_language_value(locales: &[String]) -> String {
    if locales.is_empty() {
        return "en-US,en;q=0.9".to_string();
    }
    let mut value = String::new();
    for (i, locale) in locales.iter().take(10).enumerate() {
        if i == 0 {
            value.push_str(locale);
        } else {
            let quality = (1.0 - i as f64 * 0.1).max(0.1);
            value.push_str(&format!(",{locale};q={quality:.1}"));
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pascalize_standard_names() {
        assert_eq!(pascalize("accept-language"), "Accept-Language");
        assert_eq!(pascalize("USER-AGENT"), "User-Agent");
        assert_eq!(pascalize("upgrade-insecure-requests"), "Upgrade-Insecure-Requests");
    }

    #[test]
    fn pascalize_uppercase_exceptions() {
        assert_eq!(pascalize("dnt"), "DNT");
        assert_eq!(pascalize("rtt"), "RTT");
        assert_eq!(pascalize("downlink-ect"), "Downlink-ECT");
    }

    #[test]
    fn pascalize_preserves_pseudo_and_client_hint_names() {
        assert_eq!(pascalize(":authority"), ":authority");
        assert_eq!(pascalize("sec-ch-ua-platform"), "sec-ch-ua-platform");
        assert_eq!(pascalize("Sec-Ch-Ua"), "Sec-Ch-Ua");
    }

    #[test]
    fn pascalize_is_idempotent() {
        for name in [
            "user-agent",
            "accept",
            "dnt",
            "sec-fetch-mode",
            "sec-ch-ua-mobile",
            ":path",
            "x-custom-header",
        ] {
            let once = pascalize(name);
            assert_eq!(pascalize(&once), once, "pascalize must be idempotent on '{name}'");
        }
    }

    #[test]
    fn accept_language_quality_ladder() {
        let locales: Vec<String> = ["en-US", "en", "de"].iter().map(|s| s.to_string()).collect();
        assert_eq!(accept_language_value(&locales), "en-US,en;q=0.9,de;q=0.8");
    }

    #[test]
    fn accept_language_clamps_at_a_tenth() {
        let locales: Vec<String> = (0..12).map(|i| format!("l{i}")).collect();
        let value = accept_language_value(&locales);
        let parts: Vec<&str> = value.split(',').collect();
        assert_eq!(parts.len(), 10, "locale list caps at ten entries");
        assert!(parts[9].ends_with(";q=0.1"));
        assert!(parts[8].ends_with(";q=0.2"));
    }

    #[test]
    fn accept_language_empty_fallback() {
        assert_eq!(accept_language_value(&[]), "en-US,en;q=0.9");
    }

    #[test]
    fn sec_fetch_minimums() {
        let qualifies = HttpBrowserObject::parse("chrome/108.0.0.0|2").unwrap();
        assert!(sends_sec_fetch(&qualifies));
        let too_old = HttpBrowserObject::parse("chrome/75.0.0.0|1").unwrap();
        assert!(!sends_sec_fetch(&too_old));
        let safari = HttpBrowserObject::parse("safari/16.0|2").unwrap();
        assert!(!sends_sec_fetch(&safari));
        let firefox = HttpBrowserObject::parse("firefox/95.0|2").unwrap();
        assert!(sends_sec_fetch(&firefox));
    }
}
