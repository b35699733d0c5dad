//! Browser identifiers and request specifications.
//!
//! The input network's `*BROWSER_HTTP` node takes values in the shape
//! `<browser>/<dotted-version>|<http-version>`, e.g.
//! `chrome/120.0.6099.71|2`. This module parses those strings, orders
//! dotted versions, and expands the browser specs of a request against the
//! list of known browsers.

use std::cmp::Ordering;
use std::fmt;

use crate::MISSING_VALUE_DATASET_TOKEN;

/// A dotted browser version. Non-numeric segments parse as 0, so
/// `115.0b3` orders like `115.0.0`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BrowserVersion(Vec<u32>);

impl BrowserVersion {
    /// Parses a dotted version string.
    pub fn parse(version: &str) -> Self {
        Self(
            version
                .split('.')
                .map(|segment| segment.parse::<u32>().unwrap_or(0))
                .collect(),
        )
    }

    /// The major (leading) component, 0 when absent.
    pub fn major(&self) -> u32 {
        self.0.first().copied().unwrap_or(0)
    }

    /// The version components.
    pub fn segments(&self) -> &[u32] {
        &self.0
    }
}

impl PartialOrd for BrowserVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BrowserVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // Missing trailing segments compare as 0, so 108.0 == 108.0.0.
        let len = self.0.len().max(other.0.len());
        for i in 0..len {
            let left = self.0.get(i).copied().unwrap_or(0);
            let right = other.0.get(i).copied().unwrap_or(0);
            match left.cmp(&right) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl fmt::Display for BrowserVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// A parsed `*BROWSER_HTTP` value.
#[derive(Debug, Clone)]
pub struct HttpBrowserObject {
    /// Browser name, empty for the absent sentinel.
    pub name: String,
    /// Parsed dotted version.
    pub version: BrowserVersion,
    /// The original string, HTTP suffix included.
    pub complete_string: String,
    /// `"1"` or `"2"`.
    pub http_version: String,
}

impl HttpBrowserObject {
    /// Parses a `name/version|http` identifier. The sentinel
    /// `*MISSING_VALUE*|` parses into an object with an empty name.
    pub fn parse(identifier: &str) -> Result<Self, BrowserParseError> {
        let (browser_part, http_version) = identifier
            .rsplit_once('|')
            .ok_or_else(|| BrowserParseError(identifier.to_string()))?;

        if browser_part.starts_with(MISSING_VALUE_DATASET_TOKEN) {
            return Ok(Self {
                name: String::new(),
                version: BrowserVersion::default(),
                complete_string: identifier.to_string(),
                http_version: http_version.to_string(),
            });
        }

        let (name, version) = browser_part
            .split_once('/')
            .ok_or_else(|| BrowserParseError(identifier.to_string()))?;
        Ok(Self {
            name: name.to_string(),
            version: BrowserVersion::parse(version),
            complete_string: identifier.to_string(),
            http_version: http_version.to_string(),
        })
    }

    /// Whether this is the "absent" sentinel.
    pub fn is_missing(&self) -> bool {
        self.name.is_empty()
    }

    /// The identifier without its HTTP suffix, as the value network's
    /// `*BROWSER` node spells it.
    pub fn browser_string(&self) -> &str {
        self.complete_string
            .rsplit_once('|')
            .map(|(browser, _)| browser)
            .unwrap_or(&self.complete_string)
    }
}

/// The identifier did not match `name "/" version "|" httpVersion`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unparseable browser identifier '{0}'")]
pub struct BrowserParseError(pub String);

/// One browser entry of a header-generation request.
#[derive(Debug, Clone)]
pub struct BrowserSpec {
    /// Browser name, e.g. `"chrome"`.
    pub name: String,
    /// Inclusive lower bound on the major version.
    pub min_version: Option<u32>,
    /// Inclusive upper bound on the major version.
    pub max_version: Option<u32>,
    /// Required HTTP version; `None` defers to the request-level version.
    pub http_version: Option<String>,
}

impl BrowserSpec {
    /// A spec matching every version of `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min_version: None,
            max_version: None,
            http_version: None,
        }
    }

    /// Sets the minimum major version.
    pub fn with_min_version(mut self, version: u32) -> Self {
        self.min_version = Some(version);
        self
    }

    /// Sets the maximum major version.
    pub fn with_max_version(mut self, version: u32) -> Self {
        self.max_version = Some(version);
        self
    }

    /// Pins the HTTP version for this spec only.
    pub fn with_http_version(mut self, version: impl Into<String>) -> Self {
        self.http_version = Some(version.into());
        self
    }

    /// Whether a known browser satisfies this spec under the request-level
    /// HTTP version preference.
    fn matches(&self, known: &HttpBrowserObject, request_http_version: Option<&str>) -> bool {
        if known.is_missing() || known.name != self.name {
            return false;
        }
        let major = known.version.major();
        if self.min_version.is_some_and(|min| major < min) {
            return false;
        }
        if self.max_version.is_some_and(|max| major > max) {
            return false;
        }
        let required = self.http_version.as_deref().or(request_http_version);
        match required {
            Some(required) => known.http_version == required,
            None => true,
        }
    }
}

/// Expands request specs against the known-browser list into the
/// `*BROWSER_HTTP` whitelist.
pub(crate) fn expand_browser_specs(
    specs: &[BrowserSpec],
    known: &[HttpBrowserObject],
    request_http_version: Option<&str>,
) -> Vec<String> {
    let mut whitelist = Vec::new();
    for entry in known {
        if specs
            .iter()
            .any(|spec| spec.matches(entry, request_http_version))
        {
            whitelist.push(entry.complete_string.clone());
        }
    }
    whitelist
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_order_numerically() {
        assert!(BrowserVersion::parse("108.0.5359.1") < BrowserVersion::parse("110.0.0.0"));
        assert!(BrowserVersion::parse("9.1") < BrowserVersion::parse("10.0"));
        assert_eq!(
            BrowserVersion::parse("108.0").cmp(&BrowserVersion::parse("108.0.0.0")),
            Ordering::Equal
        );
    }

    #[test]
    fn non_numeric_segments_parse_as_zero() {
        let version = BrowserVersion::parse("115.0b3.7");
        assert_eq!(version.segments(), [115, 0, 7]);
    }

    #[test]
    fn parses_complete_identifiers() {
        let parsed = HttpBrowserObject::parse("chrome/120.0.6099.71|2").unwrap();
        assert_eq!(parsed.name, "chrome");
        assert_eq!(parsed.version.major(), 120);
        assert_eq!(parsed.http_version, "2");
        assert_eq!(parsed.browser_string(), "chrome/120.0.6099.71");
        assert!(!parsed.is_missing());
    }

    #[test]
    fn parses_the_missing_sentinel() {
        let parsed = HttpBrowserObject::parse("*MISSING_VALUE*|").unwrap();
        assert!(parsed.is_missing());
        assert_eq!(parsed.http_version, "");
    }

    #[test]
    fn rejects_identifiers_without_a_pipe() {
        assert!(HttpBrowserObject::parse("chrome/120.0").is_err());
    }

    #[test]
    fn expansion_filters_by_version_window_and_http() {
        let known: Vec<HttpBrowserObject> = [
            "chrome/108.0.0.0|1",
            "chrome/108.0.0.0|2",
            "chrome/120.0.6099.71|2",
            "firefox/115.0|2",
        ]
        .iter()
        .map(|s| HttpBrowserObject::parse(s).unwrap())
        .collect();

        let specs = [BrowserSpec::named("chrome")
            .with_min_version(100)
            .with_max_version(110)];
        let expanded = expand_browser_specs(&specs, &known, Some("2"));
        assert_eq!(expanded, ["chrome/108.0.0.0|2"]);

        let any_http = [BrowserSpec::named("chrome").with_max_version(110)];
        let expanded = expand_browser_specs(&any_http, &known, None);
        assert_eq!(expanded, ["chrome/108.0.0.0|1", "chrome/108.0.0.0|2"]);
    }
}
