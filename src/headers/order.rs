//! Per-browser header ordering.
//!
//! Real browsers emit headers in a recognisable order; the generator
//! reorders its output to match. Keys a browser's order list does not know
//! keep their current relative order at the end.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::model::ModelError;

/// Names of browser families with known header orders.
const CHROMIUM_LIKE: &[&str] = &["chrome", "edge"];

/// Header order lists keyed by browser name.
#[derive(Debug, Clone)]
pub struct HeaderOrders {
    orders: HashMap<String, Vec<String>>,
}

impl HeaderOrders {
    /// Builds from explicit per-browser lists.
    pub fn from_map(orders: HashMap<String, Vec<String>>) -> Self {
        Self { orders }
    }

    /// Loads a JSON object mapping browser names to header-name arrays.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let document = fs::read_to_string(path.as_ref())?;
        let value: Value = serde_json::from_str(&document)?;
        let object = value.as_object().ok_or_else(|| {
            ModelError::Malformed("header-order document is not an object".to_string())
        })?;

        let mut orders = HashMap::with_capacity(object.len());
        for (browser, names) in object {
            let names = names.as_array().ok_or_else(|| {
                ModelError::Malformed(format!("header order for '{browser}' is not an array"))
            })?;
            let names = names
                .iter()
                .map(|name| {
                    name.as_str().map(str::to_string).ok_or_else(|| {
                        ModelError::Malformed(format!(
                            "header order for '{browser}' holds a non-string entry"
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            orders.insert(browser.clone(), names);
        }
        Ok(Self { orders })
    }

    /// The order list for a browser, if one is known.
    pub fn for_browser(&self, browser: &str) -> Option<&[String]> {
        self.orders.get(browser).map(Vec::as_slice)
    }

    /// Reorders `headers` for `browser`. Without an order list the input
    /// comes back untouched.
    pub fn apply(&self, browser: &str, headers: Vec<(String, String)>) -> Vec<(String, String)> {
        match self.for_browser(browser) {
            Some(order) => order_headers(headers, order),
            None => headers,
        }
    }
}

impl Default for HeaderOrders {
    /// Navigation-request orders for the supported browser families, in both
    /// HTTP/1 and HTTP/2 casings.
    fn default() -> Self {
        let chromium: Vec<String> = both_casings(&[
            "Connection",
            "Upgrade-Insecure-Requests",
            "User-Agent",
            "Accept",
            "Sec-Fetch-Site",
            "Sec-Fetch-Mode",
            "Sec-Fetch-User",
            "Sec-Fetch-Dest",
            "Accept-Encoding",
            "Accept-Language",
        ]);
        let firefox: Vec<String> = both_casings(&[
            "User-Agent",
            "Accept",
            "Accept-Language",
            "Accept-Encoding",
            "Connection",
            "Upgrade-Insecure-Requests",
            "Sec-Fetch-Dest",
            "Sec-Fetch-Mode",
            "Sec-Fetch-Site",
            "Sec-Fetch-User",
        ]);
        let safari: Vec<String> = both_casings(&[
            "User-Agent",
            "Accept",
            "Accept-Language",
            "Accept-Encoding",
            "Connection",
        ]);

        let mut orders = HashMap::new();
        for browser in CHROMIUM_LIKE {
            orders.insert(browser.to_string(), chromium.clone());
        }
        orders.insert("firefox".to_string(), firefox);
        orders.insert("safari".to_string(), safari);
        Self { orders }
    }
}

fn both_casings(names: &[&str]) -> Vec<String> {
    names
        .iter()
        .map(|name| name.to_string())
        .chain(names.iter().map(|name| name.to_ascii_lowercase()))
        .collect()
}

/// Stable reorder: keys present in `order` come first in that order, the
/// rest follow in their current order.
pub fn order_headers(headers: Vec<(String, String)>, order: &[String]) -> Vec<(String, String)> {
    let positions: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(position, name)| (name.as_str(), position))
        .collect();

    let mut known: Vec<(usize, (String, String))> = Vec::new();
    let mut unknown: Vec<(String, String)> = Vec::new();
    for header in headers {
        match positions.get(header.0.as_str()) {
            Some(position) => known.push((*position, header)),
            None => unknown.push(header),
        }
    }
    known.sort_by_key(|(position, _)| *position);

    known
        .into_iter()
        .map(|(_, header)| header)
        .chain(unknown)
        .collect()
}

/// Detects the browser family from a User-Agent string.
///
/// Order matters: Edge UAs contain `Chrome`, and Chrome UAs contain
/// `Safari`.
pub fn detect_browser_from_user_agent(user_agent: &str) -> Option<&'static str> {
    if user_agent.contains("Firefox") {
        Some("firefox")
    } else if user_agent.contains("Edg") {
        Some("edge")
    } else if user_agent.contains("Chrome") {
        Some("chrome")
    } else if user_agent.contains("Safari") {
        Some("safari")
    } else {
        None
    }
}
