//! Integration tests for the header-generation pipeline
//!
//! Covers the happy path, strict failures, the relaxation ladder, the
//! HTTP/1 fallback, user-agent whitelisting, filtering, ordering, and the
//! casing laws.

use fingerprint_forge::bayesian::Network;
use fingerprint_forge::headers::casing::{accept_language_value, pascalize};
use fingerprint_forge::headers::{
    BrowserSpec, HeaderGenerationError, HeaderGenerator, HeaderOrders, HeaderRequest, RelaxedList,
};

const CHROME_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36";
const FIREFOX_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:100.0) Gecko/20100101 Firefox/100.0";

fn input_network_single_chrome() -> Network {
    Network::from_json_str(
        r#"{
            "nodes": [{
                "name": "*BROWSER_HTTP",
                "parentNames": [],
                "possibleValues": ["chrome/108.0.0.0|2"],
                "conditionalProbabilities": { "chrome/108.0.0.0|2": 1.0 }
            }]
        }"#,
    )
    .unwrap()
}

fn value_network_single_ua() -> Network {
    Network::from_json_str(&format!(
        r#"{{
            "nodes": [{{
                "name": "User-Agent",
                "parentNames": [],
                "possibleValues": ["{CHROME_UA}"],
                "conditionalProbabilities": {{ "{CHROME_UA}": 1.0 }}
            }}]
        }}"#
    ))
    .unwrap()
}

fn single_chrome_generator() -> HeaderGenerator {
    HeaderGenerator::from_parts(
        input_network_single_chrome(),
        value_network_single_ua(),
        vec!["chrome/108.0.0.0|2".to_string()],
        HeaderOrders::default(),
    )
    .unwrap()
    .with_seed(42)
}

fn value_of<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

#[test]
fn test_happy_path_http2() {
    let generator = single_chrome_generator();
    let request = HeaderRequest::new()
        .with_browsers(vec![BrowserSpec::named("chrome")])
        .with_operating_systems(vec![])
        .with_devices(vec![])
        .with_http_version("2")
        .with_locales(vec!["en-US".to_string(), "en".to_string()]);

    let headers = generator.generate_headers(&request).unwrap();

    assert_eq!(value_of(&headers, "User-Agent"), Some(CHROME_UA));
    assert_eq!(value_of(&headers, "Accept-Language"), Some("en-US,en;q=0.9"));
    assert_eq!(value_of(&headers, "Sec-Fetch-Dest"), Some("document"));
    assert_eq!(value_of(&headers, "Sec-Fetch-Mode"), Some("navigate"));
    assert_eq!(value_of(&headers, "Sec-Fetch-Site"), Some("none"));
    assert_eq!(value_of(&headers, "Sec-Fetch-User"), Some("?1"));

    // Nothing internal leaks.
    assert!(headers.iter().all(|(key, _)| !key.starts_with('*')));
}

#[test]
fn test_strict_unsatisfiable_browser() {
    let generator = single_chrome_generator();
    let request = HeaderRequest::new()
        .with_browsers(vec![BrowserSpec::named("firefox")])
        .strict();

    let error = generator.generate_headers(&request).unwrap_err();
    assert!(matches!(
        error,
        HeaderGenerationError::UnsatisfiableConstraints
    ));
}

#[test]
fn test_relaxation_reaches_the_stub() {
    let generator = single_chrome_generator();
    // A single-entry browser list is never relaxed, so the request stays
    // unsatisfiable all the way down the ladder.
    let request = HeaderRequest::new()
        .with_browsers(vec![BrowserSpec::named("firefox")])
        .with_locales(vec![
            "en-US".to_string(),
            "fr".to_string(),
            "de".to_string(),
        ]);

    let mut observed = Vec::new();
    let headers = generator
        .generate_headers_observed(&request, &mut |step| observed.push(step))
        .unwrap();

    assert_eq!(
        observed,
        vec![RelaxedList::Locales, RelaxedList::OperatingSystems],
        "only multi-entry lists are relaxed, in declared order"
    );
    assert_eq!(
        headers,
        vec![("User-Agent".to_string(), "Mozilla/5.0".to_string())]
    );
}

#[test]
fn test_relaxation_order_covers_every_list() {
    let generator = single_chrome_generator();
    let request = HeaderRequest::new()
        .with_browsers(vec![BrowserSpec::named("firefox"), BrowserSpec::named("safari")])
        .with_devices(vec!["desktop".to_string(), "mobile".to_string()])
        .with_locales(vec!["en-US".to_string(), "fr".to_string()]);

    let mut observed = Vec::new();
    let headers = generator
        .generate_headers_observed(&request, &mut |step| observed.push(step))
        .unwrap();

    assert_eq!(
        observed,
        vec![
            RelaxedList::Locales,
            RelaxedList::Devices,
            RelaxedList::OperatingSystems,
            RelaxedList::Browsers,
        ]
    );
    // Relaxing browsers admits chrome, so generation succeeds for real.
    assert_eq!(value_of(&headers, "User-Agent"), Some(CHROME_UA));
}

#[test]
fn test_http1_falls_back_to_http2_and_pascalises() {
    // The models only know HTTP/2, so an HTTP/1 request must be served
    // through the fallback and re-cased.
    let generator = single_chrome_generator();
    let request = HeaderRequest::new()
        .with_browsers(vec![BrowserSpec::named("chrome")])
        .with_http_version("1")
        .with_locales(vec!["en-US".to_string()]);

    let headers = generator.generate_headers(&request).unwrap();
    assert!(headers.iter().any(|(key, _)| key == "User-Agent"));
    assert!(headers.iter().any(|(key, _)| key == "Accept-Language"));
    assert!(headers.iter().any(|(key, _)| key == "Sec-Fetch-Dest"));
    // Every key is Pascal-cased on this path.
    for (key, _) in &headers {
        assert_eq!(key, &pascalize(key));
    }
}

#[test]
fn test_native_http1_keys_come_out_pascal() {
    let input = Network::from_json_str(
        r#"{
            "nodes": [{
                "name": "*BROWSER_HTTP",
                "parentNames": [],
                "possibleValues": ["chrome/108.0.0.0|1"],
                "conditionalProbabilities": { "chrome/108.0.0.0|1": 1.0 }
            }]
        }"#,
    )
    .unwrap();
    let generator = HeaderGenerator::from_parts(
        input,
        value_network_single_ua(),
        vec!["chrome/108.0.0.0|1".to_string()],
        HeaderOrders::default(),
    )
    .unwrap()
    .with_seed(42);

    let request = HeaderRequest::new()
        .with_browsers(vec![BrowserSpec::named("chrome")])
        .with_http_version("1")
        .with_locales(vec!["en-US".to_string(), "en".to_string()]);

    let headers = generator.generate_headers(&request).unwrap();
    // The HTTP/1 path injects derived fields in Pascal case directly.
    assert!(headers.iter().any(|(key, _)| key == "Accept-Language"));
    assert!(headers.iter().any(|(key, _)| key == "Sec-Fetch-Mode"));
    assert_eq!(value_of(&headers, "User-Agent"), Some(CHROME_UA));
}

#[test]
fn test_user_agent_whitelist_restricts_the_input_network() {
    let input = Network::from_json_str(
        r#"{
            "nodes": [{
                "name": "*BROWSER_HTTP",
                "parentNames": [],
                "possibleValues": ["chrome/108.0.0.0|2", "firefox/100.0.0.0|2"],
                "conditionalProbabilities": {
                    "chrome/108.0.0.0|2": 0.5,
                    "firefox/100.0.0.0|2": 0.5
                }
            }]
        }"#,
    )
    .unwrap();
    let values = Network::from_json_str(&format!(
        r#"{{
            "nodes": [
                {{
                    "name": "*BROWSER_HTTP",
                    "parentNames": [],
                    "possibleValues": ["chrome/108.0.0.0|2", "firefox/100.0.0.0|2"],
                    "conditionalProbabilities": {{
                        "chrome/108.0.0.0|2": 0.5,
                        "firefox/100.0.0.0|2": 0.5
                    }}
                }},
                {{
                    "name": "*BROWSER",
                    "parentNames": ["*BROWSER_HTTP"],
                    "possibleValues": ["chrome/108.0.0.0", "firefox/100.0.0.0"],
                    "conditionalProbabilities": {{
                        "deeper": {{
                            "chrome/108.0.0.0|2": {{ "chrome/108.0.0.0": 1.0 }},
                            "firefox/100.0.0.0|2": {{ "firefox/100.0.0.0": 1.0 }}
                        }}
                    }}
                }},
                {{
                    "name": "user-agent",
                    "parentNames": ["*BROWSER"],
                    "possibleValues": ["{CHROME_UA}", "{FIREFOX_UA}"],
                    "conditionalProbabilities": {{
                        "deeper": {{
                            "chrome/108.0.0.0": {{ "{CHROME_UA}": 1.0 }},
                            "firefox/100.0.0.0": {{ "{FIREFOX_UA}": 1.0 }}
                        }}
                    }}
                }}
            ]
        }}"#
    ))
    .unwrap();

    let generator = HeaderGenerator::from_parts(
        input,
        values,
        vec![
            "chrome/108.0.0.0|2".to_string(),
            "firefox/100.0.0.0|2".to_string(),
        ],
        HeaderOrders::default(),
    )
    .unwrap()
    .with_seed(7);

    let request = HeaderRequest::new()
        .with_operating_systems(vec![])
        .with_devices(vec![])
        .with_user_agents(vec![CHROME_UA.to_string()]);

    // Without the whitelist both browsers are possible; with it only the
    // chrome UA may ever appear.
    for _ in 0..25 {
        let headers = generator.generate_headers(&request).unwrap();
        assert_eq!(value_of(&headers, "User-Agent"), Some(CHROME_UA));
    }
}

#[test]
fn test_filtering_and_overlay() {
    let values = Network::from_json_str(&format!(
        r#"{{
            "nodes": [
                {{
                    "name": "User-Agent",
                    "parentNames": [],
                    "possibleValues": ["{CHROME_UA}"],
                    "conditionalProbabilities": {{ "{CHROME_UA}": 1.0 }}
                }},
                {{
                    "name": "Connection",
                    "parentNames": [],
                    "possibleValues": ["close"],
                    "conditionalProbabilities": {{ "close": 1.0 }}
                }},
                {{
                    "name": "*INTERNAL",
                    "parentNames": [],
                    "possibleValues": ["scaffolding"],
                    "conditionalProbabilities": {{ "scaffolding": 1.0 }}
                }},
                {{
                    "name": "X-Sometimes",
                    "parentNames": [],
                    "possibleValues": ["*MISSING_VALUE*"],
                    "conditionalProbabilities": {{ "*MISSING_VALUE*": 1.0 }}
                }}
            ]
        }}"#
    ))
    .unwrap();

    let generator = HeaderGenerator::from_parts(
        input_network_single_chrome(),
        values,
        vec!["chrome/108.0.0.0|2".to_string()],
        HeaderOrders::default(),
    )
    .unwrap()
    .with_seed(42);

    let request = HeaderRequest::new()
        .with_browsers(vec![BrowserSpec::named("chrome")])
        .with_operating_systems(vec![])
        .with_devices(vec![])
        .with_request_dependent_headers(vec![(
            "Referer".to_string(),
            "https://example.com/".to_string(),
        )]);

    let headers = generator.generate_headers(&request).unwrap();

    assert!(value_of(&headers, "Connection").is_none(), "close is dropped");
    assert!(value_of(&headers, "*INTERNAL").is_none());
    assert!(value_of(&headers, "X-Sometimes").is_none(), "sentinel is dropped");
    assert_eq!(value_of(&headers, "Referer"), Some("https://example.com/"));
    // Unknown keys keep their relative position at the tail.
    assert_eq!(headers.last().unwrap().0, "Referer");
}

#[test]
fn test_missing_user_agent_surfaces() {
    let values = Network::from_json_str(
        r#"{
            "nodes": [{
                "name": "Accept",
                "parentNames": [],
                "possibleValues": ["text/html"],
                "conditionalProbabilities": { "text/html": 1.0 }
            }]
        }"#,
    )
    .unwrap();
    let generator = HeaderGenerator::from_parts(
        input_network_single_chrome(),
        values,
        vec!["chrome/108.0.0.0|2".to_string()],
        HeaderOrders::default(),
    )
    .unwrap();

    let request = HeaderRequest::new()
        .with_browsers(vec![BrowserSpec::named("chrome")])
        .with_operating_systems(vec![])
        .with_devices(vec![]);
    assert!(matches!(
        generator.generate_headers(&request),
        Err(HeaderGenerationError::MissingUserAgent)
    ));
}

#[test]
fn test_unsupported_request_names_are_rejected() {
    let generator = single_chrome_generator();
    let request = HeaderRequest::new().with_browsers(vec![BrowserSpec::named("konqueror")]);
    assert!(matches!(
        generator.generate_headers(&request),
        Err(HeaderGenerationError::Unsupported { .. })
    ));
}

#[test]
fn test_generation_is_deterministic_for_equal_seeds() {
    let request = HeaderRequest::new()
        .with_browsers(vec![BrowserSpec::named("chrome")])
        .with_operating_systems(vec![])
        .with_devices(vec![]);

    let first = single_chrome_generator();
    let second = single_chrome_generator();
    for _ in 0..10 {
        assert_eq!(
            first.generate_headers(&request).unwrap(),
            second.generate_headers(&request).unwrap()
        );
    }
}

#[test]
fn test_pascalisation_is_idempotent() {
    for name in [
        "user-agent",
        "accept-language",
        "dnt",
        "rtt",
        "ect",
        "sec-fetch-dest",
        "sec-ch-ua-platform",
        ":authority",
        "x-requested-with",
    ] {
        let once = pascalize(name);
        assert_eq!(pascalize(&once), once);
    }
}

#[test]
fn test_accept_language_round_trips() {
    let locales: Vec<String> = ["en-US", "en", "de", "fr-CH"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let value = accept_language_value(&locales);
    let parsed: Vec<&str> = value
        .split(',')
        .map(|part| part.split(";q=").next().unwrap())
        .collect();
    assert_eq!(parsed, locales.iter().map(String::as_str).collect::<Vec<_>>());
}
