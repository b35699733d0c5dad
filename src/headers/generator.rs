//! The header-generation pipeline.
//!
//! [`HeaderGenerator`] stitches the input-selector network and the
//! header-value network into one flow: expand the requested browsers into a
//! `*BROWSER_HTTP` whitelist, tighten the whitelist through the value
//! network when a user-agent constraint is present, sample the input
//! network with backtracking, forward-sample the value network, inject the
//! derived fields, filter, overlay, order, and case the keys.
//!
//! Constraint failures degrade in a fixed ladder: an HTTP/1 request falls
//! back to the HTTP/2 path once, then request lists are relaxed one at a
//! time (`locales`, `devices`, `operating_systems`, `browsers`), and a
//! non-strict request that still cannot be satisfied yields a minimal
//! `User-Agent: Mozilla/5.0` stub.

use std::collections::HashSet;
use std::path::Path;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tracing::{debug, info};

use crate::bayesian::{Assignment, Constraints, Network};
use crate::config::ForgeSettings;
use crate::headers::browsers::{expand_browser_specs, BrowserSpec, HttpBrowserObject};
use crate::headers::casing::{
    accept_language_value, pascalize_headers, sends_sec_fetch, SEC_FETCH_HTTP1, SEC_FETCH_HTTP2,
};
use crate::headers::order::{detect_browser_from_user_agent, HeaderOrders};
use crate::headers::{
    BROWSER_HTTP_NODE_NAME, BROWSER_NODE_NAME, DEVICE_NODE_NAME, OPERATING_SYSTEM_NODE_NAME,
    SUPPORTED_BROWSERS, SUPPORTED_DEVICES, SUPPORTED_HTTP_VERSIONS, SUPPORTED_OPERATING_SYSTEMS,
};
use crate::model::ModelError;
use crate::MISSING_VALUE_DATASET_TOKEN;

/// An ordered list of generated header pairs.
pub type GeneratedHeaders = Vec<(String, String)>;

/// Errors surfaced by header generation.
#[derive(Debug, Error)]
pub enum HeaderGenerationError {
    /// No header set satisfies the request, and the request is strict.
    #[error("request constraints cannot be satisfied by the loaded networks")]
    UnsatisfiableConstraints,

    /// The final header set carries no User-Agent; the value network is
    /// broken.
    #[error("generated header set has no User-Agent")]
    MissingUserAgent,

    /// The request names a browser, OS, device, or HTTP version the
    /// generator does not know.
    #[error("unsupported {kind} '{value}'")]
    Unsupported {
        /// What kind of name was rejected.
        kind: &'static str,
        /// The offending value.
        value: String,
    },

    /// A model could not be loaded or validated.
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// A request list that was reset to its supported default during
/// relaxation, in the order relaxation visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaxedList {
    /// `locales` was reset to `["en-US"]`.
    Locales,
    /// `devices` was reset to every supported device class.
    Devices,
    /// `operating_systems` was reset to every supported OS.
    OperatingSystems,
    /// `browsers` was reset to every supported browser, any version.
    Browsers,
}

const RELAXATION_ORDER: [RelaxedList; 4] = [
    RelaxedList::Locales,
    RelaxedList::Devices,
    RelaxedList::OperatingSystems,
    RelaxedList::Browsers,
];

/// What a caller asks for.
///
/// Empty `operating_systems` or `devices` lists leave the corresponding
/// selector unconstrained.
#[derive(Debug, Clone)]
pub struct HeaderRequest {
    /// Acceptable browsers with optional version windows.
    pub browsers: Vec<BrowserSpec>,
    /// Acceptable operating systems.
    pub operating_systems: Vec<String>,
    /// Acceptable device classes.
    pub devices: Vec<String>,
    /// Locales for Accept-Language, most preferred first.
    pub locales: Vec<String>,
    /// Preferred HTTP version, `"1"` or `"2"`.
    pub http_version: String,
    /// Fail instead of relaxing when constraints cannot be met.
    pub strict: bool,
    /// Restrict generation to these exact User-Agent strings.
    pub user_agents: Option<Vec<String>>,
    /// Caller headers merged over the generated set, in order.
    pub request_dependent_headers: Vec<(String, String)>,
}

impl Default for HeaderRequest {
    fn default() -> Self {
        Self {
            browsers: SUPPORTED_BROWSERS
                .iter()
                .map(|name| BrowserSpec::named(*name))
                .collect(),
            operating_systems: SUPPORTED_OPERATING_SYSTEMS
                .iter()
                .map(|os| os.to_string())
                .collect(),
            devices: vec!["desktop".to_string()],
            locales: vec!["en-US".to_string()],
            http_version: "2".to_string(),
            strict: false,
            user_agents: None,
            request_dependent_headers: Vec::new(),
        }
    }
}

impl HeaderRequest {
    /// A request with every default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the acceptable browsers.
    pub fn with_browsers(mut self, browsers: Vec<BrowserSpec>) -> Self {
        self.browsers = browsers;
        self
    }

    /// Sets the acceptable operating systems.
    pub fn with_operating_systems(mut self, operating_systems: Vec<String>) -> Self {
        self.operating_systems = operating_systems;
        self
    }

    /// Sets the acceptable device classes.
    pub fn with_devices(mut self, devices: Vec<String>) -> Self {
        self.devices = devices;
        self
    }

    /// Sets the locale preference list.
    pub fn with_locales(mut self, locales: Vec<String>) -> Self {
        self.locales = locales;
        self
    }

    /// Sets the preferred HTTP version.
    pub fn with_http_version(mut self, version: impl Into<String>) -> Self {
        self.http_version = version.into();
        self
    }

    /// Makes the request strict: unsatisfiable constraints become an error.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Restricts generation to the given User-Agent strings.
    pub fn with_user_agents(mut self, user_agents: Vec<String>) -> Self {
        self.user_agents = Some(user_agents);
        self
    }

    /// Adds headers merged over the generated set.
    pub fn with_request_dependent_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.request_dependent_headers = headers;
        self
    }

    fn validate(&self) -> Result<(), HeaderGenerationError> {
        for spec in &self.browsers {
            if !SUPPORTED_BROWSERS.contains(&spec.name.as_str()) {
                return Err(HeaderGenerationError::Unsupported {
                    kind: "browser",
                    value: spec.name.clone(),
                });
            }
            if let Some(version) = &spec.http_version {
                if !SUPPORTED_HTTP_VERSIONS.contains(&version.as_str()) {
                    return Err(HeaderGenerationError::Unsupported {
                        kind: "HTTP version",
                        value: version.clone(),
                    });
                }
            }
        }
        for os in &self.operating_systems {
            if !SUPPORTED_OPERATING_SYSTEMS.contains(&os.as_str()) {
                return Err(HeaderGenerationError::Unsupported {
                    kind: "operating system",
                    value: os.clone(),
                });
            }
        }
        for device in &self.devices {
            if !SUPPORTED_DEVICES.contains(&device.as_str()) {
                return Err(HeaderGenerationError::Unsupported {
                    kind: "device",
                    value: device.clone(),
                });
            }
        }
        if !SUPPORTED_HTTP_VERSIONS.contains(&self.http_version.as_str()) {
            return Err(HeaderGenerationError::Unsupported {
                kind: "HTTP version",
                value: self.http_version.clone(),
            });
        }
        Ok(())
    }
}

/// Generates statistically consistent HTTP header sets.
///
/// A generator is immutable after construction and can be shared across
/// threads; only the default PRNG sits behind a lock.
pub struct HeaderGenerator {
    input_network: Network,
    header_network: Network,
    unique_browsers: Vec<HttpBrowserObject>,
    orders: HeaderOrders,
    rng: Mutex<StdRng>,
}

impl std::fmt::Debug for HeaderGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeaderGenerator")
            .field("input_nodes", &self.input_network.nodes().len())
            .field("header_nodes", &self.header_network.nodes().len())
            .field("unique_browsers", &self.unique_browsers.len())
            .finish()
    }
}

impl HeaderGenerator {
    /// Assembles a generator from already-loaded components.
    pub fn from_parts(
        input_network: Network,
        header_network: Network,
        unique_browsers: Vec<String>,
        orders: HeaderOrders,
    ) -> Result<Self, HeaderGenerationError> {
        let unique_browsers = unique_browsers
            .iter()
            .map(|identifier| {
                HttpBrowserObject::parse(identifier).map_err(|e| {
                    HeaderGenerationError::Model(ModelError::Malformed(e.to_string()))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        info!(browsers = unique_browsers.len(), "header generator ready");
        Ok(Self {
            input_network,
            header_network,
            unique_browsers,
            orders,
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }

    /// Loads a generator from a model bundle directory laid out per
    /// [`ForgeSettings`].
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, HeaderGenerationError> {
        Self::from_settings(&ForgeSettings::new().with_data_dir(dir))
    }

    /// Loads a generator as configured.
    pub fn from_settings(settings: &ForgeSettings) -> Result<Self, HeaderGenerationError> {
        let input_network = Network::from_path(settings.input_network_path()?)?;
        let header_network = Network::from_path(settings.header_network_path()?)?;
        let unique_browsers = settings.load_browser_list()?;
        let orders = match settings.header_order_path() {
            Ok(path) => HeaderOrders::from_json_file(path)?,
            Err(_) => HeaderOrders::default(),
        };
        let mut generator =
            Self::from_parts(input_network, header_network, unique_browsers, orders)?;
        if let Some(seed) = settings.seed {
            generator = generator.with_seed(seed);
        }
        Ok(generator)
    }

    /// Replaces the default PRNG with a seeded one. Two generators built
    /// from the same models and seed produce identical output sequences.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// The known browsers this generator can emit.
    pub fn unique_browsers(&self) -> &[HttpBrowserObject] {
        &self.unique_browsers
    }

    /// The header-value network, for callers composing larger pipelines.
    pub fn header_network(&self) -> &Network {
        &self.header_network
    }

    /// Generates one ordered header set for `request`.
    pub fn generate_headers(
        &self,
        request: &HeaderRequest,
    ) -> Result<GeneratedHeaders, HeaderGenerationError> {
        self.generate_headers_observed(request, &mut |_| {})
    }

    /// Like [`HeaderGenerator::generate_headers`], invoking `observer` for
    /// every relaxation step in the order they are attempted.
    pub fn generate_headers_observed(
        &self,
        request: &HeaderRequest,
        observer: &mut dyn FnMut(RelaxedList),
    ) -> Result<GeneratedHeaders, HeaderGenerationError> {
        request.validate()?;
        self.generate(request, observer)
    }

    fn generate(
        &self,
        request: &HeaderRequest,
        observer: &mut dyn FnMut(RelaxedList),
    ) -> Result<GeneratedHeaders, HeaderGenerationError> {
        let mut work = request.clone();
        let mut pending_relaxations = RELAXATION_ORDER.iter();

        loop {
            let input_sample = self
                .build_input_constraints(&work)
                .and_then(|constraints| {
                    let mut rng = self.rng.lock();
                    self.input_network.sample_consistent(&mut *rng, &constraints)
                });

            if let Some(input_sample) = input_sample {
                return self.finish(&work, input_sample);
            }

            // The HTTP/1 route gets one shot; after that the request is
            // served through the HTTP/2 networks and re-cased on the way
            // out.
            if work.http_version == "1" {
                debug!("HTTP/1 constraints unsatisfiable, retrying over HTTP/2");
                let mut retry = work.clone();
                retry.http_version = "2".to_string();
                let headers = self.generate(&retry, observer)?;
                return Ok(pascalize_headers(headers));
            }

            let relaxed = pending_relaxations.find(|step| match step {
                RelaxedList::Locales => work.locales.len() > 1,
                RelaxedList::Devices => work.devices.len() > 1,
                RelaxedList::OperatingSystems => work.operating_systems.len() > 1,
                RelaxedList::Browsers => work.browsers.len() > 1,
            });

            match relaxed {
                Some(step) => {
                    debug!(?step, "relaxing request list to its supported default");
                    observer(*step);
                    match step {
                        RelaxedList::Locales => work.locales = vec!["en-US".to_string()],
                        RelaxedList::Devices => {
                            work.devices =
                                SUPPORTED_DEVICES.iter().map(|d| d.to_string()).collect();
                        }
                        RelaxedList::OperatingSystems => {
                            work.operating_systems = SUPPORTED_OPERATING_SYSTEMS
                                .iter()
                                .map(|os| os.to_string())
                                .collect();
                        }
                        RelaxedList::Browsers => {
                            work.browsers = SUPPORTED_BROWSERS
                                .iter()
                                .map(|name| BrowserSpec::named(*name))
                                .collect();
                        }
                    }
                }
                None => {
                    if work.strict {
                        return Err(HeaderGenerationError::UnsatisfiableConstraints);
                    }
                    debug!("constraints exhausted, emitting stub header set");
                    return Ok(vec![("User-Agent".to_string(), "Mozilla/5.0".to_string())]);
                }
            }
        }
    }

    /// Builds the input-network constraint set for the request, tightened by
    /// the user-agent whitelist when one is present. `None` means the
    /// constraints are already known to be unsatisfiable.
    fn build_input_constraints(&self, request: &HeaderRequest) -> Option<Constraints> {
        let whitelist = expand_browser_specs(
            &request.browsers,
            &self.unique_browsers,
            Some(request.http_version.as_str()),
        );
        if whitelist.is_empty() {
            debug!("no known browser satisfies the request specs");
            return None;
        }

        let mut constraints = Constraints::new();
        constraints.insert(
            BROWSER_HTTP_NODE_NAME.to_string(),
            whitelist.into_iter().collect(),
        );
        if !request.operating_systems.is_empty() {
            constraints.insert(
                OPERATING_SYSTEM_NODE_NAME.to_string(),
                request.operating_systems.iter().cloned().collect(),
            );
        }
        if !request.devices.is_empty() {
            constraints.insert(
                DEVICE_NODE_NAME.to_string(),
                request.devices.iter().cloned().collect(),
            );
        }

        if let Some(user_agents) = request.user_agents.as_deref().filter(|ua| !ua.is_empty()) {
            self.restrict_by_user_agents(&mut constraints, user_agents)?;
        }
        Some(constraints)
    }

    /// Propagates a user-agent whitelist back through the value network and
    /// drops input values that cannot co-occur with any surviving string.
    fn restrict_by_user_agents(
        &self,
        constraints: &mut Constraints,
        user_agents: &[String],
    ) -> Option<()> {
        let whitelist: HashSet<String> = user_agents.iter().cloned().collect();
        let http1_domains = self.header_network.possible_values(&Constraints::from([(
            "User-Agent".to_string(),
            whitelist.clone(),
        )]));
        let http2_domains = self.header_network.possible_values(&Constraints::from([(
            "user-agent".to_string(),
            whitelist,
        )]));

        let survives = |domains: &Option<Constraints>, name: &str, value: &str| -> bool {
            match domains {
                None => false,
                Some(domains) => domains.get(name).map_or(true, |set| set.contains(value)),
            }
        };

        for name in [
            BROWSER_HTTP_NODE_NAME,
            OPERATING_SYSTEM_NODE_NAME,
            DEVICE_NODE_NAME,
        ] {
            let Some(values) = constraints.get_mut(name) else {
                continue;
            };
            if name == BROWSER_HTTP_NODE_NAME {
                values.retain(|value| match HttpBrowserObject::parse(value) {
                    Ok(parsed) if parsed.http_version == "1" => {
                        survives(&http1_domains, BROWSER_NODE_NAME, parsed.browser_string())
                    }
                    Ok(parsed) if parsed.http_version == "2" => {
                        survives(&http2_domains, BROWSER_NODE_NAME, parsed.browser_string())
                    }
                    _ => false,
                });
            } else {
                values.retain(|value| {
                    survives(&http1_domains, name, value) || survives(&http2_domains, name, value)
                });
            }
            if values.is_empty() {
                debug!(node = name, "user-agent whitelist eliminated every value");
                return None;
            }
        }
        Some(())
    }

    /// Pipeline steps 4-9: value sampling, derived fields, filtering,
    /// overlay, ordering, casing.
    fn finish(
        &self,
        request: &HeaderRequest,
        input_sample: Assignment,
    ) -> Result<GeneratedHeaders, HeaderGenerationError> {
        let value_sample = {
            let mut rng = self.rng.lock();
            self.header_network.sample(&mut *rng, &input_sample)
        };

        // Working set in sampling order, so "current order" is well defined
        // all the way down to the ordering step.
        let mut headers: GeneratedHeaders = self
            .header_network
            .nodes()
            .iter()
            .filter_map(|node| {
                value_sample
                    .get(node.name())
                    .map(|value| (node.name().to_string(), value.clone()))
            })
            .collect();

        let browser = input_sample
            .get(BROWSER_HTTP_NODE_NAME)
            .and_then(|identifier| HttpBrowserObject::parse(identifier).ok())
            .filter(|parsed| !parsed.is_missing());
        let http2 = browser
            .as_ref()
            .map(|parsed| parsed.http_version == "2")
            .unwrap_or(request.http_version == "2");

        let accept_language_key = if http2 { "accept-language" } else { "Accept-Language" };
        set_header(
            &mut headers,
            accept_language_key,
            accept_language_value(&request.locales),
        );

        if let Some(browser) = &browser {
            if sends_sec_fetch(browser) {
                let block = if http2 { SEC_FETCH_HTTP2 } else { SEC_FETCH_HTTP1 };
                for (name, value) in block {
                    set_header(&mut headers, name, (*value).to_string());
                }
            }
        }

        headers.retain(|(name, value)| {
            !name.starts_with('*')
                && value != MISSING_VALUE_DATASET_TOKEN
                && !value.is_empty()
                && !(name.eq_ignore_ascii_case("connection") && value == "close")
        });

        for (name, value) in &request.request_dependent_headers {
            set_header(&mut headers, name, value.clone());
        }

        let user_agent = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("user-agent"))
            .map(|(_, value)| value.clone())
            .ok_or(HeaderGenerationError::MissingUserAgent)?;

        if let Some(browser_name) = detect_browser_from_user_agent(&user_agent) {
            headers = self.orders.apply(browser_name, headers);
        }

        if request.http_version == "2" {
            headers = pascalize_headers(headers);
        }
        Ok(headers)
    }
}

/// Replaces the first case-insensitive occurrence of `name` (adopting the
/// new spelling) or appends the pair.
fn set_header(headers: &mut GeneratedHeaders, name: &str, value: String) {
    match headers
        .iter_mut()
        .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
    {
        Some(slot) => *slot = (name.to_string(), value),
        None => headers.push((name.to_string(), value)),
    }
}
