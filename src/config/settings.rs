//! Generator settings and model-bundle configuration.
//!
//! A *bundle* is a directory holding the persisted networks and auxiliary
//! data files. [`ForgeSettings`] describes where that bundle lives and how
//! generation should behave by default, supporting multiple configuration
//! sources with proper precedence: built-in defaults, then a TOML or JSON
//! file, then `FINGERPRINT_FORGE_*` environment variables.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::ModelError;

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML configuration.
    #[error("Failed to parse TOML configuration: {0}")]
    TomlParseError(#[from] toml::de::Error),

    /// Failed to serialize TOML configuration.
    #[error("Failed to serialize TOML configuration: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    /// Failed to parse JSON configuration.
    #[error("Failed to parse JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// Unsupported file format.
    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

/// Environment variable prefix for overrides.
const ENV_PREFIX: &str = "FINGERPRINT_FORGE_";

fn default_input_network_file() -> String {
    "input-network".to_string()
}
fn default_header_network_file() -> String {
    "header-network".to_string()
}
fn default_fingerprint_network_file() -> String {
    "fingerprint-network".to_string()
}
fn default_browser_list_file() -> String {
    "browser-helper-file.json".to_string()
}
fn default_header_order_file() -> String {
    "headers-order.json".to_string()
}
fn default_locales() -> Vec<String> {
    vec!["en-US".to_string()]
}

/// Main generator configuration.
///
/// # Example
///
/// ```rust,no_run
/// use fingerprint_forge::config::ForgeSettings;
///
/// let settings = ForgeSettings::new()
///     .with_data_dir("/var/lib/fingerprint-forge")
///     .with_seed(42);
/// settings.validate().unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgeSettings {
    /// Directory holding the model bundle.
    pub data_dir: PathBuf,

    /// Input-network file stem or name (`.zip`/`.json` resolved if omitted).
    #[serde(default = "default_input_network_file")]
    pub input_network_file: String,

    /// Header-network file stem or name.
    #[serde(default = "default_header_network_file")]
    pub header_network_file: String,

    /// Fingerprint-network file stem or name.
    #[serde(default = "default_fingerprint_network_file")]
    pub fingerprint_network_file: String,

    /// Known-browsers list (JSON array of identifier strings).
    #[serde(default = "default_browser_list_file")]
    pub browser_list_file: String,

    /// Per-browser header-order lists (JSON object).
    #[serde(default = "default_header_order_file")]
    pub header_order_file: String,

    /// Whether requests fail instead of relaxing by default.
    #[serde(default)]
    pub strict: bool,

    /// Seed for the generator PRNGs; unset means entropy-seeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Default locale preference for requests that give none.
    #[serde(default = "default_locales")]
    pub default_locales: Vec<String>,
}

impl Default for ForgeSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            input_network_file: default_input_network_file(),
            header_network_file: default_header_network_file(),
            fingerprint_network_file: default_fingerprint_network_file(),
            browser_list_file: default_browser_list_file(),
            header_order_file: default_header_order_file(),
            strict: false,
            seed: None,
            default_locales: default_locales(),
        }
    }
}

impl ForgeSettings {
    /// Creates settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bundle directory.
    pub fn with_data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.data_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Sets the PRNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets strict-mode default.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Loads settings from a TOML or JSON file, dispatching on extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match extension.as_str() {
            "toml" => Ok(toml::from_str(&contents)?),
            "json" => Ok(serde_json::from_str(&contents)?),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Saves settings to a TOML or JSON file, dispatching on extension.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        let contents = match extension.as_str() {
            "toml" => toml::to_string_pretty(self)?,
            "json" => serde_json::to_string_pretty(self)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };
        fs::write(path, contents)?;
        Ok(())
    }

    /// Applies `FINGERPRINT_FORGE_*` environment variable overrides.
    ///
    /// Recognised: `DATA_DIR`, `STRICT` (`true`/`false`/`1`/`0`), `SEED`.
    pub fn apply_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(dir) = env::var(format!("{ENV_PREFIX}DATA_DIR")) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(strict) = env::var(format!("{ENV_PREFIX}STRICT")) {
            self.strict = match strict.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                other => {
                    return Err(ConfigError::ValidationError(format!(
                        "{ENV_PREFIX}STRICT must be a boolean, got '{other}'"
                    )))
                }
            };
        }
        if let Ok(seed) = env::var(format!("{ENV_PREFIX}SEED")) {
            self.seed = Some(seed.parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "{ENV_PREFIX}SEED must be an unsigned integer, got '{seed}'"
                ))
            })?);
        }
        Ok(self)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "data_dir cannot be empty".to_string(),
            ));
        }
        for (field, value) in [
            ("input_network_file", &self.input_network_file),
            ("header_network_file", &self.header_network_file),
            ("fingerprint_network_file", &self.fingerprint_network_file),
            ("browser_list_file", &self.browser_list_file),
        ] {
            if value.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{field} cannot be empty"
                )));
            }
        }
        if self.default_locales.is_empty() {
            return Err(ConfigError::ValidationError(
                "default_locales cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolved path of the input network.
    pub fn input_network_path(&self) -> Result<PathBuf, ModelError> {
        self.resolve_model(&self.input_network_file)
    }

    /// Resolved path of the header network.
    pub fn header_network_path(&self) -> Result<PathBuf, ModelError> {
        self.resolve_model(&self.header_network_file)
    }

    /// Resolved path of the fingerprint network.
    pub fn fingerprint_network_path(&self) -> Result<PathBuf, ModelError> {
        self.resolve_model(&self.fingerprint_network_file)
    }

    /// Resolved path of the header-order file.
    pub fn header_order_path(&self) -> Result<PathBuf, ModelError> {
        self.resolve_existing(&self.header_order_file)
    }

    /// Loads the known-browsers list.
    pub fn load_browser_list(&self) -> Result<Vec<String>, ModelError> {
        let path = self.resolve_existing(&self.browser_list_file)?;
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Resolves a model file name, trying `.zip` then `.json` when the name
    /// carries no extension.
    fn resolve_model(&self, name: &str) -> Result<PathBuf, ModelError> {
        if Path::new(name).extension().is_some() {
            return self.resolve_existing(name);
        }
        for extension in ["zip", "json"] {
            let candidate = self.data_dir.join(format!("{name}.{extension}"));
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        Err(ModelError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!(
                "no {name}.zip or {name}.json in {}",
                self.data_dir.display()
            ),
        )))
    }

    fn resolve_existing(&self, name: &str) -> Result<PathBuf, ModelError> {
        let candidate = self.data_dir.join(name);
        if candidate.is_file() {
            Ok(candidate)
        } else {
            Err(ModelError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", candidate.display()),
            )))
        }
    }
}
