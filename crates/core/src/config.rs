//! Configuration management
//!
//! This module handles loading and saving the gp configuration file and
//! resolving the admin API endpoint from a profile plus explicit overrides.
//! The configuration file is stored in TOML format at ~/.config/gp/config.toml.
//!
//! Changes to schema_version require migration support.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::profile::Profile;

/// Current configuration schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "GP_CONFIG_DIR";

/// Default admin API request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

const DEFAULT_SCHEME: &str = "https";
const DEFAULT_OUTPUT: &str = "human";
const DEFAULT_COLOR: &str = "auto";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Schema version for migration support
    pub schema_version: u32,

    #[serde(default)]
    pub defaults: Defaults,

    /// Configured connection profiles
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

/// Default settings for CLI behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    /// Output format: "human" or "json"
    #[serde(default = "default_output")]
    pub output: String,

    /// Color mode: "auto" or "never"
    #[serde(default = "default_color")]
    pub color: String,

    /// Profile used when none is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

fn default_output() -> String {
    DEFAULT_OUTPUT.to_string()
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

impl Defaults {
    /// Whether commands print JSON when `--json` is not given
    pub fn json_output(&self) -> bool {
        self.output.eq_ignore_ascii_case("json")
    }

    /// Whether colors stay off when `--no-color` is not given
    pub fn color_disabled(&self) -> bool {
        self.color.eq_ignore_ascii_case("never")
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            profile: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            defaults: Defaults::default(),
            profiles: Vec::new(),
        }
    }
}

/// Configuration manager handles loading and saving config
#[derive(Debug)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager at `$GP_CONFIG_DIR` or the platform config directory
    pub fn new() -> Result<Self> {
        let config_dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::config_dir()
                .ok_or_else(|| Error::Config("Could not determine config directory".into()))?
                .join("gp"),
        };
        Ok(Self {
            config_path: config_dir.join("config.toml"),
        })
    }

    /// Create a ConfigManager with a custom path (useful for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load configuration from disk
    ///
    /// A missing file yields the default configuration.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&self.config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        if config.schema_version < SCHEMA_VERSION {
            config = migrate(config);
        } else if config.schema_version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "Configuration file version {} is newer than supported version {}. Please upgrade gp.",
                config.schema_version, SCHEMA_VERSION
            )));
        }

        Ok(config)
    }

    /// Save configuration to disk
    ///
    /// The file holds admin tokens, so it is readable by its owner only.
    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.config_path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.config_path, permissions)?;
        }

        Ok(())
    }
}

fn migrate(mut config: Config) -> Config {
    config.schema_version = SCHEMA_VERSION;
    config
}

/// Split a host setting into `host[:port]` and the scheme it names, if any
///
/// Accepts `garage.example.com:3903` or `https://garage.example.com:3903`.
/// Paths are rejected in both forms.
pub fn sanitize_host(raw: &str) -> Result<(String, Option<String>)> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::Config("host cannot be empty".into()));
    }

    if raw.starts_with("http://") || raw.starts_with("https://") {
        let url = Url::parse(raw)?;
        let Some(host) = url.host_str() else {
            return Err(Error::Config(format!("missing host in url '{raw}'")));
        };
        if url.path() != "/" && !url.path().is_empty() {
            return Err(Error::Config(format!(
                "host url must not contain a path, got '{raw}'"
            )));
        }
        let host = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        return Ok((host, Some(url.scheme().to_string())));
    }

    let host = raw.trim_start_matches("//").trim_end_matches('/');
    if host.is_empty() {
        return Err(Error::Config("host cannot be empty".into()));
    }
    if host.contains('/') {
        return Err(Error::Config(format!(
            "host must be hostname[:port] without a path, got '{raw}'"
        )));
    }
    Ok((host.to_string(), None))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Resolved admin API connection settings
#[derive(Clone)]
pub struct Endpoint {
    pub base_url: Url,
    pub token: String,
    pub timeout: Duration,
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Endpoint {
    /// Merge a profile with explicit overrides; overrides win
    pub fn resolve(
        profile: Option<&Profile>,
        host: Option<&str>,
        scheme: Option<&str>,
        token: Option<&str>,
    ) -> Result<Self> {
        let host = non_empty(host).or(non_empty(profile.map(|p| p.host.as_str())));
        let token = non_empty(token).or(non_empty(profile.map(|p| p.token.as_str())));
        let (Some(host), Some(token)) = (host, token) else {
            return Err(Error::Config(
                "both 'host' and 'token' must be set or provided via GARAGE_HOST and GARAGE_TOKEN"
                    .into(),
            ));
        };

        let scheme = non_empty(scheme)
            .or(profile.map(|p| p.scheme.as_str()))
            .unwrap_or(DEFAULT_SCHEME);
        if scheme != "http" && scheme != "https" {
            return Err(Error::Config(format!(
                "scheme must be one of [http https], got '{scheme}'"
            )));
        }

        let (host, inferred) = sanitize_host(host)?;
        let scheme = inferred.as_deref().unwrap_or(scheme);
        let base_url = Url::parse(&format!("{scheme}://{host}/"))?;

        let timeout = profile
            .and_then(|p| p.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Self {
            base_url,
            token: token.to_string(),
            timeout: Duration::from_secs(timeout),
        })
    }
}
