//! Connection profile management
//!
//! Profiles are named admin API endpoints together with their bearer token.

use serde::{Deserialize, Serialize};

use crate::config::ConfigManager;
use crate::error::{Error, Result};

/// A named Garage admin API endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    /// Unique name for this profile
    pub name: String,

    /// `host[:port]` or a full `http(s)://host[:port]` URL
    pub host: String,

    /// "http" or "https"; a scheme in `host` takes precedence
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Admin API bearer token
    pub token: String,

    /// Request timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_scheme() -> String {
    "https".to_string()
}

impl Profile {
    pub fn new(name: impl Into<String>, host: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            scheme: default_scheme(),
            token: token.into(),
            timeout_secs: None,
        }
    }
}

/// Manager for profile operations
pub struct ProfileManager {
    config_manager: ConfigManager,
}

impl ProfileManager {
    pub fn with_config_manager(config_manager: ConfigManager) -> Self {
        Self { config_manager }
    }

    /// Create a new ProfileManager using the default config location
    pub fn new() -> Result<Self> {
        Ok(Self {
            config_manager: ConfigManager::new()?,
        })
    }

    pub fn list(&self) -> Result<Vec<Profile>> {
        Ok(self.config_manager.load()?.profiles)
    }

    pub fn get(&self, name: &str) -> Result<Profile> {
        self.config_manager
            .load()?
            .profiles
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::ProfileNotFound(name.to_string()))
    }

    /// The profile named in the configuration defaults, if any
    pub fn default_profile(&self) -> Result<Option<Profile>> {
        let config = self.config_manager.load()?;
        let Some(name) = config.defaults.profile else {
            return Ok(None);
        };
        config
            .profiles
            .into_iter()
            .find(|p| p.name == name)
            .map(Some)
            .ok_or(Error::ProfileNotFound(name))
    }

    /// Add a profile, replacing an existing one only when `overwrite` is set
    pub fn set(&self, profile: Profile, overwrite: bool) -> Result<()> {
        let mut config = self.config_manager.load()?;

        if config.profiles.iter().any(|p| p.name == profile.name) {
            if !overwrite {
                return Err(Error::ProfileExists(profile.name));
            }
            config.profiles.retain(|p| p.name != profile.name);
        }
        config.profiles.push(profile);

        self.config_manager.save(&config)
    }

    /// Make `name` the profile used when none is selected
    pub fn set_default(&self, name: &str) -> Result<()> {
        let mut config = self.config_manager.load()?;
        if !config.profiles.iter().any(|p| p.name == name) {
            return Err(Error::ProfileNotFound(name.to_string()));
        }
        config.defaults.profile = Some(name.to_string());
        self.config_manager.save(&config)
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        let mut config = self.config_manager.load()?;
        let original_len = config.profiles.len();

        config.profiles.retain(|p| p.name != name);
        if config.profiles.len() == original_len {
            return Err(Error::ProfileNotFound(name.to_string()));
        }
        if config.defaults.profile.as_deref() == Some(name) {
            config.defaults.profile = None;
        }

        self.config_manager.save(&config)
    }

    pub fn exists(&self, name: &str) -> Result<bool> {
        let config = self.config_manager.load()?;
        Ok(config.profiles.iter().any(|p| p.name == name))
    }
}
