use std::path::PathBuf;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{MaskfleetError, Result};

/// Main configuration structure, layered defaults <- file <- env.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub launch: LaunchConfig,

    #[serde(default)]
    pub profiles: ProfilesConfig,

    #[serde(default)]
    pub sessions: SessionsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BrowserConfig {
    /// Browser executable path (overrides auto-discovery)
    pub path: Option<String>,

    /// Default headless mode
    #[serde(default)]
    pub headless: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchConfig {
    /// Upper bound on process startup + control-channel discovery
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Interval between control-channel discovery attempts
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_poll_interval_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilesConfig {
    /// Root for per-profile browser state directories
    #[serde(default = "default_profiles_dir")]
    pub dir: PathBuf,
}

impl Default for ProfilesConfig {
    fn default() -> Self {
        Self {
            dir: default_profiles_dir(),
        }
    }
}

fn default_profiles_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("maskfleet")
        .join("profiles")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Where session records for cross-invocation lookup live
    #[serde(default = "default_sessions_dir")]
    pub dir: PathBuf,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            dir: default_sessions_dir(),
        }
    }
}

fn default_sessions_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("maskfleet")
        .join("sessions")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser: BrowserConfig::default(),
            launch: LaunchConfig::default(),
            profiles: ProfilesConfig::default(),
            sessions: SessionsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from all sources (defaults, file, env)
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            // MASKFLEET_BROWSER__PATH, MASKFLEET_LAUNCH__TIMEOUT_SECS, ...
            .merge(Env::prefixed("MASKFLEET_").split("__"))
            .extract()
            .map_err(|e| MaskfleetError::ConfigError(e.to_string()))?;

        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("maskfleet")
            .join("config.toml")
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| MaskfleetError::ConfigError(e.to_string()))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Work directory for one profile's browser state
    pub fn profile_dir(&self, profile_id: &str) -> PathBuf {
        self.profiles.dir.join(profile_id)
    }

    pub fn launch_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.launch.timeout_secs)
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.launch.poll_interval_ms)
    }
}
