//! Settings file for the cipherpost CLI.

use cipherpost_transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// CLI settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Record locations
    #[serde(default)]
    pub files: FilesSettings,
    /// Connection settings
    #[serde(default)]
    pub network: NetworkSettings,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Record locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesSettings {
    /// Transfer configuration record
    #[serde(default = "default_transfer_info")]
    pub transfer_info: PathBuf,
    /// Identity record
    #[serde(default = "default_identity")]
    pub identity: PathBuf,
}

/// Connection settings. A read or write timeout of 0 waits forever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Read timeout in seconds
    #[serde(default = "default_io_timeout")]
    pub read_timeout_secs: u64,
    /// Write timeout in seconds
    #[serde(default = "default_io_timeout")]
    pub write_timeout_secs: u64,
    /// Disable Nagle's algorithm
    #[serde(default = "default_true")]
    pub nodelay: bool,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level, overridden by `RUST_LOG` and `--verbose`
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_transfer_info() -> PathBuf {
    PathBuf::from("transfer.info")
}

fn default_identity() -> PathBuf {
    PathBuf::from("me.info")
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_io_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for FilesSettings {
    fn default() -> Self {
        Self {
            transfer_info: default_transfer_info(),
            identity: default_identity(),
        }
    }
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_io_timeout(),
            write_timeout_secs: default_io_timeout(),
            nodelay: true,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

const MAX_TIMEOUT_SECS: u64 = 3600;

impl Settings {
    /// Load settings from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let settings: Self = toml::from_str(&contents)?;
        Ok(settings)
    }

    /// Get default settings path
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("cipherpost/config.toml")
    }

    /// Load settings from the default path, or defaults if there is no file
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default() -> anyhow::Result<Self> {
        let path = Self::default_path();

        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Transport settings for a session
    #[must_use]
    pub fn transport_config(&self) -> TransportConfig {
        let optional = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));
        TransportConfig {
            connect_timeout: Duration::from_secs(self.network.connect_timeout_secs),
            read_timeout: optional(self.network.read_timeout_secs),
            write_timeout: optional(self.network.write_timeout_secs),
            nodelay: self.network.nodelay,
        }
    }

    /// Validate settings
    ///
    /// # Errors
    ///
    /// Returns an error if settings are invalid.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.network.connect_timeout_secs == 0
            || self.network.connect_timeout_secs > MAX_TIMEOUT_SECS
        {
            anyhow::bail!("Connect timeout must be between 1 and {MAX_TIMEOUT_SECS} seconds");
        }

        for (name, secs) in [
            ("Read", self.network.read_timeout_secs),
            ("Write", self.network.write_timeout_secs),
        ] {
            if secs > MAX_TIMEOUT_SECS {
                anyhow::bail!("{name} timeout must be at most {MAX_TIMEOUT_SECS} seconds");
            }
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            );
        }

        if self.files.transfer_info.as_os_str().is_empty()
            || self.files.identity.as_os_str().is_empty()
        {
            anyhow::bail!("Record paths must not be empty");
        }

        Ok(())
    }
}
