//! Bootstrap configuration loading
//!
//! Only bootstrap concerns live here (database location, listen address,
//! logging). Values are resolved in priority order:
//! 1. Command-line argument or its environment fallback (handled by clap in the binary)
//! 2. TOML config file
//! 3. OS-dependent compiled default
//!
//! A missing TOML file is not an error. A malformed one is.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default HTTP port for the split service
pub const DEFAULT_PORT: u16 = 5810;

/// Default listen host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Configuration loaded from the TOML file
///
/// Every field is optional so a partial file only overrides what it names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Path to the SQLite database file
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Listen host
    #[serde(default)]
    pub host: Option<String>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default)]
    pub level: Option<String>,
}

/// Compiled-in defaults used when neither CLI nor TOML supply a value
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub database_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl CompiledDefaults {
    /// Defaults for the platform we were compiled for
    pub fn for_current_platform() -> Self {
        let data_dir = if cfg!(target_os = "linux") {
            // ~/.local/share/orthoplus (or /var/lib/orthoplus for system-wide)
            dirs::data_local_dir()
                .map(|d| d.join("orthoplus"))
                .unwrap_or_else(|| PathBuf::from("/var/lib/orthoplus"))
        } else if cfg!(target_os = "macos") {
            dirs::data_dir()
                .map(|d| d.join("orthoplus"))
                .unwrap_or_else(|| PathBuf::from("/Library/Application Support/orthoplus"))
        } else if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .map(|d| d.join("orthoplus"))
                .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\orthoplus"))
        } else {
            PathBuf::from("./orthoplus_data")
        };

        Self {
            database_path: data_dir.join("orthoplus.db"),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_level: "info".to_string(),
        }
    }
}

/// Values supplied on the command line (or through clap's `env` fallbacks)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

/// Fully resolved bootstrap configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub database_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// TOML file that contributed values, if any
    pub config_file: Option<PathBuf>,
}

impl ServiceConfig {
    /// Resolve configuration from overrides, TOML file and compiled defaults
    ///
    /// An explicitly requested config file must exist. The implicit
    /// per-user/system file is optional.
    pub fn resolve(mut overrides: ConfigOverrides) -> Result<Self> {
        let config_file = match overrides.config_file.take() {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                Some(path)
            }
            None => default_config_file(),
        };

        let toml_config = match &config_file {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                load_toml_config(path)?
            }
            None => {
                warn!("No config file found, using compiled defaults");
                TomlConfig::default()
            }
        };

        Ok(Self::merge(overrides, toml_config, config_file))
    }

    fn merge(
        overrides: ConfigOverrides,
        toml_config: TomlConfig,
        config_file: Option<PathBuf>,
    ) -> Self {
        let defaults = CompiledDefaults::for_current_platform();

        Self {
            database_path: overrides
                .database_path
                .or(toml_config.database_path)
                .unwrap_or(defaults.database_path),
            host: overrides.host.or(toml_config.host).unwrap_or(defaults.host),
            port: overrides.port.or(toml_config.port).unwrap_or(defaults.port),
            log_level: overrides
                .log_level
                .or(toml_config.logging.level)
                .unwrap_or(defaults.log_level),
            config_file,
        }
    }

    /// Address string suitable for `TcpListener::bind`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid TOML in {}: {}", path.display(), e)))
}

/// Locate the implicit config file
///
/// Tries the per-user file (`$XDG_CONFIG_HOME/orthoplus/config.toml` on Linux)
/// first, then `/etc/orthoplus/config.toml` on Linux.
pub fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("orthoplus").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/orthoplus/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}
