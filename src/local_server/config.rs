//! Server configuration
//!
//! Loads and saves `settings.yaml` in the config directory, with
//! environment overrides for the port and the CORS origins.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::analytics::FuelPricing;
use crate::error::AppError;

/// Default port number
pub const DEFAULT_PORT: u16 = 3001;

/// Default bind address
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Config file name
const CONFIG_FILENAME: &str = "settings.yaml";

/// Default database file name inside the config directory
const DEFAULT_DATABASE_FILE: &str = "emsys.db";

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,
    /// SQLite file, relative to the config directory unless absolute
    #[serde(default = "default_database_file")]
    pub database_file: String,
    /// CORS origins; empty allows any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// Fuel price per liter used by the fuel endpoints
    #[serde(default = "default_fuel_price")]
    pub fuel_price: f64,
    /// Expected seconds between readings
    #[serde(default = "default_sample_interval")]
    pub sample_interval_secs: u64,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_database_file() -> String {
    DEFAULT_DATABASE_FILE.to_string()
}

fn default_fuel_price() -> f64 {
    FuelPricing::default().price_per_liter
}

fn default_sample_interval() -> u64 {
    FuelPricing::default().sample_interval_secs
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: default_host(),
            database_file: default_database_file(),
            allowed_origins: Vec::new(),
            fuel_price: default_fuel_price(),
            sample_interval_secs: default_sample_interval(),
        }
    }
}

impl ServerConfig {
    /// Load the config from a config directory
    ///
    /// # Returns
    /// The stored config, or defaults when the file is missing or unreadable
    pub fn load(config_dir: &Path) -> Self {
        let config_path = config_dir.join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&config_path) {
            Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %config_path.display(), error = %e, "invalid config file, using defaults");
                Self::default()
            }),
            Err(e) => {
                tracing::warn!(path = %config_path.display(), error = %e, "unreadable config file, using defaults");
                Self::default()
            }
        }
    }

    /// Load the config and apply `PORT` / `ALLOWED_ORIGINS` from the environment
    pub fn load_with_env(config_dir: &Path) -> Self {
        let mut config = Self::load(config_dir);
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply overrides from a variable lookup
    ///
    /// `PORT` must parse as a valid port; `ALLOWED_ORIGINS` is comma separated.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup("PORT") {
            match raw.trim().parse::<u16>() {
                Ok(port) if Self::validate_port(port).is_ok() => self.port = port,
                _ => tracing::warn!(value = %raw, "ignoring invalid PORT override"),
            }
        }

        if let Some(raw) = lookup("ALLOWED_ORIGINS") {
            self.allowed_origins = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
    }

    /// Save the config to a config directory
    pub fn save(&self, config_dir: &Path) -> Result<(), AppError> {
        let config_path = config_dir.join(CONFIG_FILENAME);

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
        }

        let content = serde_yaml::to_string(self)
            .map_err(|e| AppError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, content)?;
        Ok(())
    }

    /// Validate a port number
    ///
    /// Ports must be in 1024-65535
    pub fn validate_port(port: u16) -> Result<(), AppError> {
        if port < 1024 {
            return Err(AppError::Validation(
                "Port must be >= 1024 (non-privileged ports)".to_string(),
            ));
        }
        Ok(())
    }

    /// Full path of the config file
    pub fn config_path(config_dir: &Path) -> PathBuf {
        config_dir.join(CONFIG_FILENAME)
    }

    /// Resolved database path
    pub fn database_path(&self, config_dir: &Path) -> PathBuf {
        let file = Path::new(&self.database_file);
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            config_dir.join(file)
        }
    }

    /// Fuel pricing for the analytics endpoints
    pub fn pricing(&self) -> FuelPricing {
        FuelPricing {
            price_per_liter: self.fuel_price,
            sample_interval_secs: self.sample_interval_secs,
        }
    }
}

/// Default config directory: `<data dir>/emsys`
pub fn default_config_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("emsys"))
        .unwrap_or_else(|| PathBuf::from(".emsys"))
}

#[cfg(test)]
mod config_tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.database_file, "emsys.db");
        assert!(config.allowed_origins.is_empty());
        assert_eq!(config.pricing(), FuelPricing::default());
    }

    #[test]
    fn test_load_nonexistent_config() {
        let dir = tempdir().unwrap();
        let config = ServerConfig::load(dir.path());
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_save_and_load_config() {
        let dir = tempdir().unwrap();
        let config = ServerConfig {
            port: 12345,
            allowed_origins: vec!["http://localhost:5173".to_string()],
            fuel_price: 16500.0,
            ..Default::default()
        };

        config.save(dir.path()).unwrap();

        let loaded = ServerConfig::load(dir.path());
        assert_eq!(loaded, config);
        assert!(ServerConfig::config_path(dir.path()).exists());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        fs::write(ServerConfig::config_path(dir.path()), "port: 4100\n").unwrap();

        let config = ServerConfig::load(dir.path());
        assert_eq!(config.port, 4100);
        assert_eq!(config.sample_interval_secs, 300);
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        fs::write(ServerConfig::config_path(dir.path()), "port: [not, a, port]\n").unwrap();

        assert_eq!(ServerConfig::load(dir.path()), ServerConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ServerConfig::default();
        config.apply_overrides(lookup(&[
            ("PORT", "8080"),
            ("ALLOWED_ORIGINS", "http://a.test, http://b.test,,"),
        ]));

        assert_eq!(config.port, 8080);
        assert_eq!(config.allowed_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn test_invalid_port_override_is_ignored() {
        let mut config = ServerConfig::default();
        config.apply_overrides(lookup(&[("PORT", "80")]));
        assert_eq!(config.port, DEFAULT_PORT);

        config.apply_overrides(lookup(&[("PORT", "not-a-port")]));
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_validate_port() {
        assert!(ServerConfig::validate_port(1024).is_ok());
        assert!(ServerConfig::validate_port(3001).is_ok());
        assert!(ServerConfig::validate_port(65535).is_ok());
        assert!(ServerConfig::validate_port(1023).is_err());
        assert!(ServerConfig::validate_port(80).is_err());
    }

    #[test]
    fn test_database_path() {
        let dir = tempdir().unwrap();
        let config = ServerConfig::default();
        assert_eq!(config.database_path(dir.path()), dir.path().join("emsys.db"));

        let absolute = dir.path().join("elsewhere.db");
        let config = ServerConfig {
            database_file: absolute.to_string_lossy().into_owned(),
            ..Default::default()
        };
        assert_eq!(config.database_path(Path::new("/unused")), absolute);
    }
}
