use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::relay::BrokerConfig;
use crate::util::paths::config_path;

/// Example configuration file contents (bundled with the binary)
pub const EXAMPLE_CONFIG: &str = include_str!("config.toml.example");

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Relay broker behaviour
    pub relay: BrokerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Default filter directive, used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// TOML representation of the config file. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Relay configuration
    pub relay: Option<TomlRelayConfig>,
    /// Logging configuration
    pub logging: Option<TomlLoggingConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlRelayConfig {
    pub require_discriminator: Option<bool>,
    pub max_queue_len: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlLoggingConfig {
    pub level: Option<String>,
}

impl Config {
    /// Load configuration from disk, falling back to defaults.
    pub fn load() -> Self {
        let config_file = config_path();

        // Create example config on first run
        if !config_file.exists() {
            Self::create_default_config(&config_file);
        }

        Self::load_from(&config_file)
    }

    /// Load configuration from `path`. Missing or unparseable files yield defaults.
    pub fn load_from(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => return Config::default(),
        };

        match Self::parse(&contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse config file, using defaults"
                );
                Config::default()
            }
        }
    }

    /// Parse config file contents, merging them over the defaults.
    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        let toml_config = toml::from_str::<TomlConfig>(contents)?;
        let mut config = Config::default();

        // Load relay configuration
        if let Some(relay) = toml_config.relay {
            if let Some(require_discriminator) = relay.require_discriminator {
                config.relay.require_discriminator = require_discriminator;
            }
            if let Some(max_queue_len) = relay.max_queue_len {
                config.relay.max_queue_len = Some(max_queue_len);
            }
        }

        // Load logging configuration
        if let Some(level) = toml_config.logging.and_then(|logging| logging.level) {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Create the default config file from the bundled example
    fn create_default_config(path: &Path) {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                if let Err(e) = fs::create_dir_all(parent) {
                    eprintln!("Failed to create config directory: {}", e);
                    return;
                }
            }
        }

        // Write the example config
        if let Err(e) = fs::write(path, EXAMPLE_CONFIG) {
            eprintln!("Failed to write default config: {}", e);
        }
    }
}
