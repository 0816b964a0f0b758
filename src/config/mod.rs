mod settings;

pub use settings::{Config, LoggingConfig, TomlConfig, EXAMPLE_CONFIG};
