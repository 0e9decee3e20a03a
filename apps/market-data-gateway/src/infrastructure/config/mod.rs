//! Configuration Module
//!
//! YAML settings with environment interpolation and `GATEWAY_*` overrides.

mod settings;

pub use settings::{
    BrokerSettings, ConfigError, DEFAULT_CONFIG_FILE, LoggingSettings, ObservabilitySettings,
    OtelSettings, QueryDefaults, ServerSettings, Settings, apply_env_overrides,
    apply_overrides_from, load_settings, load_settings_from_string, validate_settings,
};
