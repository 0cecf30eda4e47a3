//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `fieldhub.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Simulation loop settings.
    pub simulation: SimulationConfig,
    /// Devices populated at start-up.
    pub plant: PlantConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Built-in demo clients.
    pub clients: ClientsConfig,
}

/// Simulation loop configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Tick period in milliseconds.
    pub tick_interval_ms: u64,
}

/// Virtual plant configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PlantConfig {
    /// One process unit is registered per name, in order.
    pub devices: Vec<String>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Demo client toggles.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ClientsConfig {
    /// Polling monitor period in milliseconds; `0` disables the monitor.
    pub monitor_interval_ms: u64,
    /// Device the one-shot request/response client reads and resets, if any.
    pub request_device: Option<String>,
    /// Device the pub/sub client subscribes to, if any.
    pub subscribe_device: Option<String>,
    /// Sampling interval of the pub/sub client in milliseconds.
    pub subscription_interval_ms: u64,
}

impl Config {
    /// Load configuration from `fieldhub.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("fieldhub.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(val) = var("FIELDHUB_TICK_MS") {
            self.simulation.tick_interval_ms = val.trim().parse().map_err(|_| {
                ConfigError::Validation(format!("FIELDHUB_TICK_MS must be an integer, got {val:?}"))
            })?;
        }
        if let Some(val) = var("FIELDHUB_DEVICES") {
            self.plant.devices = val
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(ToString::to_string)
                .collect();
        }
        if let Some(val) = var("FIELDHUB_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation.tick_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "tick interval must be non-zero".to_string(),
            ));
        }
        if self.plant.devices.is_empty() {
            return Err(ConfigError::Validation(
                "at least one device must be configured".to_string(),
            ));
        }
        if self.plant.devices.iter().any(|name| name.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "device names must not be empty".to_string(),
            ));
        }
        if self.clients.subscribe_device.is_some() && self.clients.subscription_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "subscription interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.simulation.tick_interval_ms)
    }

    /// Polling monitor period, or `None` when the monitor is disabled.
    #[must_use]
    pub fn monitor_period(&self) -> Option<Duration> {
        (self.clients.monitor_interval_ms > 0)
            .then(|| Duration::from_millis(self.clients.monitor_interval_ms))
    }

    #[must_use]
    pub fn subscription_interval(&self) -> Duration {
        Duration::from_millis(self.clients.subscription_interval_ms)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 2000,
        }
    }
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            devices: fieldhub_adapter_virtual::DEFAULT_DEVICES
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "fieldhubd=info,fieldhub_app=info,fieldhub_adapter_virtual=info".to_string(),
        }
    }
}

impl Default for ClientsConfig {
    fn default() -> Self {
        Self {
            monitor_interval_ms: 2000,
            request_device: Some("Pump_2".to_string()),
            subscribe_device: Some("Boiler_1".to_string()),
            subscription_interval_ms: 1000,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
