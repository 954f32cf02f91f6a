//! Adapter configuration.
//!
//! Serial link settings and channel sizes for one adapter instance, loadable
//! from TOML:
//!
//! ```toml
//! instance_id = "dongle-1"
//! port = "/dev/ttyACM0"
//! baud_rate = 1000000
//! flow_control = "hardware"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use ble_adapter_types::{FlowControl, Parity};

use crate::transport::SerialSettings;

/// Default serial baud rate of the radio firmware.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Configuration of one adapter instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Identifier reported in [`AdapterState::instance_id`](ble_adapter_types::AdapterState).
    pub instance_id: String,
    /// Serial port the radio is attached to.
    pub port: String,
    pub baud_rate: u32,
    pub parity: Parity,
    pub flow_control: FlowControl,
    /// Bound of the transport-to-adapter event and log channels.
    pub event_channel_capacity: usize,
    /// Unread notifications buffered per subscriber.
    pub notification_capacity: usize,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            instance_id: "adapter-0".to_string(),
            port: "/dev/ttyACM0".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            parity: Parity::None,
            flow_control: FlowControl::None,
            event_channel_capacity: 64,
            notification_capacity: 100,
        }
    }
}

impl AdapterConfig {
    /// Configuration for `port` with default serial settings.
    pub fn new(instance_id: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            port: port.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    #[must_use]
    pub fn parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    #[must_use]
    pub fn flow_control(mut self, flow_control: FlowControl) -> Self {
        self.flow_control = flow_control;
        self
    }

    #[must_use]
    pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    #[must_use]
    pub fn notification_capacity(mut self, capacity: usize) -> Self {
        self.notification_capacity = capacity;
        self
    }

    /// Serial settings passed to [`Transport::open`](crate::Transport::open).
    pub fn serial_settings(&self) -> SerialSettings {
        SerialSettings {
            baud_rate: self.baud_rate,
            parity: self.parity,
            flow_control: self.flow_control,
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Toml)
    }

    /// Render configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = self.to_toml_string()?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return any errors.
    ///
    /// This checks:
    /// - Instance id and port are not empty
    /// - Baud rate is not zero
    /// - Channel capacities are not zero (tokio channels panic on zero)
    ///
    /// # Example
    ///
    /// ```
    /// use ble_adapter_core::AdapterConfig;
    ///
    /// let config = AdapterConfig::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        let mut check = |ok: bool, field: &str, message: &str| {
            if !ok {
                errors.push(ValidationError {
                    field: field.to_string(),
                    message: message.to_string(),
                });
            }
        };

        check(
            !self.instance_id.trim().is_empty(),
            "instance_id",
            "instance id cannot be empty",
        );
        check(!self.port.trim().is_empty(), "port", "serial port cannot be empty");
        check(self.baud_rate > 0, "baud_rate", "baud rate must be positive");
        check(
            self.event_channel_capacity > 0,
            "event_channel_capacity",
            "capacity must be at least 1",
        );
        check(
            self.notification_capacity > 0,
            "notification_capacity",
            "capacity must be at least 1",
        );

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to parse config: {0}")]
    Toml(toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The offending field.
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}
