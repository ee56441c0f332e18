use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TriageError};

/// Environment variable prefix for configuration overrides, e.g.
/// `TRIAGE__SERVER__BIND_ADDRESS=0.0.0.0:8000`.
pub const ENV_PREFIX: &str = "TRIAGE";

/// Triage engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TriageConfig {
    /// HTTP / WebSocket server settings
    pub server: ServerConfig,

    /// Vitals simulation settings
    pub simulation: SimulationConfig,

    /// Doctor assignment settings
    pub assignment: AssignmentConfig,

    /// Logging settings
    pub logging: LogConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the API listens on
    pub bind_address: String,

    /// Attach a permissive CORS layer (dashboard runs on another origin)
    pub enable_cors: bool,

    /// Maximum number of records returned by the snapshot accessor
    pub snapshot_limit: usize,
}

/// Simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Delay between ticks in milliseconds
    pub tick_interval_ms: u64,

    /// Number of past vitals samples kept per patient
    pub history_capacity: usize,

    /// JSON dataset to seed the patient registry from
    pub dataset_path: Option<PathBuf>,

    /// Population size generated when no dataset is configured
    pub synthetic_population: usize,

    /// Snapshots buffered per stream subscriber before it is considered failed
    pub subscriber_buffer: usize,

    /// Seed for the drift RNG; entropy when absent
    pub seed: Option<u64>,
}

/// Assignment scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AssignmentConfig {
    /// Seed for the tie-break RNG; entropy when absent
    pub seed: Option<u64>,
}

/// Logging configuration as read from files / environment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default level directive, overridden by RUST_LOG
    pub level: String,

    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl TriageConfig {
    /// Load configuration: defaults, then an optional TOML file, then
    /// `TRIAGE__`-prefixed environment variables. The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(TriageError::config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: TriageConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<()> {
        self.server.socket_addr()?;

        if self.server.snapshot_limit == 0 {
            return Err(TriageError::config("snapshot_limit must be greater than 0"));
        }

        if self.simulation.tick_interval_ms == 0 {
            return Err(TriageError::config("tick_interval_ms must be greater than 0"));
        }

        if self.simulation.history_capacity == 0 {
            return Err(TriageError::config("history_capacity must be greater than 0"));
        }

        if self.simulation.subscriber_buffer == 0 {
            return Err(TriageError::config("subscriber_buffer must be greater than 0"));
        }

        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(TriageError::config(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }
}

impl ServerConfig {
    /// Parsed bind address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_address.parse().map_err(|_| {
            TriageError::config(format!("Invalid bind address: {}", self.bind_address))
        })
    }
}

impl SimulationConfig {
    /// Delay between ticks
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8000".to_string(),
            enable_cors: true,
            snapshot_limit: 50,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 2_000,
            history_capacity: crate::patient::DEFAULT_HISTORY_CAPACITY,
            dataset_path: None,
            synthetic_population: 200,
            subscriber_buffer: 16,
            seed: None,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = TriageConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.simulation.tick_interval(), Duration::from_secs(2));
        assert_eq!(config.simulation.history_capacity, 5);
        assert_eq!(config.server.snapshot_limit, 50);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = TriageConfig::default();
        config.simulation.tick_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = TriageConfig::default();
        config.simulation.history_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = TriageConfig::default();
        config.server.bind_address = "not-an-address".to_string();
        assert!(matches!(config.validate(), Err(TriageError::Config(_))));
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[server]\nbind_address = \"0.0.0.0:9100\"\n\n[simulation]\ntick_interval_ms = 500\nseed = 7\n"
        )
        .unwrap();

        let config = TriageConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:9100");
        assert_eq!(config.simulation.tick_interval_ms, 500);
        assert_eq!(config.simulation.seed, Some(7));
        // untouched sections keep their defaults
        assert_eq!(config.server.snapshot_limit, 50);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = TriageConfig::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, TriageError::Config(_)));
    }
}
