//! ---
//! amon_section: "01-core-functionality"
//! amon_subsection: "module"
//! amon_type: "source"
//! amon_scope: "code"
//! amon_description: "Shared primitives and utilities for the simulation runtime."
//! amon_version: "v0.1.0"
//! amon_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::debug;

use crate::logging::LogFormat;
use crate::time::TimeScale;

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_time_unit() -> Duration {
    Duration::from_secs(1)
}

fn default_walk_period_units() -> f64 {
    2.0
}

fn default_fault_delay_units() -> f64 {
    10.0
}

fn default_ramp_period_units() -> f64 {
    0.2
}

fn default_simulation_seed() -> u64 {
    0xA11CEu64
}

fn default_dynamic_machines() -> Vec<String> {
    vec!["id01".to_owned()]
}

fn default_menu() -> Vec<String> {
    vec!["id01".to_owned(), "id02".to_owned()]
}

fn default_subscriber_buffer() -> usize {
    64
}

/// Primary configuration object for the monitor runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    /// `None` when no file was found and the built-in defaults are in effect.
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &'static str = "AMON_CONFIG";

    /// Load configuration from disk, respecting the `AMON_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration together with the effective source path.
    ///
    /// An explicit `AMON_CONFIG` path must exist. Candidate paths are probed in
    /// order; when none exists the defaults are returned.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                let config = Self::from_path(path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path.to_path_buf()),
                });
            }
        }

        debug!(
            inspected = candidates.len(),
            "no configuration file found; using defaults"
        );
        Ok(LoadedAppConfig {
            config: AppConfig::default(),
            source: None,
        })
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse::<AppConfig>()
            .with_context(|| format!("failed to load config file {}", path.display()))
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.simulation.validate()
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

/// Timing, seeding, and fleet designation for the simulation tasks.
///
/// Periods are expressed in time-units; `time_unit` fixes how long one unit
/// lasts on the wall clock.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_time_unit", rename = "time_unit_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub time_unit: Duration,
    #[serde(default = "default_walk_period_units")]
    pub walk_period_units: f64,
    #[serde(default = "default_fault_delay_units")]
    pub fault_delay_units: f64,
    #[serde(default = "default_ramp_period_units")]
    pub ramp_period_units: f64,
    #[serde(default = "default_simulation_seed")]
    pub random_seed: u64,
    /// Machines that receive a one-shot fault injection; at most one per kind.
    #[serde(default = "default_dynamic_machines")]
    pub dynamic_machines: Vec<String>,
    /// Initial quick-access menu.
    #[serde(default = "default_menu")]
    pub menu: Vec<String>,
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            time_unit: default_time_unit(),
            walk_period_units: default_walk_period_units(),
            fault_delay_units: default_fault_delay_units(),
            ramp_period_units: default_ramp_period_units(),
            random_seed: default_simulation_seed(),
            dynamic_machines: default_dynamic_machines(),
            menu: default_menu(),
            subscriber_buffer: default_subscriber_buffer(),
        }
    }
}

impl SimulationConfig {
    pub fn time_scale(&self) -> TimeScale {
        TimeScale::new(self.time_unit)
    }

    pub fn walk_period(&self) -> Duration {
        self.time_scale().units(self.walk_period_units)
    }

    pub fn fault_delay(&self) -> Duration {
        self.time_scale().units(self.fault_delay_units)
    }

    pub fn ramp_period(&self) -> Duration {
        self.time_scale().units(self.ramp_period_units)
    }

    pub fn is_dynamic(&self, machine_id: &str) -> bool {
        self.dynamic_machines.iter().any(|id| id == machine_id)
    }

    pub fn validate(&self) -> Result<()> {
        if self.time_unit.is_zero() {
            return Err(anyhow!("simulation.time_unit_ms must be greater than zero"));
        }
        for (name, value) in [
            ("walk_period_units", self.walk_period_units),
            ("fault_delay_units", self.fault_delay_units),
            ("ramp_period_units", self.ramp_period_units),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(anyhow!(
                    "simulation.{} must be a positive number (got {})",
                    name,
                    value
                ));
            }
            self.time_scale()
                .try_units(value)
                .with_context(|| format!("simulation.{} is out of range", name))?;
        }
        if self.subscriber_buffer == 0 {
            return Err(anyhow!("simulation.subscriber_buffer must be at least 1"));
        }
        for (index, id) in self.dynamic_machines.iter().enumerate() {
            if self.dynamic_machines[..index].contains(id) {
                return Err(anyhow!("machine '{}' is listed as dynamic twice", id));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_reference_timing() {
        let config = AppConfig::default();
        let sim = &config.simulation;
        assert_eq!(sim.walk_period(), Duration::from_secs(2));
        assert_eq!(sim.fault_delay(), Duration::from_secs(10));
        assert_eq!(sim.ramp_period(), Duration::from_millis(200));
        assert!(sim.is_dynamic("id01"));
        assert!(!sim.is_dynamic("id02"));
        assert!(!sim.is_dynamic("id03"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_partial_toml() {
        let config: AppConfig = r#"
            [simulation]
            time_unit_ms = 10
            dynamic_machines = ["id01"]

            [logging]
            format = "pretty"
        "#
        .parse()
        .expect("valid config");
        assert_eq!(config.simulation.time_unit, Duration::from_millis(10));
        assert_eq!(config.simulation.walk_period(), Duration::from_millis(20));
        assert_eq!(config.simulation.dynamic_machines, vec!["id01".to_owned()]);
        assert_eq!(config.simulation.menu, default_menu());
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn example_config_matches_defaults() {
        let config: AppConfig = include_str!("../../../configs/amond.example.toml")
            .parse()
            .expect("example config parses");
        let defaults = SimulationConfig::default();
        assert_eq!(config.simulation.time_unit, defaults.time_unit);
        assert_eq!(config.simulation.random_seed, defaults.random_seed);
        assert_eq!(config.simulation.dynamic_machines, defaults.dynamic_machines);
        assert_eq!(config.simulation.ramp_period(), defaults.ramp_period());
        assert_eq!(config.logging.format, LogFormat::StructuredJson);
    }

    #[test]
    fn rejects_non_positive_periods() {
        let err = "[simulation]\nramp_period_units = 0.0\n"
            .parse::<AppConfig>()
            .expect_err("zero ramp period must be rejected");
        assert!(err.to_string().contains("ramp_period_units"));
    }

    #[test]
    fn rejects_unrepresentable_periods() {
        let err = "[simulation]\nfault_delay_units = 1e30\n"
            .parse::<AppConfig>()
            .expect_err("an overflowing delay must be rejected");
        assert!(format!("{:#}", err).contains("fault_delay_units"));

        let err = "[simulation]\ntime_unit_ms = 9223372036854775807\n"
            .parse::<AppConfig>()
            .expect_err("an overflowing walk period must be rejected");
        assert!(format!("{:#}", err).contains("walk_period_units"));
    }

    #[test]
    fn rejects_duplicate_dynamic_machines() {
        let err = "[simulation]\ndynamic_machines = [\"id01\", \"id01\"]\n"
            .parse::<AppConfig>()
            .expect_err("duplicate ids must be rejected");
        assert!(err.to_string().contains("id01"));
    }

    #[test]
    fn loads_first_existing_candidate() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "[simulation]\nrandom_seed = 7")?;
        file.flush()?;
        let missing = PathBuf::from("does/not/exist.toml");
        let loaded = AppConfig::load_with_source(&[missing, file.path().to_path_buf()])?;
        assert_eq!(loaded.config.simulation.random_seed, 7);
        assert_eq!(loaded.source.as_deref(), Some(file.path()));
        Ok(())
    }

    #[test]
    fn falls_back_to_defaults_without_candidates() -> Result<()> {
        let loaded = AppConfig::load_with_source(&[PathBuf::from("does/not/exist.toml")])?;
        assert!(loaded.source.is_none());
        assert_eq!(loaded.config.simulation.random_seed, default_simulation_seed());
        Ok(())
    }
}
