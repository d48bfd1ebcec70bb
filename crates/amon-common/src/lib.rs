//! ---
//! amon_section: "01-core-functionality"
//! amon_subsection: "module"
//! amon_type: "source"
//! amon_scope: "code"
//! amon_description: "Shared primitives and utilities for the simulation runtime."
//! amon_version: "v0.1.0"
//! amon_owner: "tbd"
//! ---
//! Shared primitives for the Active Monitor workspace.
//! This crate exposes configuration loading, logging bootstrap, and the
//! time-unit scaling consumed by the simulation runtime.

pub mod config;
pub mod logging;
pub mod time;

pub use config::{AppConfig, LoadedAppConfig, LoggingConfig, SimulationConfig};
pub use logging::{init_tracing, LogFormat};
pub use time::TimeScale;
