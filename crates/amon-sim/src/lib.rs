//! ---
//! amon_section: "02-simulation"
//! amon_subsection: "01-bootstrap"
//! amon_type: "source"
//! amon_scope: "code"
//! amon_description: "Machine model module exports and shared types."
//! amon_version: "v0.1.0"
//! amon_owner: "tbd"
//! ---
//! Machine model and telemetry step functions for Active Monitor.
//!
//! Everything in this crate is pure: each step takes a [`MachineRecord`] and
//! returns the next full snapshot. Scheduling and the single-writer discipline
//! live in `amon-core`.

pub mod domain;
pub mod fault;
pub mod invariants;
pub mod machine;
pub mod ramp;
pub mod seed;
pub mod severity;
pub mod walk;

pub use domain::{Bounds, CoreProfile, FieldProfile};
pub use fault::{spike_temperature, FAULT_TEMPERATURE};
pub use invariants::{check_record, check_transition, InvariantViolation};
pub use machine::{
    BoilerReadings, ConveyorReadings, Extension, MachineId, MachineKind, MachineRecord,
    MachineStatus, Reading,
};
pub use ramp::{emergency_stop, is_at_rest, power_off, ramp_step};
pub use seed::{default_fleet, synthetic_event_log};
pub use severity::Severity;
pub use walk::random_walk_step;
