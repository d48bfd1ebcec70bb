//! ---
//! amon_section: "02-simulation"
//! amon_subsection: "module"
//! amon_type: "source"
//! amon_scope: "code"
//! amon_description: "Machine record data model."
//! amon_version: "v0.1.0"
//! amon_owner: "tbd"
//! ---
use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{boiler, conveyor, Bounds};
use crate::fault::FAULT_TEMPERATURE;

/// Stable machine identifier, e.g. the payload of a scanned code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MachineId(String);

impl MachineId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for MachineId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MachineId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineKind {
    Conveyor,
    Boiler,
}

impl fmt::Display for MachineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineKind::Conveyor => f.write_str("conveyor"),
            MachineKind::Boiler => f.write_str("boiler"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MachineStatus {
    On,
    Off,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConveyorReadings {
    pub load_capacity: Option<i32>,
    pub belt_tension: Option<i32>,
    pub vibration: Option<f64>,
    /// Cumulative hours; only ever grows.
    pub operating_time: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoilerReadings {
    pub pressure: Option<i32>,
    pub water_level: Option<i32>,
    pub heat_output: Option<i32>,
    pub co2_emission: Option<i32>,
    pub maintenance_cycles: Option<String>,
}

/// Kind-specific field group. The variant fixes the machine kind, so a record
/// can never switch groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Extension {
    Conveyor(ConveyorReadings),
    Boiler(BoilerReadings),
}

impl Extension {
    pub fn kind(&self) -> MachineKind {
        match self {
            Extension::Conveyor(_) => MachineKind::Conveyor,
            Extension::Boiler(_) => MachineKind::Boiler,
        }
    }

    /// Presence mask of the optional fields, in declaration order.
    pub fn layout(&self) -> Vec<bool> {
        match self {
            Extension::Conveyor(c) => vec![
                c.load_capacity.is_some(),
                c.belt_tension.is_some(),
                c.vibration.is_some(),
                c.operating_time.is_some(),
            ],
            Extension::Boiler(b) => vec![
                b.pressure.is_some(),
                b.water_level.is_some(),
                b.heat_output.is_some(),
                b.co2_emission.is_some(),
                b.maintenance_cycles.is_some(),
            ],
        }
    }
}

/// Mutable state of one machine for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineRecord {
    pub id: MachineId,
    pub name: String,
    pub location: String,
    pub status: MachineStatus,
    pub temperature: i32,
    pub rate: i32,
    pub extension: Extension,
    pub fault_spiked: bool,
    /// Oldest first; append-only.
    pub event_log: Vec<String>,
}

/// One populated numeric field, flattened for bound and rest checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub field: &'static str,
    pub value: f64,
    pub bounds: Bounds<f64>,
    /// Whether an emergency stop drives this field to zero.
    pub ramped: bool,
}

impl Reading {
    fn int(field: &'static str, value: i32, bounds: Bounds<i32>) -> Self {
        Self {
            field,
            value: f64::from(value),
            bounds: Bounds::new(f64::from(bounds.min), f64::from(bounds.max)),
            ramped: true,
        }
    }
}

impl MachineRecord {
    pub fn kind(&self) -> MachineKind {
        self.extension.kind()
    }

    pub fn is_on(&self) -> bool {
        self.status == MachineStatus::On
    }

    /// Temperature domain, widened to admit the fault sentinel once a fault
    /// has been spiked.
    pub fn temperature_bounds(&self) -> Bounds<i32> {
        let declared = self.kind().core_profile().temperature.bounds;
        if self.fault_spiked {
            Bounds::new(declared.min, declared.max.max(FAULT_TEMPERATURE))
        } else {
            declared
        }
    }

    /// Every populated numeric field with its permitted domain.
    pub fn readings(&self) -> Vec<Reading> {
        let core = self.kind().core_profile();
        let mut readings = vec![
            Reading::int("temperature", self.temperature, self.temperature_bounds()),
            Reading::int("rate", self.rate, core.rate.bounds),
        ];
        match &self.extension {
            Extension::Conveyor(c) => {
                if let Some(value) = c.load_capacity {
                    readings.push(Reading::int(
                        "load_capacity",
                        value,
                        conveyor::LOAD_CAPACITY.bounds,
                    ));
                }
                if let Some(value) = c.belt_tension {
                    readings.push(Reading::int(
                        "belt_tension",
                        value,
                        conveyor::BELT_TENSION.bounds,
                    ));
                }
                if let Some(value) = c.vibration {
                    readings.push(Reading {
                        field: "vibration",
                        value,
                        bounds: conveyor::VIBRATION.bounds,
                        ramped: true,
                    });
                }
                if let Some(value) = c.operating_time {
                    readings.push(Reading {
                        field: "operating_time",
                        value: f64::from(value),
                        bounds: Bounds::new(0.0, f64::from(u32::MAX)),
                        ramped: false,
                    });
                }
            }
            Extension::Boiler(b) => {
                for (field, value, profile) in [
                    ("pressure", b.pressure, boiler::PRESSURE),
                    ("water_level", b.water_level, boiler::WATER_LEVEL),
                    ("heat_output", b.heat_output, boiler::HEAT_OUTPUT),
                    ("co2_emission", b.co2_emission, boiler::CO2_EMISSION),
                ] {
                    if let Some(value) = value {
                        readings.push(Reading::int(field, value, profile.bounds));
                    }
                }
            }
        }
        readings
    }
}
