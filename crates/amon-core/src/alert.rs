//! ---
//! amon_section: "03-runtime"
//! amon_subsection: "module"
//! amon_type: "source"
//! amon_scope: "code"
//! amon_description: "Operator alerts raised by the supervisors."
//! amon_version: "v0.1.0"
//! amon_owner: "tbd"
//! ---
use amon_sim::MachineId;
use serde::Serialize;

/// Conditions the presentation layer should surface to the operator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "alert", rename_all = "snake_case")]
pub enum Alert {
    /// A fault spike was applied; an emergency stop is advised.
    HighTemperature {
        machine_id: MachineId,
        temperature: i32,
    },
    EmergencyStop { machine_id: MachineId },
    /// The shutdown sequence finished and the machine is off.
    Stopped { machine_id: MachineId },
}

impl Alert {
    pub fn machine_id(&self) -> &MachineId {
        match self {
            Alert::HighTemperature { machine_id, .. }
            | Alert::EmergencyStop { machine_id }
            | Alert::Stopped { machine_id } => machine_id,
        }
    }
}
