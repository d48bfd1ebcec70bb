//! ---
//! amon_section: "02-simulation"
//! amon_subsection: "module"
//! amon_type: "source"
//! amon_scope: "code"
//! amon_description: "Domain and transition invariants for proposed snapshots."
//! amon_version: "v0.1.0"
//! amon_owner: "tbd"
//! ---
use thiserror::Error;

use crate::machine::{Extension, MachineId, MachineRecord, MachineStatus};
use crate::ramp::first_active_reading;

/// A proposed snapshot that breaks a record invariant. Producers clamp every
/// value, so any of these indicates a defect in the producer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    #[error("machine {machine_id}: {field} = {value} outside [{min}, {max}]")]
    OutOfDomain {
        machine_id: MachineId,
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("machine {machine_id} is off but {field} is not zero")]
    OffNotAtRest {
        machine_id: MachineId,
        field: &'static str,
    },
    #[error("snapshot for machine {expected} changed an immutable attribute ({attribute})")]
    IdentityChanged {
        expected: MachineId,
        attribute: &'static str,
    },
    #[error("machine {machine_id} changed its field layout")]
    LayoutChanged { machine_id: MachineId },
    #[error("machine {machine_id} cleared its fault flag")]
    FaultCleared { machine_id: MachineId },
    #[error("machine {machine_id} rewrote its event log ({previous} -> {next} entries)")]
    EventLogRewritten {
        machine_id: MachineId,
        previous: usize,
        next: usize,
    },
    #[error("machine {machine_id} operating time went backwards ({previous} -> {next})")]
    OperatingTimeDecreased {
        machine_id: MachineId,
        previous: u32,
        next: u32,
    },
    #[error("machine {machine_id} was switched back on by a snapshot")]
    StatusRevived { machine_id: MachineId },
}

/// Checks the invariants that hold for any single snapshot.
pub fn check_record(record: &MachineRecord) -> Result<(), InvariantViolation> {
    for reading in record.readings() {
        if !reading.value.is_finite() || !reading.bounds.contains(reading.value) {
            return Err(InvariantViolation::OutOfDomain {
                machine_id: record.id.clone(),
                field: reading.field,
                value: reading.value,
                min: reading.bounds.min,
                max: reading.bounds.max,
            });
        }
    }
    if record.status == MachineStatus::Off {
        if let Some(field) = first_active_reading(record) {
            return Err(InvariantViolation::OffNotAtRest {
                machine_id: record.id.clone(),
                field,
            });
        }
    }
    Ok(())
}

/// Checks `next` on its own and as the successor of `previous`.
pub fn check_transition(
    previous: &MachineRecord,
    next: &MachineRecord,
) -> Result<(), InvariantViolation> {
    let machine_id = || previous.id.clone();
    for (attribute, unchanged) in [
        ("id", previous.id == next.id),
        ("name", previous.name == next.name),
        ("location", previous.location == next.location),
    ] {
        if !unchanged {
            return Err(InvariantViolation::IdentityChanged {
                expected: machine_id(),
                attribute,
            });
        }
    }
    if previous.kind() != next.kind() || previous.extension.layout() != next.extension.layout() {
        return Err(InvariantViolation::LayoutChanged {
            machine_id: machine_id(),
        });
    }
    if previous.fault_spiked && !next.fault_spiked {
        return Err(InvariantViolation::FaultCleared {
            machine_id: machine_id(),
        });
    }
    if !next.event_log.starts_with(&previous.event_log) {
        return Err(InvariantViolation::EventLogRewritten {
            machine_id: machine_id(),
            previous: previous.event_log.len(),
            next: next.event_log.len(),
        });
    }
    if let (Extension::Conveyor(before), Extension::Conveyor(after)) =
        (&previous.extension, &next.extension)
    {
        if let (Some(previous_hours), Some(next_hours)) =
            (before.operating_time, after.operating_time)
        {
            if next_hours < previous_hours {
                return Err(InvariantViolation::OperatingTimeDecreased {
                    machine_id: machine_id(),
                    previous: previous_hours,
                    next: next_hours,
                });
            }
        }
    }
    if previous.status == MachineStatus::Off && next.status == MachineStatus::On {
        return Err(InvariantViolation::StatusRevived {
            machine_id: machine_id(),
        });
    }
    check_record(next)
}
