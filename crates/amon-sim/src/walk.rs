//! ---
//! amon_section: "02-simulation"
//! amon_subsection: "module"
//! amon_type: "source"
//! amon_scope: "code"
//! amon_description: "Bounded random-walk telemetry step."
//! amon_version: "v0.1.0"
//! amon_owner: "tbd"
//! ---
use rand::Rng;

use crate::domain::{boiler, conveyor, FieldProfile};
use crate::machine::{Extension, MachineRecord};

/// Next random-walk snapshot.
///
/// Every populated numeric field moves by a symmetric bounded offset and is
/// clamped to its domain; the operating-time counter advances by a fixed step
/// and the maintenance note is rerolled. Once a fault has been spiked the
/// temperature is held where the spike left it.
pub fn random_walk_step<R: Rng + ?Sized>(record: &MachineRecord, rng: &mut R) -> MachineRecord {
    let mut next = record.clone();
    let core = record.kind().core_profile();
    if !record.fault_spiked {
        next.temperature = walk(record.temperature, &core.temperature, rng);
    }
    next.rate = walk(record.rate, &core.rate, rng);

    match &mut next.extension {
        Extension::Conveyor(c) => {
            walk_field(&mut c.load_capacity, &conveyor::LOAD_CAPACITY, rng);
            walk_field(&mut c.belt_tension, &conveyor::BELT_TENSION, rng);
            if let Some(vibration) = c.vibration.as_mut() {
                let spread = conveyor::VIBRATION.walk_spread;
                *vibration = conveyor::VIBRATION
                    .bounds
                    .clamp(*vibration + rng.gen_range(-spread..=spread));
            }
            if let Some(hours) = c.operating_time.as_mut() {
                *hours = hours.saturating_add(conveyor::OPERATING_TIME_STEP);
            }
        }
        Extension::Boiler(b) => {
            walk_field(&mut b.pressure, &boiler::PRESSURE, rng);
            walk_field(&mut b.water_level, &boiler::WATER_LEVEL, rng);
            walk_field(&mut b.heat_output, &boiler::HEAT_OUTPUT, rng);
            walk_field(&mut b.co2_emission, &boiler::CO2_EMISSION, rng);
            if let Some(note) = b.maintenance_cycles.as_mut() {
                *note = boiler::maintenance_note(rng.gen_range(boiler::MAINTENANCE_HOURS));
            }
        }
    }
    next
}

fn walk<R: Rng + ?Sized>(value: i32, profile: &FieldProfile<i32>, rng: &mut R) -> i32 {
    let offset = rng.gen_range(-profile.walk_spread..=profile.walk_spread);
    profile.bounds.clamp(value.saturating_add(offset))
}

fn walk_field<R: Rng + ?Sized>(field: &mut Option<i32>, profile: &FieldProfile<i32>, rng: &mut R) {
    if let Some(value) = field.as_mut() {
        *value = walk(*value, profile, rng);
    }
}
