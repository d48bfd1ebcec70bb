//! ---
//! amon_section: "02-simulation"
//! amon_subsection: "module"
//! amon_type: "source"
//! amon_scope: "code"
//! amon_description: "Emergency-stop ramp toward rest."
//! amon_version: "v0.1.0"
//! amon_owner: "tbd"
//! ---
//! Step functions for the emergency-stop sequence.
//!
//! The sequence is `emergency_stop` once, `ramp_step` until [`is_at_rest`]
//! holds, then `power_off` once. Every ramped field moves monotonically toward
//! zero and saturates there.

use crate::domain::{boiler, conveyor};
use crate::machine::{Extension, MachineRecord, MachineStatus};

/// Snapshot that records the stop request in the event log; readings are untouched.
pub fn emergency_stop(record: &MachineRecord) -> MachineRecord {
    let mut next = record.clone();
    next.event_log
        .push(format!("Emergency Stop triggered (machine {})", record.id));
    next
}

pub fn ramp_step(record: &MachineRecord) -> MachineRecord {
    let mut next = record.clone();
    let core = record.kind().core_profile();
    next.temperature = descend(record.temperature, core.temperature.ramp_step);
    next.rate = descend(record.rate, core.rate.ramp_step);
    match &mut next.extension {
        Extension::Conveyor(c) => {
            descend_field(&mut c.load_capacity, conveyor::LOAD_CAPACITY.ramp_step);
            descend_field(&mut c.belt_tension, conveyor::BELT_TENSION.ramp_step);
            if let Some(vibration) = c.vibration.as_mut() {
                *vibration = (*vibration - conveyor::VIBRATION.ramp_step).max(0.0);
            }
        }
        Extension::Boiler(b) => {
            descend_field(&mut b.pressure, boiler::PRESSURE.ramp_step);
            descend_field(&mut b.water_level, boiler::WATER_LEVEL.ramp_step);
            descend_field(&mut b.heat_output, boiler::HEAT_OUTPUT.ramp_step);
            descend_field(&mut b.co2_emission, boiler::CO2_EMISSION.ramp_step);
        }
    }
    next
}

/// True once every ramped reading is zero. The operating-time counter is not a
/// live reading and does not take part.
pub fn is_at_rest(record: &MachineRecord) -> bool {
    first_active_reading(record).is_none()
}

/// Name of the first ramped reading that is still above zero.
pub fn first_active_reading(record: &MachineRecord) -> Option<&'static str> {
    record
        .readings()
        .into_iter()
        .find(|reading| reading.ramped && reading.value != 0.0)
        .map(|reading| reading.field)
}

/// Final snapshot of the sequence.
pub fn power_off(record: &MachineRecord) -> MachineRecord {
    let mut next = record.clone();
    next.status = MachineStatus::Off;
    next
}

fn descend(value: i32, step: i32) -> i32 {
    value.saturating_sub(step).max(0)
}

fn descend_field(field: &mut Option<i32>, step: i32) {
    if let Some(value) = field.as_mut() {
        *value = descend(*value, step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::spike_temperature;
    use crate::invariants::{check_record, check_transition};
    use crate::seed::default_fleet;
    use crate::walk::random_walk_step;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn run_to_rest(mut record: MachineRecord) -> (MachineRecord, usize) {
        let mut ticks = 0;
        while !is_at_rest(&record) {
            let next = ramp_step(&record);
            check_transition(&record, &next).expect("ramp steps are legal");
            record = next;
            ticks += 1;
            assert!(ticks < 10_000, "ramp must terminate");
        }
        (power_off(&record), ticks)
    }

    #[test]
    fn boiler_ramp_reaches_rest_and_powers_off() {
        let mut rng = StdRng::seed_from_u64(6);
        let boiler = default_fleet(&mut rng).remove(2);
        let (off, ticks) = run_to_rest(boiler);
        // Heat output 600 at 10 per tick is the slowest field.
        assert_eq!(ticks, 60);
        assert_eq!(off.status, MachineStatus::Off);
        assert_eq!(off.rate, 0);
        assert_eq!(off.temperature, 0);
        check_record(&off).expect("off record is at rest");
    }

    #[test]
    fn conveyor_ramp_ignores_operating_time() {
        let mut rng = StdRng::seed_from_u64(6);
        let conveyor = default_fleet(&mut rng).remove(0);
        let (off, _) = run_to_rest(conveyor);
        let Extension::Conveyor(c) = &off.extension else {
            panic!("conveyor stays a conveyor");
        };
        assert_eq!(c.operating_time, Some(120));
        assert_eq!(c.vibration, Some(0.0));
        check_record(&off).expect("off record is at rest");
    }

    #[test]
    fn spiked_conveyor_ramps_down_from_sentinel() {
        let mut rng = StdRng::seed_from_u64(6);
        let spiked = spike_temperature(&default_fleet(&mut rng).remove(0));
        let (off, ticks) = run_to_rest(spiked);
        assert_eq!(ticks, 100);
        assert!(off.fault_spiked);
        assert_eq!(off.temperature, 0);
    }

    #[test]
    fn emergency_stop_only_appends() {
        let mut rng = StdRng::seed_from_u64(6);
        let boiler = default_fleet(&mut rng).remove(2);
        let stopped = emergency_stop(&boiler);
        assert_eq!(stopped.readings(), boiler.readings());
        assert_eq!(
            stopped.event_log.last().map(String::as_str),
            Some("Emergency Stop triggered (machine id03)")
        );
    }

    #[test]
    fn idle_machine_is_already_at_rest() {
        let mut rng = StdRng::seed_from_u64(6);
        let idle = default_fleet(&mut rng).remove(1);
        assert!(is_at_rest(&idle));
        assert_eq!(ramp_step(&idle), idle);
    }

    proptest! {
        #[test]
        fn ramp_is_monotone_after_any_walk(seed in any::<u64>(), walk_ticks in 0usize..100) {
            let mut rng = StdRng::seed_from_u64(seed);
            for mut record in default_fleet(&mut rng).into_iter().filter(MachineRecord::is_on) {
                for _ in 0..walk_ticks {
                    record = random_walk_step(&record, &mut rng);
                }
                while !is_at_rest(&record) {
                    let next = ramp_step(&record);
                    for (before, after) in record.readings().iter().zip(next.readings().iter()) {
                        if before.ramped {
                            prop_assert!(after.value <= before.value, "{} rose", before.field);
                            prop_assert!(after.value >= 0.0);
                        }
                    }
                    record = next;
                }
            }
        }
    }
}
