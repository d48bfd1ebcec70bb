//! ---
//! amon_section: "02-simulation"
//! amon_subsection: "module"
//! amon_type: "source"
//! amon_scope: "code"
//! amon_description: "One-shot over-temperature fault spike."
//! amon_version: "v0.1.0"
//! amon_owner: "tbd"
//! ---
use crate::machine::MachineRecord;

/// Temperature forced by a fault injection; above the conveyor domain on purpose.
pub const FAULT_TEMPERATURE: i32 = 200;

/// Snapshot with the temperature forced to [`FAULT_TEMPERATURE`], the fault
/// flag raised, and the spike recorded in the event log.
pub fn spike_temperature(record: &MachineRecord) -> MachineRecord {
    let mut next = record.clone();
    next.temperature = FAULT_TEMPERATURE;
    next.fault_spiked = true;
    next.event_log.push(format!(
        "High temperature spike observed (machine {})",
        record.id
    ));
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invariants::check_transition;
    use crate::seed::default_fleet;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn spike_sets_sentinel_flag_and_log() {
        let mut rng = StdRng::seed_from_u64(11);
        let record = default_fleet(&mut rng).remove(0);
        let spiked = spike_temperature(&record);
        assert_eq!(spiked.temperature, 200);
        assert!(spiked.fault_spiked);
        assert_eq!(spiked.event_log.len(), record.event_log.len() + 1);
        assert_eq!(
            spiked.event_log.last().map(String::as_str),
            Some("High temperature spike observed (machine id01)")
        );
        check_transition(&record, &spiked).expect("a spike is a legal transition");
    }
}
