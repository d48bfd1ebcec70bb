//! ---
//! amon_section: "02-simulation"
//! amon_subsection: "module"
//! amon_type: "source"
//! amon_scope: "code"
//! amon_description: "Fixed seed fleet and synthetic event history."
//! amon_version: "v0.1.0"
//! amon_owner: "tbd"
//! ---
use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::boiler::maintenance_note;
use crate::machine::{
    BoilerReadings, ConveyorReadings, Extension, MachineId, MachineRecord, MachineStatus,
};

pub const SEEDED_LOG_LEN: usize = 10;

pub const EVENT_TEMPLATES: [&str; 10] = [
    "Starting working date",
    "Hours since start",
    "Maintenance scheduled",
    "Random malfunction",
    "Machine turned ON",
    "Machine turned OFF",
    "Operator login",
    "Operator logout",
    "Temperature exceeded threshold",
    "Speed exceeding recommended range",
];

/// Ten history entries drawn uniformly from [`EVENT_TEMPLATES`].
pub fn synthetic_event_log<R: Rng + ?Sized>(machine_id: &MachineId, rng: &mut R) -> Vec<String> {
    (0..SEEDED_LOG_LEN)
        .map(|_| {
            let event = EVENT_TEMPLATES.choose(rng).copied().unwrap_or(EVENT_TEMPLATES[0]);
            format!("{} (machine {})", event, machine_id)
        })
        .collect()
}

/// The three machines known to a session: a running conveyor, an idle
/// conveyor, and a running boiler.
pub fn default_fleet<R: Rng + ?Sized>(rng: &mut R) -> Vec<MachineRecord> {
    let id01 = MachineId::new("id01");
    let id02 = MachineId::new("id02");
    let id03 = MachineId::new("id03");
    vec![
        MachineRecord {
            name: "Conveyor Belt #id01".to_owned(),
            location: "Factory A".to_owned(),
            status: MachineStatus::On,
            temperature: 75,
            rate: 1200,
            extension: Extension::Conveyor(ConveyorReadings {
                load_capacity: Some(50),
                belt_tension: Some(250),
                vibration: Some(1.2),
                operating_time: Some(120),
            }),
            fault_spiked: false,
            event_log: synthetic_event_log(&id01, rng),
            id: id01,
        },
        MachineRecord {
            name: "Conveyor Belt #id02".to_owned(),
            location: "Factory A".to_owned(),
            status: MachineStatus::Off,
            temperature: 0,
            rate: 0,
            extension: Extension::Conveyor(ConveyorReadings {
                load_capacity: Some(0),
                belt_tension: Some(0),
                vibration: Some(0.0),
                operating_time: Some(0),
            }),
            fault_spiked: false,
            event_log: synthetic_event_log(&id02, rng),
            id: id02,
        },
        MachineRecord {
            name: "Industrial Boiler #id03".to_owned(),
            location: "Factory A".to_owned(),
            status: MachineStatus::On,
            temperature: 100,
            rate: 10,
            extension: Extension::Boiler(BoilerReadings {
                pressure: Some(5),
                water_level: Some(85),
                heat_output: Some(600),
                co2_emission: Some(220),
                maintenance_cycles: Some(maintenance_note(20)),
            }),
            fault_spiked: false,
            event_log: synthetic_event_log(&id03, rng),
            id: id03,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invariants::check_record;
    use crate::machine::MachineKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn fleet_matches_seed_table() {
        let mut rng = StdRng::seed_from_u64(9);
        let fleet = default_fleet(&mut rng);
        let ids: Vec<_> = fleet.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["id01", "id02", "id03"]);
        assert_eq!(fleet[0].kind(), MachineKind::Conveyor);
        assert_eq!(fleet[1].status, MachineStatus::Off);
        assert_eq!(fleet[2].kind(), MachineKind::Boiler);
        for machine in &fleet {
            assert_eq!(machine.event_log.len(), SEEDED_LOG_LEN);
            check_record(machine).expect("seed records satisfy their domains");
        }
    }

    #[test]
    fn history_entries_name_the_machine() {
        let mut rng = StdRng::seed_from_u64(3);
        let id = MachineId::new("id07");
        for entry in synthetic_event_log(&id, &mut rng) {
            assert!(entry.ends_with(" (machine id07)"), "{entry}");
            assert!(EVENT_TEMPLATES.iter().any(|t| entry.starts_with(t)));
        }
    }
}
