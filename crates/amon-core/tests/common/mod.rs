//! ---
//! amon_section: "03-runtime"
//! amon_subsection: "tests"
//! amon_type: "source"
//! amon_scope: "test"
//! amon_description: "Shared helpers for runtime integration tests."
//! amon_version: "v0.1.0"
//! amon_owner: "tbd"
//! ---
#![allow(dead_code)]

use std::time::Duration;

use amon_common::config::SimulationConfig;
use amon_core::{MonitorSession, SnapshotStream};
use amon_sim::{default_fleet, MachineRecord};
use futures::StreamExt;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// One time-unit of the default configuration.
pub const UNIT: Duration = Duration::from_secs(1);

pub fn config() -> SimulationConfig {
    SimulationConfig {
        time_unit: UNIT,
        ..SimulationConfig::default()
    }
}

pub fn start_session() -> MonitorSession {
    let fleet = default_fleet(&mut StdRng::seed_from_u64(42));
    MonitorSession::start(fleet, &config()).expect("default fleet starts")
}

pub fn units(count: u64) -> Duration {
    UNIT * count as u32
}

/// Next snapshot satisfying `pred`, failing the test after `limit` of virtual time.
pub async fn wait_for<F>(stream: &mut SnapshotStream, limit: Duration, pred: F) -> MachineRecord
where
    F: Fn(&MachineRecord) -> bool,
{
    tokio::time::timeout(limit, async {
        while let Some(record) = stream.next().await {
            if pred(&record) {
                return record;
            }
        }
        panic!("snapshot stream ended");
    })
    .await
    .expect("condition not reached in time")
}

/// Every snapshot up to and including the first one that is off.
pub async fn collect_until_off(stream: &mut SnapshotStream, limit: Duration) -> Vec<MachineRecord> {
    tokio::time::timeout(limit, async {
        let mut seen = Vec::new();
        while let Some(record) = stream.next().await {
            let off = !record.is_on();
            seen.push(record);
            if off {
                return seen;
            }
        }
        panic!("snapshot stream ended");
    })
    .await
    .expect("machine did not stop in time")
}

pub fn count_entries(record: &MachineRecord, prefix: &str) -> usize {
    record
        .event_log
        .iter()
        .filter(|entry| entry.starts_with(prefix))
        .count()
}

pub fn ramped_values(record: &MachineRecord) -> Vec<(&'static str, f64)> {
    record
        .readings()
        .into_iter()
        .filter(|reading| reading.ramped)
        .map(|reading| (reading.field, reading.value))
        .collect()
}
