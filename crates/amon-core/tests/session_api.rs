//! ---
//! amon_section: "03-runtime"
//! amon_subsection: "tests"
//! amon_type: "source"
//! amon_scope: "test"
//! amon_description: "Integration tests for the monitor session API."
//! amon_version: "v0.1.0"
//! amon_owner: "tbd"
//! ---
mod common;

use std::time::Duration;

use amon_core::{Alert, MonitorError, MonitorSession};
use amon_sim::{default_fleet, MachineId};
use futures::StreamExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::time::sleep;

use common::{config, start_session, units};

fn unknown() -> MonitorError {
    MonitorError::UnknownMachine("id99".into())
}

#[tokio::test(start_paused = true)]
async fn unknown_machine_is_reported_everywhere() {
    let session = start_session();
    assert_eq!(session.snapshot("id99"), Err(unknown()));
    assert_eq!(session.lookup("id99"), Err(unknown()));
    assert_eq!(session.event_log("id99"), Err(unknown()));
    assert_eq!(session.activate("id99").await, Err(unknown()));
    assert_eq!(session.request_shutdown("id99").await, Err(unknown()));
    assert_eq!(session.pin_to_menu("id99"), Err(unknown()));
    assert!(matches!(session.subscribe("id99"), Err(MonitorError::UnknownMachine(_))));
}

#[tokio::test(start_paused = true)]
async fn lookup_resolves_scanned_codes() {
    let session = start_session();
    let record = session.lookup(" id03\n").expect("known machine");
    assert_eq!(record.id.as_str(), "id03");
    assert_eq!(
        session.machine_ids(),
        vec![MachineId::new("id01"), MachineId::new("id02"), MachineId::new("id03")]
    );
    assert_eq!(session.snapshots().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn event_log_is_seeded_and_grows() {
    let session = start_session();
    let seeded = session.event_log("id01").expect("known machine");
    assert_eq!(seeded.len(), 10);
    assert!(seeded.iter().all(|entry| entry.ends_with("(machine id01)")));

    sleep(units(11)).await;
    let grown = session.event_log("id01").expect("known machine");
    assert_eq!(&grown[..seeded.len()], seeded.as_slice());
    assert_eq!(
        grown.last().map(String::as_str),
        Some("High temperature spike observed (machine id01)")
    );
}

#[tokio::test(start_paused = true)]
async fn menu_pins_known_machines_once() {
    let session = start_session();
    assert_eq!(
        session.menu(),
        vec![MachineId::new("id01"), MachineId::new("id02")]
    );
    assert_eq!(session.pin_to_menu("id03"), Ok(true));
    assert_eq!(session.pin_to_menu("id03"), Ok(false));
    assert_eq!(session.pin_to_menu("id01"), Ok(false));
    assert_eq!(session.menu().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn configured_menu_skips_unknown_ids() {
    let fleet = default_fleet(&mut StdRng::seed_from_u64(1));
    let mut config = config();
    config.menu = vec!["id03".into(), "id42".into()];
    let session = MonitorSession::start(fleet, &config).expect("valid fleet");
    assert_eq!(session.menu(), vec![MachineId::new("id03")]);
}

#[tokio::test(start_paused = true)]
async fn new_subscriber_gets_latest_snapshot_first() {
    let session = start_session();
    sleep(units(5)).await;
    let latest = session.snapshot("id03").expect("known machine");

    let mut first = session.subscribe("id03").expect("known machine");
    let mut second = session.subscribe("id03").expect("known machine");
    assert_eq!(first.next().await, Some(latest.clone()));
    assert_eq!(second.next().await, Some(latest.clone()));

    let next = first.next().await.expect("walk continues");
    assert_eq!(second.next().await, Some(next));
}

#[tokio::test(start_paused = true)]
async fn alerts_advise_stop_after_spike() {
    let session = start_session();
    let mut alerts = session.alerts();
    let alert = tokio::time::timeout(units(11), alerts.recv())
        .await
        .expect("spike within the fault delay")
        .expect("alert channel open");
    let Alert::HighTemperature {
        machine_id,
        temperature,
    } = &alert
    else {
        panic!("expected a high temperature alert, got {alert:?}");
    };
    assert_eq!(*temperature, 200);
    assert_eq!(machine_id.as_str(), "id01");
    assert!(alerts.try_recv().is_err(), "only the conveyor spikes");
}

#[tokio::test(start_paused = true)]
async fn close_waits_for_supervisors() {
    let session = start_session();
    session.request_shutdown("id01").await.expect("known machine");
    tokio::time::timeout(Duration::from_secs(5), session.close())
        .await
        .expect("session closes");
}

#[tokio::test(start_paused = true)]
async fn rejects_duplicate_fleet_entries() {
    let mut fleet = default_fleet(&mut StdRng::seed_from_u64(1));
    fleet.push(fleet[2].clone());
    assert_eq!(
        MonitorSession::start(fleet, &config()).err(),
        Some(MonitorError::DuplicateMachine("id03".into()))
    );
}
