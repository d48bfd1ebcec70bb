//! ---
//! amon_section: "03-runtime"
//! amon_subsection: "module"
//! amon_type: "source"
//! amon_scope: "code"
//! amon_description: "Session object owning the fleet, menu and supervisors."
//! amon_version: "v0.1.0"
//! amon_owner: "tbd"
//! ---
use amon_common::config::SimulationConfig;
use amon_sim::{MachineId, MachineKind, MachineRecord};
use futures::stream::{self, BoxStream, StreamExt};
use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::alert::Alert;
use crate::cancel::CancelToken;
use crate::error::MonitorError;
use crate::supervisor::{
    Activation, Command, MachineSupervisor, Revisioned, ShutdownRequest, SupervisorSettings,
};

const ALERT_BUFFER: usize = 64;

/// Snapshot sequence returned by [`MonitorSession::subscribe`].
pub type SnapshotStream = BoxStream<'static, MachineRecord>;

#[derive(Debug)]
struct MachineEntry {
    commands: mpsc::Sender<Command>,
    latest: watch::Receiver<Revisioned>,
    updates: broadcast::Sender<Revisioned>,
}

/// One running simulation of a fleet.
///
/// Owns a supervisor per machine, the session-wide alert channel and the
/// quick-access menu. Dropping the session cancels every simulation task;
/// [`MonitorSession::close`] additionally waits for the supervisors to exit.
#[derive(Debug)]
pub struct MonitorSession {
    machines: IndexMap<MachineId, MachineEntry>,
    supervisors: Vec<JoinHandle<()>>,
    alerts: broadcast::Sender<Alert>,
    menu: Mutex<IndexSet<MachineId>>,
    root: CancelToken,
}

impl MonitorSession {
    /// Spawn one supervisor per record. Machines that are already on start
    /// simulating immediately. Must be called inside a tokio runtime.
    pub fn start(
        fleet: Vec<MachineRecord>,
        config: &SimulationConfig,
    ) -> Result<Self, MonitorError> {
        validate_fleet(&fleet, config)?;

        let root = CancelToken::new();
        let (alerts, _) = broadcast::channel(ALERT_BUFFER);
        let mut machines = IndexMap::with_capacity(fleet.len());
        let mut supervisors = Vec::with_capacity(fleet.len());
        for (index, record) in fleet.into_iter().enumerate() {
            let settings = SupervisorSettings {
                walk_period: config.walk_period(),
                fault_delay: config.fault_delay(),
                ramp_period: config.ramp_period(),
                inject_fault: config.is_dynamic(record.id.as_str()),
                seed: config.random_seed.wrapping_add(index as u64),
                subscriber_buffer: config.subscriber_buffer,
            };
            let machine_id = record.id.clone();
            let handle = MachineSupervisor::spawn(record, settings, root.clone(), alerts.clone());
            supervisors.push(handle.task);
            machines.insert(
                machine_id,
                MachineEntry {
                    commands: handle.commands,
                    latest: handle.latest,
                    updates: handle.updates,
                },
            );
        }

        let mut menu = IndexSet::new();
        for id in &config.menu {
            if machines.contains_key(id.as_str()) {
                menu.insert(MachineId::new(id.as_str()));
            } else {
                warn!(machine_id = %id, "ignoring unknown machine in configured menu");
            }
        }

        info!(machines = machines.len(), menu = menu.len(), "monitor session started");
        Ok(Self {
            machines,
            supervisors,
            alerts,
            menu: Mutex::new(menu),
            root,
        })
    }

    /// Ids in fleet order.
    pub fn machine_ids(&self) -> Vec<MachineId> {
        self.machines.keys().cloned().collect()
    }

    pub fn snapshot(&self, machine_id: &str) -> Result<MachineRecord, MonitorError> {
        Ok(self.entry(machine_id)?.latest.borrow().record.clone())
    }

    /// Latest snapshot of every machine, in fleet order.
    pub fn snapshots(&self) -> Vec<MachineRecord> {
        self.machines
            .values()
            .map(|entry| entry.latest.borrow().record.clone())
            .collect()
    }

    /// Resolve a scanned machine code.
    pub fn lookup(&self, code: &str) -> Result<MachineRecord, MonitorError> {
        let code = code.trim();
        let record = self.snapshot(code);
        if record.is_err() {
            debug!(code, "lookup for unknown machine code");
        }
        record
    }

    pub fn event_log(&self, machine_id: &str) -> Result<Vec<String>, MonitorError> {
        Ok(self.entry(machine_id)?.latest.borrow().record.event_log.clone())
    }

    /// Turn an off machine on and start simulating it.
    pub async fn activate(&self, machine_id: &str) -> Result<Activation, MonitorError> {
        self.request(machine_id, |reply| Command::Activate { reply })
            .await
    }

    /// Begin the emergency-stop sequence. Repeated calls have no further effect.
    pub async fn request_shutdown(&self, machine_id: &str) -> Result<ShutdownRequest, MonitorError> {
        self.request(machine_id, |reply| Command::RequestShutdown { reply })
            .await
    }

    /// Every snapshot applied from now on, preceded by the latest one.
    ///
    /// Each subscriber gets its own sequence. A subscriber that falls more than
    /// `subscriber_buffer` snapshots behind skips ahead to the oldest retained one.
    pub fn subscribe(&self, machine_id: &str) -> Result<SnapshotStream, MonitorError> {
        let entry = self.entry(machine_id)?;
        // Subscribe before reading the latest so nothing falls in between.
        let updates = entry.updates.subscribe();
        let replay = entry.latest.borrow().clone();
        let machine_id = replay.record.id.clone();
        let state = SubscriberState {
            machine_id,
            replay: Some(replay),
            updates,
            last_revision: None,
        };
        Ok(stream::unfold(state, SubscriberState::next).boxed())
    }

    pub fn alerts(&self) -> broadcast::Receiver<Alert> {
        self.alerts.subscribe()
    }

    pub fn menu(&self) -> Vec<MachineId> {
        self.menu.lock().iter().cloned().collect()
    }

    /// Add a machine to the quick-access menu. Returns `false` if it was already there.
    pub fn pin_to_menu(&self, machine_id: &str) -> Result<bool, MonitorError> {
        let (id, _) = self
            .machines
            .get_key_value(machine_id)
            .ok_or_else(|| MonitorError::UnknownMachine(machine_id.to_string()))?;
        let added = self.menu.lock().insert(id.clone());
        if added {
            info!(machine_id = %id, "machine pinned to menu");
        }
        Ok(added)
    }

    /// Cancel all simulation tasks and wait for every supervisor to exit.
    ///
    /// # Panics
    ///
    /// Re-raises the panic of a supervisor that aborted, which happens when a
    /// simulation task produced a snapshot violating the record invariants.
    pub async fn close(mut self) {
        self.root.cancel();
        for entry in self.machines.values() {
            let _ = entry.commands.send(Command::Close).await;
        }
        for task in std::mem::take(&mut self.supervisors) {
            match task.await {
                Ok(()) => {}
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(err) => warn!(error = %err, "supervisor task was cancelled"),
            }
        }
        info!("monitor session closed");
    }

    fn entry(&self, machine_id: &str) -> Result<&MachineEntry, MonitorError> {
        self.machines
            .get(machine_id)
            .ok_or_else(|| MonitorError::UnknownMachine(machine_id.to_string()))
    }

    async fn request<T, F>(&self, machine_id: &str, command: F) -> Result<T, MonitorError>
    where
        F: FnOnce(oneshot::Sender<T>) -> Command,
    {
        let entry = self.entry(machine_id)?;
        let gone = || MonitorError::SupervisorGone(machine_id.to_string());
        let (reply, response) = oneshot::channel();
        entry
            .commands
            .send(command(reply))
            .await
            .map_err(|_| gone())?;
        response.await.map_err(|_| gone())
    }
}

impl Drop for MonitorSession {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

struct SubscriberState {
    machine_id: MachineId,
    replay: Option<Revisioned>,
    updates: broadcast::Receiver<Revisioned>,
    last_revision: Option<u64>,
}

impl SubscriberState {
    async fn next(mut self) -> Option<(MachineRecord, Self)> {
        if let Some(replay) = self.replay.take() {
            self.last_revision = Some(replay.revision);
            return Some((replay.record, self));
        }
        loop {
            match self.updates.recv().await {
                Ok(update) => {
                    if self.last_revision.is_some_and(|last| update.revision <= last) {
                        continue;
                    }
                    self.last_revision = Some(update.revision);
                    return Some((update.record, self));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(machine_id = %self.machine_id, skipped, "subscriber lagged, skipping ahead");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

fn validate_fleet(fleet: &[MachineRecord], config: &SimulationConfig) -> Result<(), MonitorError> {
    let mut seen = IndexSet::with_capacity(fleet.len());
    let mut dynamic: IndexMap<MachineKind, &MachineId> = IndexMap::new();
    for record in fleet {
        if !seen.insert(&record.id) {
            return Err(MonitorError::DuplicateMachine(record.id.to_string()));
        }
        if !config.is_dynamic(record.id.as_str()) {
            continue;
        }
        if let Some(first) = dynamic.insert(record.kind(), &record.id) {
            return Err(MonitorError::DuplicateDynamicKind {
                kind: record.kind(),
                first: first.to_string(),
                second: record.id.to_string(),
            });
        }
    }
    Ok(())
}
