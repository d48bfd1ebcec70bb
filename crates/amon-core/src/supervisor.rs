//! ---
//! amon_section: "03-runtime"
//! amon_subsection: "module"
//! amon_type: "source"
//! amon_scope: "code"
//! amon_description: "Single-writer supervisor owning one machine record."
//! amon_version: "v0.1.0"
//! amon_owner: "tbd"
//! ---
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use amon_sim::{
    check_record, check_transition, InvariantViolation, MachineId, MachineRecord, MachineStatus,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::alert::Alert;
use crate::cancel::CancelToken;
use crate::tasks::{self, TaskContext};

const COMMAND_BUFFER: usize = 32;

/// Snapshot as published by a supervisor; `revision` grows by one per apply.
#[derive(Debug, Clone)]
pub(crate) struct Revisioned {
    pub revision: u64,
    pub record: MachineRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    RandomWalk,
    FaultInjector,
    ShutdownSequencer,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::RandomWalk => "random_walk",
            TaskKind::FaultInjector => "fault_injector",
            TaskKind::ShutdownSequencer => "shutdown_sequencer",
        }
    }
}

/// Result of [`crate::MonitorSession::activate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Started,
    AlreadyRunning,
    /// A shutdown was requested or completed in this session; it is irreversible.
    Refused,
}

/// Result of [`crate::MonitorSession::request_shutdown`]. Only `Initiated` has an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownRequest {
    Initiated,
    AlreadyInProgress,
    AlreadyStopped,
    NotRunning,
}

#[derive(Debug)]
pub(crate) struct Proposal {
    pub source: TaskKind,
    pub epoch: u64,
    pub base_revision: u64,
    pub record: MachineRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ProposalOutcome {
    Applied { revision: u64 },
    /// Based on an older revision; re-read and derive again.
    Stale,
    /// The proposing task's activation is over; the task must exit.
    Superseded,
    Rejected(InvariantViolation),
}

#[derive(Debug)]
pub(crate) enum Command {
    Propose {
        proposal: Proposal,
        reply: oneshot::Sender<ProposalOutcome>,
    },
    Activate {
        reply: oneshot::Sender<Activation>,
    },
    RequestShutdown {
        reply: oneshot::Sender<ShutdownRequest>,
    },
    Close,
}

#[derive(Debug, Clone)]
pub(crate) struct SupervisorSettings {
    pub walk_period: Duration,
    pub fault_delay: Duration,
    pub ramp_period: Duration,
    /// Whether this machine is the designated fault target of its kind.
    pub inject_fault: bool,
    pub seed: u64,
    pub subscriber_buffer: usize,
}

#[derive(Debug)]
enum Phase {
    /// Off and never started in this session.
    Idle,
    Running { epoch: u64, token: CancelToken },
    Ramping { epoch: u64 },
    Terminated,
}

/// Endpoints the session keeps for one machine.
#[derive(Debug)]
pub(crate) struct SupervisorHandle {
    pub commands: mpsc::Sender<Command>,
    pub latest: watch::Receiver<Revisioned>,
    pub updates: broadcast::Sender<Revisioned>,
    pub task: JoinHandle<()>,
}

#[derive(Debug)]
pub(crate) struct MachineSupervisor {
    machine_id: MachineId,
    current: Revisioned,
    phase: Phase,
    next_epoch: u64,
    settings: SupervisorSettings,
    session: CancelToken,
    commands: mpsc::WeakSender<Command>,
    latest: watch::Sender<Revisioned>,
    updates: broadcast::Sender<Revisioned>,
    alerts: broadcast::Sender<Alert>,
    producers: JoinSet<()>,
    rng: StdRng,
}

impl MachineSupervisor {
    /// Spawn the supervisor loop. Seed records that are already on start their
    /// simulation tasks immediately. Must be called inside a tokio runtime.
    pub(crate) fn spawn(
        record: MachineRecord,
        settings: SupervisorSettings,
        session: CancelToken,
        alerts: broadcast::Sender<Alert>,
    ) -> SupervisorHandle {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (mut supervisor, latest_rx) =
            Self::new(record, settings, session, alerts, commands_tx.downgrade());
        let updates = supervisor.updates.clone();
        if supervisor.current.record.is_on() {
            supervisor.start_activation();
        }
        let task = tokio::spawn(supervisor.run(commands_rx));
        SupervisorHandle {
            commands: commands_tx,
            latest: latest_rx,
            updates,
            task,
        }
    }

    fn new(
        record: MachineRecord,
        settings: SupervisorSettings,
        session: CancelToken,
        alerts: broadcast::Sender<Alert>,
        commands: mpsc::WeakSender<Command>,
    ) -> (Self, watch::Receiver<Revisioned>) {
        let initial = Revisioned {
            revision: 0,
            record,
        };
        let (latest, latest_rx) = watch::channel(initial.clone());
        let (updates, _) = broadcast::channel(settings.subscriber_buffer.max(1));
        let rng = StdRng::seed_from_u64(settings.seed ^ id_hash(&initial.record.id));
        let supervisor = Self {
            machine_id: initial.record.id.clone(),
            current: initial,
            phase: Phase::Idle,
            next_epoch: 0,
            settings,
            session,
            commands,
            latest,
            updates,
            alerts,
            producers: JoinSet::new(),
            rng,
        };
        (supervisor, latest_rx)
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        info!(machine_id = %self.machine_id, status = ?self.current.record.status, "supervisor started");
        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    if !self.handle(command) {
                        break;
                    }
                }
                Some(joined) = self.producers.join_next(), if !self.producers.is_empty() => {
                    if let Err(err) = joined {
                        self.on_producer_failure(err);
                    }
                }
            }
        }
        if let Phase::Running { token, .. } = &self.phase {
            token.cancel();
        }
        debug!(machine_id = %self.machine_id, revision = self.current.revision, "supervisor stopped");
    }

    /// Returns `false` once the supervisor should stop.
    fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Propose { proposal, reply } => {
                let outcome = self.on_proposal(proposal);
                let _ = reply.send(outcome);
            }
            Command::Activate { reply } => {
                let outcome = self.on_activate();
                let _ = reply.send(outcome);
            }
            Command::RequestShutdown { reply } => {
                let outcome = self.on_shutdown_request();
                let _ = reply.send(outcome);
            }
            Command::Close => return false,
        }
        true
    }

    /// A panicking producer takes the supervisor down with it, so the failure
    /// reaches whoever joins the supervisor.
    fn on_producer_failure(&self, err: JoinError) {
        if err.is_panic() {
            error!(machine_id = %self.machine_id, "simulation task panicked");
            std::panic::resume_unwind(err.into_panic());
        }
    }

    fn on_proposal(&mut self, proposal: Proposal) -> ProposalOutcome {
        let admitted = match (&self.phase, proposal.source) {
            (Phase::Running { epoch, .. }, TaskKind::RandomWalk | TaskKind::FaultInjector) => {
                *epoch == proposal.epoch
            }
            (Phase::Ramping { epoch }, TaskKind::ShutdownSequencer) => *epoch == proposal.epoch,
            _ => false,
        };
        if !admitted {
            debug!(
                machine_id = %self.machine_id,
                source = proposal.source.as_str(),
                epoch = proposal.epoch,
                "proposal superseded"
            );
            return ProposalOutcome::Superseded;
        }
        if proposal.base_revision != self.current.revision {
            return ProposalOutcome::Stale;
        }
        if let Err(violation) = check_transition(&self.current.record, &proposal.record) {
            error!(
                machine_id = %self.machine_id,
                source = proposal.source.as_str(),
                revision = self.current.revision,
                error = %violation,
                "rejected snapshot violating record invariants"
            );
            return ProposalOutcome::Rejected(violation);
        }

        let spiked = !self.current.record.fault_spiked && proposal.record.fault_spiked;
        let stopped = self.current.record.is_on() && !proposal.record.is_on();
        let revision = self.publish(proposal.record);
        debug!(
            machine_id = %self.machine_id,
            source = proposal.source.as_str(),
            revision,
            "snapshot applied"
        );

        if spiked {
            let temperature = self.current.record.temperature;
            warn!(machine_id = %self.machine_id, temperature, "high temperature spike");
            self.raise(Alert::HighTemperature {
                machine_id: self.machine_id.clone(),
                temperature,
            });
        }
        if stopped {
            self.phase = Phase::Terminated;
            info!(machine_id = %self.machine_id, revision, "machine stopped");
            self.raise(Alert::Stopped {
                machine_id: self.machine_id.clone(),
            });
        }
        ProposalOutcome::Applied { revision }
    }

    fn on_activate(&mut self) -> Activation {
        match self.phase {
            Phase::Running { .. } => Activation::AlreadyRunning,
            Phase::Ramping { .. } | Phase::Terminated => {
                warn!(machine_id = %self.machine_id, "activation refused after emergency stop");
                Activation::Refused
            }
            Phase::Idle => {
                let mut record = self.current.record.clone();
                record.status = MachineStatus::On;
                record
                    .event_log
                    .push(format!("Machine turned ON (machine {})", self.machine_id));
                if let Err(violation) = check_record(&record) {
                    error!(machine_id = %self.machine_id, error = %violation, "activation would violate record invariants");
                    return Activation::Refused;
                }
                let revision = self.publish(record);
                info!(machine_id = %self.machine_id, revision, "machine activated");
                self.start_activation();
                Activation::Started
            }
        }
    }

    fn on_shutdown_request(&mut self) -> ShutdownRequest {
        match &self.phase {
            Phase::Idle => ShutdownRequest::NotRunning,
            Phase::Ramping { .. } => ShutdownRequest::AlreadyInProgress,
            Phase::Terminated => ShutdownRequest::AlreadyStopped,
            Phase::Running { token, .. } => {
                token.cancel();
                let epoch = self.allocate_epoch();
                self.phase = Phase::Ramping { epoch };
                info!(machine_id = %self.machine_id, epoch, "emergency stop requested");
                self.raise(Alert::EmergencyStop {
                    machine_id: self.machine_id.clone(),
                });
                if let Some(ctx) = self.task_context(epoch, self.session.child()) {
                    self.producers.spawn(tasks::run_shutdown_sequencer(
                        ctx,
                        self.settings.ramp_period,
                    ));
                }
                ShutdownRequest::Initiated
            }
        }
    }

    /// Move to `Running` under a fresh epoch and spawn the walk and, for the
    /// designated machine, the fault injector.
    fn start_activation(&mut self) {
        let epoch = self.allocate_epoch();
        let token = self.session.child();
        self.phase = Phase::Running {
            epoch,
            token: token.clone(),
        };
        let Some(ctx) = self.task_context(epoch, token) else {
            return;
        };
        let walk_rng = StdRng::seed_from_u64(self.rng.gen());
        if self.settings.inject_fault {
            self.producers.spawn(tasks::run_fault_injector(
                ctx.clone(),
                self.settings.fault_delay,
            ));
        }
        self.producers.spawn(tasks::run_random_walk(
            ctx,
            self.settings.walk_period,
            walk_rng,
        ));
        debug!(machine_id = %self.machine_id, epoch, inject_fault = self.settings.inject_fault, "simulation tasks started");
    }

    fn task_context(&self, epoch: u64, token: CancelToken) -> Option<TaskContext> {
        let commands = self.commands.upgrade()?;
        Some(TaskContext {
            machine_id: self.machine_id.clone(),
            epoch,
            commands,
            latest: self.latest.subscribe(),
            token,
        })
    }

    fn allocate_epoch(&mut self) -> u64 {
        self.next_epoch += 1;
        self.next_epoch
    }

    fn publish(&mut self, record: MachineRecord) -> u64 {
        self.current = Revisioned {
            revision: self.current.revision + 1,
            record,
        };
        self.latest.send_replace(self.current.clone());
        // No subscribers is fine; the watch channel still holds the latest.
        let _ = self.updates.send(self.current.clone());
        self.current.revision
    }

    fn raise(&self, alert: Alert) {
        let _ = self.alerts.send(alert);
    }
}

fn id_hash(machine_id: &MachineId) -> u64 {
    let mut hasher = DefaultHasher::new();
    machine_id.hash(&mut hasher);
    hasher.finish()
}
