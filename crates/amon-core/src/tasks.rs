//! ---
//! amon_section: "03-runtime"
//! amon_subsection: "module"
//! amon_type: "source"
//! amon_scope: "code"
//! amon_description: "Random walk, fault injection and shutdown ramp tasks."
//! amon_version: "v0.1.0"
//! amon_owner: "tbd"
//! ---
//! The three time-driven producers of a machine's snapshots.
//!
//! None of them writes the record. Each one derives a successor from the
//! latest published snapshot and proposes it to the supervisor. Cancellation
//! is observed only when a task wakes up, so a task may run for up to one more
//! period after its token is cancelled; anything it proposes in that window is
//! answered `Superseded`.

use std::time::Duration;

use amon_sim::{
    emergency_stop, is_at_rest, power_off, ramp_step, random_walk_step, spike_temperature,
    MachineId, MachineRecord,
};
use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use crate::cancel::CancelToken;
use crate::supervisor::{Command, Proposal, ProposalOutcome, Revisioned, TaskKind};
use crate::timer::PeriodicTimer;

#[derive(Debug, Clone)]
pub(crate) struct TaskContext {
    pub machine_id: MachineId,
    pub epoch: u64,
    pub commands: mpsc::Sender<Command>,
    pub latest: watch::Receiver<Revisioned>,
    pub token: CancelToken,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Commit {
    Applied(MachineRecord),
    /// `derive` declined to produce a successor.
    Skipped,
    /// The activation is over or the supervisor is gone.
    Ended,
}

impl TaskContext {
    /// Propose `derive(latest)` until it is applied, retrying on `Stale`.
    pub(crate) async fn commit<F>(&mut self, source: TaskKind, mut derive: F) -> Commit
    where
        F: FnMut(&MachineRecord) -> Option<MachineRecord>,
    {
        loop {
            let base = self.latest.borrow_and_update().clone();
            let Some(record) = derive(&base.record) else {
                return Commit::Skipped;
            };
            let (reply, outcome) = oneshot::channel();
            let proposal = Proposal {
                source,
                epoch: self.epoch,
                base_revision: base.revision,
                record: record.clone(),
            };
            if self
                .commands
                .send(Command::Propose { proposal, reply })
                .await
                .is_err()
            {
                return Commit::Ended;
            }
            match outcome.await {
                Ok(ProposalOutcome::Applied { .. }) => return Commit::Applied(record),
                Ok(ProposalOutcome::Stale) => {
                    debug!(
                        machine_id = %self.machine_id,
                        source = source.as_str(),
                        base_revision = base.revision,
                        "stale proposal, retrying"
                    );
                }
                Ok(ProposalOutcome::Superseded) | Err(_) => return Commit::Ended,
                Ok(ProposalOutcome::Rejected(violation)) => {
                    debug_assert!(
                        false,
                        "{} produced an invalid snapshot: {violation}",
                        source.as_str()
                    );
                    return Commit::Ended;
                }
            }
        }
    }
}

/// Apply one random-walk step every `period` while the machine is on.
pub(crate) async fn run_random_walk(mut ctx: TaskContext, period: Duration, mut rng: StdRng) {
    let source = TaskKind::RandomWalk;
    debug!(machine_id = %ctx.machine_id, epoch = ctx.epoch, source = source.as_str(), "task started");
    let mut timer = PeriodicTimer::new(period);
    loop {
        timer.tick().await;
        if ctx.token.is_cancelled() {
            break;
        }
        let commit = ctx
            .commit(source, |record| {
                record.is_on().then(|| random_walk_step(record, &mut rng))
            })
            .await;
        if matches!(commit, Commit::Ended | Commit::Skipped) {
            break;
        }
    }
    debug!(machine_id = %ctx.machine_id, epoch = ctx.epoch, source = source.as_str(), "task exited");
}

/// Spike the temperature once, `delay` after the activation started.
pub(crate) async fn run_fault_injector(mut ctx: TaskContext, delay: Duration) {
    let source = TaskKind::FaultInjector;
    debug!(machine_id = %ctx.machine_id, epoch = ctx.epoch, source = source.as_str(), "task started");
    tokio::time::sleep(delay).await;
    if !ctx.token.is_cancelled() {
        ctx.commit(source, |record| {
            (record.is_on() && !record.fault_spiked).then(|| spike_temperature(record))
        })
        .await;
    }
    debug!(machine_id = %ctx.machine_id, epoch = ctx.epoch, source = source.as_str(), "task exited");
}

/// Log the stop, ramp every reading to zero one step per `period`, then
/// power the machine off.
pub(crate) async fn run_shutdown_sequencer(mut ctx: TaskContext, period: Duration) {
    let source = TaskKind::ShutdownSequencer;
    debug!(machine_id = %ctx.machine_id, epoch = ctx.epoch, source = source.as_str(), "task started");
    if ctx
        .commit(source, |record| Some(emergency_stop(record)))
        .await
        != Commit::Ended
    {
        ramp_to_rest(&mut ctx, period).await;
    }
    debug!(machine_id = %ctx.machine_id, epoch = ctx.epoch, source = source.as_str(), "task exited");
}

async fn ramp_to_rest(ctx: &mut TaskContext, period: Duration) {
    let source = TaskKind::ShutdownSequencer;
    let mut timer = PeriodicTimer::new(period);
    loop {
        timer.tick().await;
        if ctx.token.is_cancelled() {
            return;
        }
        let ramped = match ctx
            .commit(source, |record| {
                (!is_at_rest(record)).then(|| ramp_step(record))
            })
            .await
        {
            Commit::Applied(record) => record,
            Commit::Skipped => ctx.latest.borrow().record.clone(),
            Commit::Ended => return,
        };
        if is_at_rest(&ramped) {
            ctx.commit(source, |record| Some(power_off(record))).await;
            return;
        }
    }
}
