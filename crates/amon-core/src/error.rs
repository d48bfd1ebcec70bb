//! ---
//! amon_section: "03-runtime"
//! amon_subsection: "module"
//! amon_type: "source"
//! amon_scope: "code"
//! amon_description: "Errors surfaced by the session API."
//! amon_version: "v0.1.0"
//! amon_owner: "tbd"
//! ---
use amon_sim::MachineKind;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    #[error("unknown machine '{0}'")]
    UnknownMachine(String),
    /// The machine's supervisor has exited; only happens after it aborted on
    /// an invariant violation or the session was closed.
    #[error("supervisor for machine '{0}' is no longer running")]
    SupervisorGone(String),
    #[error("machine '{0}' appears more than once in the fleet")]
    DuplicateMachine(String),
    #[error("machines '{first}' and '{second}' are both dynamic {kind}s")]
    DuplicateDynamicKind {
        kind: MachineKind,
        first: String,
        second: String,
    },
}
