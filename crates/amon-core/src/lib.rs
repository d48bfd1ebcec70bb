//! ---
//! amon_section: "03-runtime"
//! amon_subsection: "module"
//! amon_type: "source"
//! amon_scope: "code"
//! amon_description: "Simulation supervision and session lifecycle."
//! amon_version: "v0.1.0"
//! amon_owner: "tbd"
//! ---
//! Runtime for the machine simulation.
//!
//! Each machine gets one supervisor task that owns its record and is the only
//! writer. The simulation tasks read the latest published snapshot and propose
//! successors over a channel; the supervisor validates and applies them one at
//! a time, then broadcasts the result.

pub mod alert;
pub mod cancel;
pub mod error;
pub mod session;
mod supervisor;
mod tasks;
pub mod timer;

pub use alert::Alert;
pub use cancel::CancelToken;
pub use error::MonitorError;
pub use session::{MonitorSession, SnapshotStream};
pub use supervisor::{Activation, ShutdownRequest, TaskKind};
pub use timer::PeriodicTimer;
