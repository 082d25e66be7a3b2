//! Partitioned retry coordinator.
//!
//! Given a set of independent work units, the coordinator attempts each
//! one, classifies failures as remediable or fatal, remediates once per
//! distinct key, retries the deferred units exactly once, and returns
//! either a complete aggregate or an abort reason. It never returns a
//! partially correct result: better to return nothing than something
//! incomplete.
//!
//! The caller supplies the two side-effecting collaborators: a
//! [`UnitWorker`] that does the per-unit work and per-key fixes, and an
//! [`EscalationSink`] that receives one report per aborted run.

pub mod aggregate;
pub mod coordinator;
pub mod error;
pub mod services;
pub mod state;
pub mod unit;

pub use aggregate::Aggregate;
pub use coordinator::RetryCoordinator;
pub use error::{AbortReason, Failure};
pub use services::{
    AbortReport, EscalationSink, InMemoryEscalationSink, LogEscalationSink, Script,
    ScriptedWorker, ShardUnit, UnitWorker,
};
pub use state::UnitState;
pub use unit::WorkUnit;
