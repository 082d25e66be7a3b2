//! Collaborator traits supplied by the caller, plus in-memory
//! implementations for tests.

pub mod escalation;
pub mod worker;

pub use escalation::{AbortReport, EscalationSink, InMemoryEscalationSink, LogEscalationSink};
pub use worker::{Script, ScriptedWorker, ShardUnit, UnitWorker};
