//! Work unit abstraction.

use common::UnitId;

/// An independent piece of work supplied to the coordinator.
///
/// Units are opaque to the coordinator: it only needs a stable identifier
/// for state tracking and abort attribution. Concrete unit types carry
/// whatever parameters their worker needs (account id, shard path, ...)
/// and must not change between the first attempt and a retry.
pub trait WorkUnit: Send + Sync {
    /// Returns this unit's stable identifier.
    fn id(&self) -> UnitId;
}
