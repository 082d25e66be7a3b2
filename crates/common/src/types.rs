use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of one work unit across both of its attempts.
///
/// A UUID newtype: abort reasons, escalation reports and log lines all
/// carry unit ids, and the wrapper keeps those from being confused with
/// whatever other UUIDs the caller's domain passes around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(Uuid);

impl UnitId {
    /// Mints a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an id the caller already has (e.g. from a shard catalog).
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UnitId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for UnitId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<UnitId> for Uuid {
    fn from(id: UnitId) -> Self {
        id.0
    }
}

/// Identifies the corrective action needed for one or more remediable
/// failures, typically a data-source path (e.g. `"shards/ledger-02"`).
///
/// Multiple units may share a key; remediation is deduplicated by value,
/// so the key must compare structurally, not by sentinel identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemediationKey(String);

impl RemediationKey {
    /// Creates a key from any string-like value.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RemediationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RemediationKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for RemediationKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}
