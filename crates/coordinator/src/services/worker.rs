//! Unit worker trait and a scripted in-memory implementation.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{RemediationKey, UnitId};

use crate::error::Failure;
use crate::unit::WorkUnit;

/// Performs the actual work for units and the out-of-band fixes for
/// remediation keys.
///
/// Contract:
/// - `attempt` may be called twice for the same unit (initial attempt plus
///   one retry), so it must be idempotent with respect to whatever side
///   effects it inspects, and it must classify every failure as exactly
///   one [`Failure`] variant.
/// - `remediate` is called at most once per distinct key per run and must
///   be safe to call even if the condition it fixes no longer holds.
#[async_trait]
pub trait UnitWorker: Send + Sync {
    /// The concrete unit type this worker processes.
    type Unit: WorkUnit;
    /// The successful per-unit output merged into the aggregate.
    type Output: Send;

    /// Attempts one unit's work.
    async fn attempt(&self, unit: &Self::Unit) -> Result<Self::Output, Failure>;

    /// Applies the corrective action for one remediation key.
    async fn remediate(&self, key: &RemediationKey) -> Result<(), Failure>;
}

/// A work unit addressing one ledger shard, used by the scripted worker
/// and throughout the test suite.
#[derive(Debug, Clone)]
pub struct ShardUnit {
    id: UnitId,
    /// Shard number, used as the script lookup key.
    pub shard: u32,
}

impl ShardUnit {
    /// Creates a unit for the given shard number.
    pub fn new(shard: u32) -> Self {
        Self {
            id: UnitId::new(),
            shard,
        }
    }
}

impl WorkUnit for ShardUnit {
    fn id(&self) -> UnitId {
        self.id
    }
}

/// Scripted outcome for one shard.
#[derive(Debug, Clone)]
pub enum Script {
    /// Attempt succeeds.
    Succeed,

    /// Attempt fails remediable until the key has been remediated, then
    /// succeeds.
    RemediableUntilGroomed(RemediationKey),

    /// Attempt fails remediable even after remediation (exhausts the
    /// retry budget).
    RemediableAlways(RemediationKey),

    /// Attempt fails remediable before remediation and fatally after it
    /// (models damage discovered only on retry).
    RemediableThenFatal(RemediationKey, String),

    /// Attempt fails fatally with the given cause.
    Fatal(String),

    /// Attempt parks on a pending future and never completes, so callers
    /// can exercise cancellation by dropping the run.
    Hang,
}

#[derive(Debug, Default)]
struct ScriptedWorkerState {
    scripts: HashMap<u32, Script>,
    remediated: HashSet<RemediationKey>,
    attempts: HashMap<u32, u32>,
    remediations: HashMap<RemediationKey, u32>,
    fail_remediation: HashSet<RemediationKey>,
}

/// In-memory worker for testing the coordinator.
///
/// Shards without a script succeed. Remediation marks the key as groomed,
/// so a `RemediableUntilGroomed` shard starts succeeding afterwards.
#[derive(Debug, Clone, Default)]
pub struct ScriptedWorker {
    state: Arc<RwLock<ScriptedWorkerState>>,
}

impl ScriptedWorker {
    /// Creates a new scripted worker where every shard succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the outcome for one shard.
    pub fn script(&self, shard: u32, script: Script) {
        self.state.write().unwrap().scripts.insert(shard, script);
    }

    /// Configures remediation of `key` to fail fatally.
    pub fn fail_remediation(&self, key: impl Into<RemediationKey>) {
        self.state
            .write()
            .unwrap()
            .fail_remediation
            .insert(key.into());
    }

    /// Number of attempts made for one shard.
    pub fn attempt_count(&self, shard: u32) -> u32 {
        self.state
            .read()
            .unwrap()
            .attempts
            .get(&shard)
            .copied()
            .unwrap_or(0)
    }

    /// Number of remediation calls made for one key.
    pub fn remediation_count(&self, key: &RemediationKey) -> u32 {
        self.state
            .read()
            .unwrap()
            .remediations
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    /// Total remediation calls across all keys.
    pub fn total_remediations(&self) -> u32 {
        self.state.read().unwrap().remediations.values().sum()
    }
}

#[async_trait]
impl UnitWorker for ScriptedWorker {
    type Unit = ShardUnit;
    type Output = String;

    async fn attempt(&self, unit: &ShardUnit) -> Result<String, Failure> {
        // Lock scope ends before the Hang arm awaits.
        let script = {
            let mut state = self.state.write().unwrap();
            *state.attempts.entry(unit.shard).or_insert(0) += 1;
            state
                .scripts
                .get(&unit.shard)
                .cloned()
                .unwrap_or(Script::Succeed)
        };
        let groomed = |key: &RemediationKey| self.state.read().unwrap().remediated.contains(key);

        match script {
            Script::Succeed => Ok(format!("batch-{:02}", unit.shard)),
            Script::RemediableUntilGroomed(key) => {
                if groomed(&key) {
                    Ok(format!("batch-{:02}", unit.shard))
                } else {
                    Err(Failure::remediable(key, "shard needs grooming"))
                }
            }
            Script::RemediableAlways(key) => {
                Err(Failure::remediable(key, "shard needs grooming"))
            }
            Script::RemediableThenFatal(key, reason) => {
                if groomed(&key) {
                    Err(Failure::fatal(reason))
                } else {
                    Err(Failure::remediable(key, "shard needs grooming"))
                }
            }
            Script::Fatal(reason) => Err(Failure::fatal(reason)),
            Script::Hang => std::future::pending().await,
        }
    }

    async fn remediate(&self, key: &RemediationKey) -> Result<(), Failure> {
        let mut state = self.state.write().unwrap();
        *state.remediations.entry(key.clone()).or_insert(0) += 1;

        if state.fail_remediation.contains(key) {
            return Err(Failure::fatal(format!("grooming '{}' failed", key)));
        }

        state.remediated.insert(key.clone());
        Ok(())
    }
}
