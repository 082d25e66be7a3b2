//! Partitioned retry coordinator.

use std::collections::HashSet;

use common::{RemediationKey, UnitId};

use crate::aggregate::Aggregate;
use crate::error::{AbortReason, Failure};
use crate::services::escalation::{AbortReport, EscalationSink};
use crate::services::worker::UnitWorker;
use crate::state::UnitState;
use crate::unit::WorkUnit;

/// Drives a set of independent work units through attempt, remediation
/// and a single retry, aggregating results all-or-nothing.
///
/// The run is three sequential passes: attempt every unit, remediate each
/// distinct key collected from remediable failures, then retry the
/// deferred units once. Any fatal failure aborts the whole run and the
/// partially built aggregate is discarded; the caller gets either every
/// unit's result or none.
pub struct RetryCoordinator<W, E> {
    worker: W,
    escalation: E,
}

impl<W, E> RetryCoordinator<W, E>
where
    W: UnitWorker,
    E: EscalationSink,
{
    /// Creates a new coordinator over the given worker and escalation sink.
    pub fn new(worker: W, escalation: E) -> Self {
        Self { worker, escalation }
    }

    /// Runs all units to completion or aborts on the first fatal condition.
    ///
    /// Units are processed in input order within each pass, so aborts are
    /// deterministic for a given input. Each unit is attempted at most
    /// twice and each distinct remediation key is remediated at most once.
    ///
    /// Cancellation: dropping the returned future cancels any in-flight
    /// `attempt`/`remediate` call and drops the partial aggregate, so a
    /// cancelled run never surfaces a result.
    #[tracing::instrument(skip(self, units), fields(units = units.len()))]
    pub async fn run<A>(&self, units: Vec<W::Unit>) -> Result<A, AbortReason>
    where
        A: Aggregate<Item = W::Output>,
    {
        metrics::counter!("coordinator_runs_total").increment(1);
        let run_start = std::time::Instant::now();

        let total = units.len();
        let mut aggregate = A::default();
        // State is tracked per input position, not per id, so duplicate
        // unit ids cannot alias each other's lifecycle.
        let mut states: Vec<UnitState> = vec![UnitState::Pending; total];

        // Units deferred after a remediable first attempt, in input order.
        let mut deferred: Vec<(usize, W::Unit)> = Vec::new();
        // Distinct keys in first-seen order, each with the first unit
        // deferred under it (for abort attribution).
        let mut pending_keys: Vec<(RemediationKey, UnitId)> = Vec::new();
        let mut seen_keys: HashSet<RemediationKey> = HashSet::new();
        let mut attempted = 0usize;

        // 1. First pass: attempt every unit, merging successes immediately.
        tracing::info!(units = total, "first pass started");
        for (index, unit) in units.into_iter().enumerate() {
            let unit_id = unit.id();
            debug_assert!(states[index].can_attempt());
            attempted += 1;

            match self.worker.attempt(&unit).await {
                Ok(result) => {
                    states[index] = UnitState::Succeeded;
                    aggregate.merge(result);
                }
                Err(Failure::Remediable { key, reason }) => {
                    tracing::debug!(%unit_id, %key, reason, "unit deferred for remediation");
                    states[index] = UnitState::AwaitingRemediation;
                    if seen_keys.insert(key.clone()) {
                        pending_keys.push((key, unit_id));
                    }
                    deferred.push((index, unit));
                }
                Err(Failure::Fatal { reason }) => {
                    states[index] = UnitState::Failed;
                    let cause = self
                        .abort(
                            AbortReason::Fatal {
                                unit: unit_id,
                                cause: reason,
                            },
                            attempted,
                        )
                        .await;
                    return Err(cause);
                }
            }
        }

        // 2. Remediation pass: once per distinct key. A failed remediation
        // is terminal for the run, whatever its classification.
        if !pending_keys.is_empty() {
            tracing::info!(keys = pending_keys.len(), "remediation pass started");
        }
        for (key, owner) in &pending_keys {
            if let Err(failure) = self.worker.remediate(key).await {
                let cause = self
                    .abort(
                        AbortReason::Fatal {
                            unit: *owner,
                            cause: failure.to_string(),
                        },
                        attempted,
                    )
                    .await;
                return Err(cause);
            }
            metrics::counter!("coordinator_remediations_total").increment(1);
        }

        // 3. Retry pass: one retry per deferred unit. A remediable failure
        // here should not happen after remediation, but a persisting
        // condition must exhaust the budget rather than loop.
        let retried = deferred.len();
        if retried > 0 {
            tracing::info!(units = retried, "retry pass started");
        }
        for (index, unit) in deferred {
            let unit_id = unit.id();
            debug_assert!(states[index].can_retry());
            states[index] = UnitState::Retrying;
            attempted += 1;
            metrics::counter!("coordinator_units_retried").increment(1);

            match self.worker.attempt(&unit).await {
                Ok(result) => {
                    states[index] = UnitState::Succeeded;
                    aggregate.merge(result);
                }
                Err(Failure::Remediable { key, reason }) => {
                    states[index] = UnitState::Failed;
                    tracing::warn!(%unit_id, %key, reason, "unit still remediable after remediation");
                    let cause = self
                        .abort(AbortReason::RetryExhausted { unit: unit_id }, attempted)
                        .await;
                    return Err(cause);
                }
                Err(Failure::Fatal { reason }) => {
                    states[index] = UnitState::Failed;
                    let cause = self
                        .abort(
                            AbortReason::Fatal {
                                unit: unit_id,
                                cause: reason,
                            },
                            attempted,
                        )
                        .await;
                    return Err(cause);
                }
            }
        }

        debug_assert!(states.iter().all(|state| state.is_terminal()));

        let duration = run_start.elapsed().as_secs_f64();
        metrics::histogram!("coordinator_run_duration_seconds").record(duration);
        metrics::counter!("coordinator_runs_completed").increment(1);
        tracing::info!(
            units = total,
            retried,
            remediations = pending_keys.len(),
            duration,
            "run completed"
        );

        Ok(aggregate)
    }

    /// Records and escalates an abort, then hands the reason back to `run`.
    async fn abort(&self, reason: AbortReason, units_attempted: usize) -> AbortReason {
        metrics::counter!("coordinator_runs_failed").increment(1);
        tracing::warn!(%reason, units_attempted, "run aborted, discarding aggregate");

        let report = AbortReport::new(reason.clone(), units_attempted);
        self.escalation.report(&report).await;

        reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::escalation::InMemoryEscalationSink;
    use crate::services::worker::{Script, ScriptedWorker, ShardUnit};

    fn setup() -> (
        RetryCoordinator<ScriptedWorker, InMemoryEscalationSink>,
        ScriptedWorker,
        InMemoryEscalationSink,
    ) {
        let worker = ScriptedWorker::new();
        let sink = InMemoryEscalationSink::new();
        let coordinator = RetryCoordinator::new(worker.clone(), sink.clone());
        (coordinator, worker, sink)
    }

    fn shards(numbers: &[u32]) -> Vec<ShardUnit> {
        numbers.iter().copied().map(ShardUnit::new).collect()
    }

    #[tokio::test]
    async fn all_success_never_remediates() {
        let (coordinator, worker, sink) = setup();

        let batches: Vec<String> = coordinator.run(shards(&[1, 2, 3])).await.unwrap();

        assert_eq!(batches, vec!["batch-01", "batch-02", "batch-03"]);
        assert_eq!(worker.total_remediations(), 0);
        assert_eq!(sink.report_count(), 0);
        for shard in [1, 2, 3] {
            assert_eq!(worker.attempt_count(shard), 1);
        }
    }

    #[tokio::test]
    async fn remediable_unit_is_retried_after_grooming() {
        let (coordinator, worker, _sink) = setup();
        let key = RemediationKey::new("needs-groom");
        worker.script(2, Script::RemediableUntilGroomed(key.clone()));

        let batches: Vec<String> = coordinator.run(shards(&[1, 2, 3])).await.unwrap();

        // Shard 2 merges after the retry pass, so it lands last.
        assert_eq!(batches, vec!["batch-01", "batch-03", "batch-02"]);
        assert_eq!(worker.attempt_count(2), 2);
        assert_eq!(worker.remediation_count(&key), 1);
    }

    #[tokio::test]
    async fn shared_key_is_remediated_once() {
        let (coordinator, worker, _sink) = setup();
        let key = RemediationKey::new("needs-groom");
        for shard in [1, 2, 3, 4] {
            worker.script(shard, Script::RemediableUntilGroomed(key.clone()));
        }

        let batches: Vec<String> = coordinator.run(shards(&[1, 2, 3, 4])).await.unwrap();

        assert_eq!(batches.len(), 4);
        assert_eq!(worker.remediation_count(&key), 1);
        assert_eq!(worker.total_remediations(), 1);
    }

    #[tokio::test]
    async fn fatal_failure_aborts_without_attempting_later_units() {
        let (coordinator, worker, sink) = setup();
        worker.script(2, Script::Fatal("disk-corrupt".to_string()));

        let result: Result<Vec<String>, _> = coordinator.run(shards(&[1, 2, 3])).await;

        let reason = result.unwrap_err();
        assert!(matches!(reason, AbortReason::Fatal { ref cause, .. } if cause == "disk-corrupt"));
        assert_eq!(worker.attempt_count(1), 1);
        assert_eq!(worker.attempt_count(2), 1);
        assert_eq!(worker.attempt_count(3), 0);
        assert_eq!(sink.report_count(), 1);
        assert_eq!(sink.last_reason(), Some(reason));
    }

    #[tokio::test]
    async fn remediation_failure_aborts_as_fatal() {
        let (coordinator, worker, sink) = setup();
        let key = RemediationKey::new("needs-groom");
        worker.script(2, Script::RemediableUntilGroomed(key.clone()));
        worker.fail_remediation(key);

        let units = shards(&[1, 2, 3]);
        let deferred_id = units[1].id();
        let result: Result<Vec<String>, _> = coordinator.run(units).await;

        let reason = result.unwrap_err();
        assert!(matches!(
            reason,
            AbortReason::Fatal { unit, .. } if unit == deferred_id
        ));
        // Remediation is not retried and the deferred unit is never
        // re-attempted.
        assert_eq!(worker.attempt_count(2), 1);
        assert_eq!(sink.report_count(), 1);
    }

    #[tokio::test]
    async fn persisting_remediable_exhausts_retry_budget() {
        let (coordinator, worker, sink) = setup();
        let key = RemediationKey::new("needs-groom");
        worker.script(2, Script::RemediableAlways(key.clone()));

        let units = shards(&[1, 2, 3]);
        let stuck_id = units[1].id();
        let result: Result<Vec<String>, _> = coordinator.run(units).await;

        assert_eq!(
            result.unwrap_err(),
            AbortReason::RetryExhausted { unit: stuck_id }
        );
        assert_eq!(worker.attempt_count(2), 2);
        assert_eq!(worker.remediation_count(&key), 1);
        assert_eq!(sink.report_count(), 1);
    }

    #[tokio::test]
    async fn duplicate_unit_ids_are_processed_independently() {
        let (coordinator, worker, sink) = setup();
        let unit = ShardUnit::new(1);
        let twin = unit.clone();

        let batches: Vec<String> = coordinator.run(vec![unit, twin]).await.unwrap();

        assert_eq!(batches, vec!["batch-01", "batch-01"]);
        assert_eq!(worker.attempt_count(1), 2);
        assert_eq!(sink.report_count(), 0);
    }

    #[tokio::test]
    async fn empty_unit_set_yields_empty_aggregate() {
        let (coordinator, worker, sink) = setup();

        let batches: Vec<String> = coordinator.run(Vec::new()).await.unwrap();

        assert!(batches.is_empty());
        assert_eq!(worker.total_remediations(), 0);
        assert_eq!(sink.report_count(), 0);
    }
}
