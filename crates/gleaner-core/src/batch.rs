//! Batch execution with per-item fallback.
//!
//! Applying one action kind to a set of lands is always attempted as a
//! single batch call first. If the batch fails -- transport error or a
//! server-side refusal -- the executor degrades to one isolated call
//! per land, pacing the sequence with a fixed inter-call pause so the
//! shared rate budget with the server is respected.
//!
//! Retry discipline is deliberately tight: the batch call is attempted
//! exactly once, each land gets at most one fallback attempt, and there
//! is no backoff of any kind. Rate control comes solely from the fixed
//! pause here and the inter-pass interval in the loop.
//!
//! Every successful reply feeds its quota tuples back into the tracker,
//! keeping the local cache as close to the authoritative counters as
//! the reply stream allows.

use std::time::Duration;

use tracing::{debug, warn};

use gleaner_types::{ActionKind, LandId, UserId};

use crate::client::{FarmClient, RpcError};
use crate::quota::QuotaTracker;

/// Cap on recorded per-item failure reasons. The failure counter stays
/// exact; only the reason list is bounded.
const MAX_RECORDED_FAILURES: usize = 16;

/// Aggregate result of a batch-with-fallback execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Lands the action was successfully applied to.
    pub ok_count: u32,
    /// Lands the action failed on (exact, even when reasons are capped).
    pub fail_count: u32,
    /// Bounded list of per-item failure reasons, for diagnostics only.
    /// Failed items are never retried further.
    pub failures: Vec<(LandId, String)>,
}

impl BatchOutcome {
    fn record_failure(&mut self, land: LandId, reason: String) {
        self.fail_count = self.fail_count.saturating_add(1);
        if self.failures.len() < MAX_RECORDED_FAILURES {
            self.failures.push((land, reason));
        }
    }
}

/// Apply `kind` to `items` on `target`'s farm, batching when possible.
///
/// The batch call is attempted exactly once. On batch failure every
/// item is retried individually, failures isolated, with `pause` slept
/// between sequential attempts. Empty input performs no calls.
pub async fn execute_with_fallback<C: FarmClient + ?Sized>(
    client: &C,
    tracker: &mut QuotaTracker,
    kind: ActionKind,
    target: UserId,
    items: &[LandId],
    pause: Duration,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    if items.is_empty() {
        return outcome;
    }

    match client.execute(kind, target, items).await {
        Ok(reply) if reply.ok => {
            tracker.apply_update(&reply.quota_reports);
            outcome.ok_count = u32::try_from(items.len()).unwrap_or(u32::MAX);
            debug!(
                kind = %kind,
                target = %target,
                count = items.len(),
                "Batch call succeeded"
            );
            return outcome;
        }
        Ok(reply) => {
            // The server answered but refused the batch; its quota view
            // is still authoritative.
            tracker.apply_update(&reply.quota_reports);
            warn!(
                kind = %kind,
                target = %target,
                message = %reply.message,
                "Batch call refused; falling back to per-item calls"
            );
        }
        Err(error) => {
            warn!(
                kind = %kind,
                target = %target,
                error = %error,
                "Batch call failed; falling back to per-item calls"
            );
        }
    }

    for &land in items {
        tokio::time::sleep(pause).await;
        match client.execute(kind, target, std::slice::from_ref(&land)).await {
            Ok(reply) if reply.ok => {
                tracker.apply_update(&reply.quota_reports);
                outcome.ok_count = outcome.ok_count.saturating_add(1);
            }
            Ok(reply) => {
                tracker.apply_update(&reply.quota_reports);
                outcome.record_failure(land, reply.message);
            }
            Err(error) => {
                outcome.record_failure(land, rpc_failure_reason(&error));
            }
        }
    }

    outcome
}

/// Render a transport-layer error into a bounded diagnostic reason.
fn rpc_failure_reason(error: &RpcError) -> String {
    format!("{error}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use gleaner_types::{FarmView, Target};

    use super::*;
    use crate::scripted::ScriptedFarm;

    const PAUSE: Duration = Duration::from_millis(1);

    fn make_tracker() -> QuotaTracker {
        QuotaTracker::new(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
    }

    fn lands(ids: &[u64]) -> Vec<LandId> {
        ids.iter().copied().map(LandId::new).collect()
    }

    fn make_farm(target: UserId) -> ScriptedFarm {
        let farm = ScriptedFarm::new();
        farm.add_target(
            Target::new(target, String::from("Lin"), true),
            FarmView {
                owner: target,
                lands: Vec::new(),
                quota_reports: Vec::new(),
            },
        );
        farm
    }

    #[tokio::test]
    async fn empty_items_perform_no_calls() {
        let target = UserId::new(1);
        let farm = make_farm(target);
        let mut tracker = make_tracker();

        let outcome =
            execute_with_fallback(&farm, &mut tracker, ActionKind::HelpWater, target, &[], PAUSE)
                .await;

        assert_eq!(outcome, BatchOutcome::default());
        assert!(farm.calls().is_empty());
    }

    #[tokio::test]
    async fn successful_batch_counts_all_items() {
        let target = UserId::new(1);
        let farm = make_farm(target);
        let mut tracker = make_tracker();

        let items = lands(&[1, 2, 3]);
        let outcome = execute_with_fallback(
            &farm,
            &mut tracker,
            ActionKind::HelpWater,
            target,
            &items,
            PAUSE,
        )
        .await;

        assert_eq!(outcome.ok_count, 3);
        assert_eq!(outcome.fail_count, 0);
        assert_eq!(
            farm.execute_calls_for(ActionKind::HelpWater),
            vec![lands(&[1, 2, 3])]
        );
    }

    #[tokio::test]
    async fn batch_failure_falls_back_per_item_once() {
        let target = UserId::new(1);
        let farm = make_farm(target);
        farm.fail_batch_for(ActionKind::Steal);
        farm.fail_land(LandId::new(2));
        farm.fail_land(LandId::new(4));
        let mut tracker = make_tracker();

        let items = lands(&[1, 2, 3, 4, 5]);
        let outcome = execute_with_fallback(
            &farm,
            &mut tracker,
            ActionKind::Steal,
            target,
            &items,
            PAUSE,
        )
        .await;

        assert_eq!(outcome.ok_count, 3);
        assert_eq!(outcome.fail_count, 2);
        assert_eq!(outcome.failures.len(), 2);
        assert_eq!(outcome.failures.first().unwrap().0, LandId::new(2));

        // Exactly one batch call, then one isolated call per item.
        let calls = farm.execute_calls_for(ActionKind::Steal);
        assert_eq!(calls.len(), 6);
        assert_eq!(calls.first().unwrap().len(), 5);
        assert!(calls.iter().skip(1).all(|call| call.len() == 1));
    }

    #[tokio::test]
    async fn successful_replies_update_quota_cache() {
        let target = UserId::new(1);
        let farm = make_farm(target);
        farm.set_quota(ActionKind::HelpWeed, 0, 10, 0, 5);
        let mut tracker = make_tracker();

        let items = lands(&[1, 2]);
        let _ = execute_with_fallback(
            &farm,
            &mut tracker,
            ActionKind::HelpWeed,
            target,
            &items,
            PAUSE,
        )
        .await;

        assert_eq!(tracker.remaining(ActionKind::HelpWeed), 8);
        assert!(tracker.can_earn_experience(ActionKind::HelpWeed));
    }

    #[tokio::test]
    async fn fallback_successes_still_feed_quota_cache() {
        let target = UserId::new(1);
        let farm = make_farm(target);
        farm.fail_batch_for(ActionKind::PutWeed);
        farm.set_quota(ActionKind::PutWeed, 0, 10, 0, 0);
        let mut tracker = make_tracker();

        let items = lands(&[1, 2]);
        let outcome = execute_with_fallback(
            &farm,
            &mut tracker,
            ActionKind::PutWeed,
            target,
            &items,
            PAUSE,
        )
        .await;

        assert_eq!(outcome.ok_count, 2);
        assert_eq!(tracker.remaining(ActionKind::PutWeed), 8);
    }

    #[tokio::test]
    async fn failure_reasons_are_bounded() {
        let target = UserId::new(1);
        let farm = make_farm(target);
        farm.fail_batch_for(ActionKind::HelpInsect);
        let ids: Vec<u64> = (1..=20).collect();
        for &id in &ids {
            farm.fail_land(LandId::new(id));
        }
        let mut tracker = make_tracker();

        let items = lands(&ids);
        let outcome = execute_with_fallback(
            &farm,
            &mut tracker,
            ActionKind::HelpInsect,
            target,
            &items,
            PAUSE,
        )
        .await;

        assert_eq!(outcome.fail_count, 20);
        assert_eq!(outcome.failures.len(), MAX_RECORDED_FAILURES);
    }
}
