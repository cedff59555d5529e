//! Per-target visit: enter, classify, execute buckets, leave.
//!
//! A visit is a small state machine: `enter -> classify -> {per bucket:
//! precheck -> execute -> quota update} -> leave`. Entry failure aborts
//! the visit (the pass moves on); leave failure is swallowed
//! unconditionally -- cleanup is best-effort and never blocks the pass.
//!
//! Buckets run in a fixed order (weed -> insect -> water -> steal ->
//! mischief) so experience-gated help actions are attempted before
//! quota-hungry steal and mischief work drains the per-target budget.
//!
//! Gating differs by family:
//!
//! - **Help** actions need local `can_operate` and `can_earn_experience`
//!   before a remote precheck is even issued; a precheck denial skips
//!   the bucket, while a precheck *failure* degrades fail-open so a
//!   transient error cannot stall all help behavior.
//! - **Steal** needs `can_operate` and the precheck, with no experience
//!   gate.
//! - **Mischief** uses no precheck at all; the locally cached
//!   `remaining` value directly bounds how many lands are attempted.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use gleaner_types::{ActionKind, LandId, PrecheckVerdict, Target, UserId};

use crate::analyzer;
use crate::batch::execute_with_fallback;
use crate::client::{FarmClient, RpcError};
use crate::config::{Features, Pacing};
use crate::quota::QuotaTracker;

/// Errors that abort a single visit.
#[derive(Debug, thiserror::Error)]
pub enum VisitError {
    /// Entering the target's farm failed; no actions were attempted.
    #[error("could not enter farm of {target}: {source}")]
    Enter {
        /// The target whose farm could not be entered.
        target: UserId,
        /// The underlying remote-call error.
        source: RpcError,
    },
}

/// Per-action-kind counters accumulated during a visit or a pass.
///
/// Created fresh at visit/pass start and discarded after being logged;
/// never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionTally {
    counts: BTreeMap<ActionKind, u32>,
}

impl ActionTally {
    /// Add `count` performances of `kind`.
    pub fn add(&mut self, kind: ActionKind, count: u32) {
        if count == 0 {
            return;
        }
        let entry = self.counts.entry(kind).or_insert(0);
        *entry = entry.saturating_add(count);
    }

    /// Performances recorded for `kind`.
    pub fn get(&self, kind: ActionKind) -> u32 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Total performances across all kinds.
    pub fn total(&self) -> u32 {
        self.counts
            .values()
            .fold(0_u32, |sum, &count| sum.saturating_add(count))
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Fold another tally into this one.
    pub fn merge(&mut self, other: &Self) {
        for (&kind, &count) in &other.counts {
            self.add(kind, count);
        }
    }

    /// Emit a structured log line summarizing the tally.
    pub fn log_summary(&self, scope: &str) {
        info!(
            scope,
            help_weed = self.get(ActionKind::HelpWeed),
            help_insect = self.get(ActionKind::HelpInsect),
            help_water = self.get(ActionKind::HelpWater),
            steal = self.get(ActionKind::Steal),
            put_weed = self.get(ActionKind::PutWeed),
            put_insect = self.get(ActionKind::PutInsect),
            total = self.total(),
            "Action tally"
        );
    }
}

/// Visit one target's farm and run every enabled bucket.
///
/// Returns the per-kind tally of successful actions. Only entry failure
/// is an error; everything past the door is isolated per bucket and per
/// item.
pub async fn visit_target<C: FarmClient + ?Sized>(
    client: &C,
    tracker: &mut QuotaTracker,
    target: &Target,
    self_id: UserId,
    features: Features,
    pacing: &Pacing,
) -> Result<ActionTally, VisitError> {
    let view = client
        .enter_farm(target.id)
        .await
        .map_err(|source| VisitError::Enter {
            target: target.id,
            source,
        })?;
    tracker.apply_update(&view.quota_reports);

    let buckets = analyzer::classify(&view.lands, self_id);
    debug!(
        target = %target.id,
        name = %target.display_name,
        lands = view.lands.len(),
        "Farm entered and classified"
    );

    let mut tally = ActionTally::default();

    if features.help {
        run_help_bucket(
            client,
            tracker,
            ActionKind::HelpWeed,
            target.id,
            &buckets.needs_weed,
            pacing,
            &mut tally,
        )
        .await;
        run_help_bucket(
            client,
            tracker,
            ActionKind::HelpInsect,
            target.id,
            &buckets.needs_insecticide,
            pacing,
            &mut tally,
        )
        .await;
        run_help_bucket(
            client,
            tracker,
            ActionKind::HelpWater,
            target.id,
            &buckets.needs_water,
            pacing,
            &mut tally,
        )
        .await;
    }

    if features.steal {
        run_steal_bucket(client, tracker, target.id, &buckets.stealable, pacing, &mut tally)
            .await;
    }

    if features.mischief {
        run_mischief_bucket(
            client,
            tracker,
            ActionKind::PutWeed,
            target.id,
            &buckets.weed_mischief,
            pacing,
            &mut tally,
        )
        .await;
        run_mischief_bucket(
            client,
            tracker,
            ActionKind::PutInsect,
            target.id,
            &buckets.insect_mischief,
            pacing,
            &mut tally,
        )
        .await;
    }

    leave_best_effort(client, target.id).await;
    Ok(tally)
}

/// Execute an experience-gated help bucket.
async fn run_help_bucket<C: FarmClient + ?Sized>(
    client: &C,
    tracker: &mut QuotaTracker,
    kind: ActionKind,
    target: UserId,
    items: &[LandId],
    pacing: &Pacing,
    tally: &mut ActionTally,
) {
    if items.is_empty() || !tracker.can_operate(kind) {
        return;
    }
    if !tracker.can_earn_experience(kind) {
        debug!(kind = %kind, target = %target, "Experience quota spent; bucket skipped");
        return;
    }
    if !precheck_allows(client, kind, target).await {
        return;
    }
    let outcome =
        execute_with_fallback(client, tracker, kind, target, items, pacing.call_pause).await;
    tally.add(kind, outcome.ok_count);
}

/// Execute the steal bucket (prechecked, no experience gate).
async fn run_steal_bucket<C: FarmClient + ?Sized>(
    client: &C,
    tracker: &mut QuotaTracker,
    target: UserId,
    items: &[LandId],
    pacing: &Pacing,
    tally: &mut ActionTally,
) {
    let kind = ActionKind::Steal;
    if items.is_empty() || !tracker.can_operate(kind) {
        return;
    }
    if !precheck_allows(client, kind, target).await {
        return;
    }
    let outcome =
        execute_with_fallback(client, tracker, kind, target, items, pacing.call_pause).await;
    tally.add(kind, outcome.ok_count);
}

/// Execute a quantity-gated mischief bucket. No remote precheck: the
/// cached `remaining` value bounds how many lands are attempted.
async fn run_mischief_bucket<C: FarmClient + ?Sized>(
    client: &C,
    tracker: &mut QuotaTracker,
    kind: ActionKind,
    target: UserId,
    items: &[LandId],
    pacing: &Pacing,
    tally: &mut ActionTally,
) {
    let remaining = tracker.remaining(kind);
    if items.is_empty() || remaining == 0 {
        return;
    }
    let allowed = usize::try_from(remaining).unwrap_or(usize::MAX);
    let bounded = items.get(..items.len().min(allowed)).unwrap_or(items);
    let outcome =
        execute_with_fallback(client, tracker, kind, target, bounded, pacing.call_pause).await;
    tally.add(kind, outcome.ok_count);
}

/// Issue the remote precheck for a gated action.
///
/// A reported denial skips the bucket; a failed precheck call degrades
/// fail-open so a transient error cannot silently stall all help and
/// steal behavior.
async fn precheck_allows<C: FarmClient + ?Sized>(
    client: &C,
    kind: ActionKind,
    target: UserId,
) -> bool {
    match client.precheck(kind, target).await {
        Ok(PrecheckVerdict::Allowed) => true,
        Ok(PrecheckVerdict::Denied) => {
            debug!(kind = %kind, target = %target, "Precheck denied; bucket skipped");
            false
        }
        Err(error) => {
            warn!(
                kind = %kind,
                target = %target,
                error = %error,
                "Precheck call failed; proceeding fail-open"
            );
            true
        }
    }
}

/// Best-effort farm exit. Failures are swallowed unconditionally:
/// cleanup must never block the pass and is never retried.
pub async fn leave_best_effort<C: FarmClient + ?Sized>(client: &C, target: UserId) {
    if let Err(error) = client.leave_farm(target).await {
        debug!(target = %target, error = %error, "Leave failed; ignored");
    }
}

/// The action families a manual single-target operation can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualAction {
    /// Steal from mature stealable lands.
    Steal,
    /// Water dry lands.
    Water,
    /// Pull weeds from weeded lands.
    Weed,
    /// Spray insect-ridden lands.
    Insecticide,
    /// Place weed and insect markers.
    Mischief,
}

/// Result of a manual single-target operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualOutcome {
    /// Whether the operation ran (false only when entry failed).
    pub ok: bool,
    /// Number of lands successfully acted on.
    pub count: u32,
    /// Human-readable summary for the caller's display.
    pub message: String,
}

/// Run one action family against a single target, outside the periodic
/// loop, with the same precheck and fallback rules as a pass visit.
///
/// Feature toggles are not consulted: a manual request expresses
/// explicit intent.
pub async fn perform_action<C: FarmClient + ?Sized>(
    client: &C,
    tracker: &mut QuotaTracker,
    target: UserId,
    action: ManualAction,
    self_id: UserId,
    pacing: &Pacing,
) -> ManualOutcome {
    let view = match client.enter_farm(target).await {
        Ok(view) => view,
        Err(error) => {
            warn!(target = %target, error = %error, "Manual operation could not enter farm");
            return ManualOutcome {
                ok: false,
                count: 0,
                message: format!("could not enter farm: {error}"),
            };
        }
    };
    tracker.apply_update(&view.quota_reports);
    let buckets = analyzer::classify(&view.lands, self_id);

    let mut tally = ActionTally::default();
    match action {
        ManualAction::Steal => {
            run_steal_bucket(client, tracker, target, &buckets.stealable, pacing, &mut tally)
                .await;
        }
        ManualAction::Water => {
            run_help_bucket(
                client,
                tracker,
                ActionKind::HelpWater,
                target,
                &buckets.needs_water,
                pacing,
                &mut tally,
            )
            .await;
        }
        ManualAction::Weed => {
            run_help_bucket(
                client,
                tracker,
                ActionKind::HelpWeed,
                target,
                &buckets.needs_weed,
                pacing,
                &mut tally,
            )
            .await;
        }
        ManualAction::Insecticide => {
            run_help_bucket(
                client,
                tracker,
                ActionKind::HelpInsect,
                target,
                &buckets.needs_insecticide,
                pacing,
                &mut tally,
            )
            .await;
        }
        ManualAction::Mischief => {
            run_mischief_bucket(
                client,
                tracker,
                ActionKind::PutWeed,
                target,
                &buckets.weed_mischief,
                pacing,
                &mut tally,
            )
            .await;
            run_mischief_bucket(
                client,
                tracker,
                ActionKind::PutInsect,
                target,
                &buckets.insect_mischief,
                pacing,
                &mut tally,
            )
            .await;
        }
    }

    leave_best_effort(client, target).await;

    let count = tally.total();
    ManualOutcome {
        ok: true,
        count,
        message: if count == 0 {
            String::from("nothing to do")
        } else {
            format!("{count} lands handled")
        },
    }
}
