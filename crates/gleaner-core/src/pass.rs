//! One full scheduling pass over the target list.
//!
//! A pass is the unit of work the loop repeats: reset the quota store
//! for the current date, fetch the friend list, build the visit order,
//! then visit targets strictly sequentially. Failures are contained at
//! the narrowest scope that can absorb them -- a failed fetch yields an
//! empty pass, a failed visit skips one target -- so a pass itself
//! never propagates an error.
//!
//! The stop signal is honored only at target boundaries: an in-flight
//! visit always completes (or fails) before the stop takes effect.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use gleaner_types::UserId;

use crate::client::FarmClient;
use crate::config::{Features, Pacing};
use crate::quota::QuotaTracker;
use crate::runner::StopHandle;
use crate::scheduler::build_visit_order;
use crate::visit::{ActionTally, visit_target};

/// Aggregate result of one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassOutcome {
    /// Successful actions per kind, across all visited targets.
    pub tally: ActionTally,
    /// Targets whose visit ran to completion.
    pub targets_visited: u32,
    /// Targets skipped because their visit could not start.
    pub targets_skipped: u32,
    /// Whether the stop signal cut the pass short.
    pub stopped_early: bool,
}

/// Run one scheduling pass.
///
/// `today` anchors the day-rollover reset and is taken as a parameter
/// so tests can fabricate dates; the loop passes the local date.
pub async fn run_pass<C: FarmClient + ?Sized>(
    client: &C,
    tracker: &mut QuotaTracker,
    self_id: UserId,
    features: Features,
    pacing: &Pacing,
    today: NaiveDate,
    stop: &StopHandle,
) -> PassOutcome {
    tracker.reset_if_new_day(today);

    let mut outcome = PassOutcome::default();

    let targets = match client.fetch_targets().await {
        Ok(targets) => targets,
        Err(error) => {
            warn!(error = %error, "Could not fetch targets; pass produced no actions");
            return outcome;
        }
    };

    let mut order = build_visit_order(&targets, tracker, features.mischief);
    info!(scheduled = order.len(), "Pass starting");

    for target in &mut order {
        if stop.is_stop_requested() {
            info!("Stop requested; ending pass at target boundary");
            outcome.stopped_early = true;
            break;
        }

        // Non-priority targets are only worth visiting for mischief.
        // Once that quota is gone the rest of the list is all
        // non-priority too, so the pass can end here. Priority targets
        // are never skipped on this ground: help and steal quotas are
        // independent.
        if !target.has_preview_signal && !(features.mischief && tracker.any_mischief_remaining())
        {
            debug!("Mischief quota exhausted; dropping remaining non-priority targets");
            break;
        }

        if target.visited_this_pass {
            continue;
        }
        target.visited_this_pass = true;

        match visit_target(client, tracker, target, self_id, features, pacing).await {
            Ok(tally) => {
                outcome.targets_visited = outcome.targets_visited.saturating_add(1);
                outcome.tally.merge(&tally);
            }
            Err(error) => {
                warn!(
                    target = %target.id,
                    name = %target.display_name,
                    error = %error,
                    "Visit aborted; continuing with next target"
                );
                outcome.targets_skipped = outcome.targets_skipped.saturating_add(1);
            }
        }
    }

    outcome.tally.log_summary("pass");
    info!(
        visited = outcome.targets_visited,
        skipped = outcome.targets_skipped,
        stopped_early = outcome.stopped_early,
        "Pass finished"
    );
    outcome
}
