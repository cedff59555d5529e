//! Two-tier target prioritization for a scheduling pass.
//!
//! Targets whose friend-list preview already shows something actionable
//! (pending steal / dry / weed / insect counters) form the priority
//! tier and are always visited. Everyone else is only worth a visit to
//! place mischief, so the second tier is appended only while mischief
//! is enabled and at least one mischief quota remains.
//!
//! The pass runner enforces the matching early-stop rule during
//! iteration: once it reaches a non-priority entry with all mischief
//! quotas exhausted, the rest of the list is dropped. Priority entries
//! are never skipped for mischief-quota exhaustion -- help and steal
//! quotas are independent.

use std::collections::BTreeSet;

use tracing::debug;

use gleaner_types::Target;

use crate::quota::QuotaTracker;

/// Order and filter targets for one pass.
///
/// Output is the priority tier followed by the mischief-only tier,
/// deduplicated by id with the first occurrence winning. Relative input
/// order is preserved within each tier.
pub fn build_visit_order(
    targets: &[Target],
    tracker: &QuotaTracker,
    mischief_enabled: bool,
) -> Vec<Target> {
    let include_others = mischief_enabled && tracker.any_mischief_remaining();

    let mut seen: BTreeSet<_> = BTreeSet::new();
    let mut order: Vec<Target> = Vec::new();

    for target in targets.iter().filter(|t| t.has_preview_signal) {
        if seen.insert(target.id) {
            order.push(target.clone());
        }
    }

    if include_others {
        for target in targets.iter().filter(|t| !t.has_preview_signal) {
            if seen.insert(target.id) {
                order.push(target.clone());
            }
        }
    }

    debug!(
        total = targets.len(),
        scheduled = order.len(),
        include_others,
        "Visit order built"
    );

    order
}
