//! Daily quota tracking with day-rollover reset.
//!
//! The server enforces daily caps on every action kind and reports the
//! authoritative counters inside its replies. [`QuotaTracker`] is the
//! process-wide best-effort cache of those counters: it is overwritten
//! (never merge-incremented) from each reply and cleared in full when
//! the local calendar date changes.
//!
//! Absence of an entry is handled asymmetrically:
//!
//! - [`can_operate`] fails **open** -- attempting an action whose quota
//!   we have never seen is typically harmless; the server will refuse it
//!   and the refusal reply populates the cache.
//! - [`can_earn_experience`] fails **closed** -- spending a scarce help
//!   quota to chase experience that may already be exhausted wastes a
//!   remote call for nothing.
//!
//! [`can_operate`]: QuotaTracker::can_operate
//! [`can_earn_experience`]: QuotaTracker::can_earn_experience

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, info};

use gleaner_types::{ActionKind, MISCHIEF_KINDS, OperationQuota, QuotaReport, QuotaSnapshotEntry};

/// Sentinel returned by [`QuotaTracker::remaining`] when no practical
/// cap exists for an action kind.
pub const UNLIMITED: u32 = u32::MAX;

/// Process-wide cache of per-action-kind daily quota counters.
///
/// Constructed once at startup and threaded mutably through the single
/// sequential control flow -- never accessed as ambient global state.
/// State lives for the process lifetime and is reset (not recreated) on
/// date rollover; it is never persisted across restarts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaTracker {
    /// Cached quota entries keyed by action kind.
    entries: BTreeMap<ActionKind, OperationQuota>,
    /// The local date the store was last cleared for.
    last_reset: NaiveDate,
}

impl QuotaTracker {
    /// Create an empty tracker anchored to the given local date.
    ///
    /// The date is a parameter (rather than read from the wall clock
    /// internally) so tests can fabricate rollovers. Callers use the
    /// **local** date; if the process runs in a different time zone than
    /// the game server, resets can fire at the wrong moment. That
    /// behavior is inherited from the original helper and kept as is.
    pub const fn new(today: NaiveDate) -> Self {
        Self {
            entries: BTreeMap::new(),
            last_reset: today,
        }
    }

    /// Clear the store iff `today` differs from the last reset date.
    ///
    /// Must run before any quota read in a pass and before applying any
    /// update, so stale cross-day counters never influence a decision.
    pub fn reset_if_new_day(&mut self, today: NaiveDate) {
        if today == self.last_reset {
            return;
        }
        info!(
            previous = %self.last_reset,
            current = %today,
            dropped_entries = self.entries.len(),
            "Quota store reset for new day"
        );
        self.entries.clear();
        self.last_reset = today;
    }

    /// Overwrite cached entries from authoritative server tuples.
    ///
    /// Reports carrying unknown action-type ids are skipped. No-op on
    /// empty input.
    pub fn apply_update(&mut self, reports: &[QuotaReport]) {
        for report in reports {
            let Some(kind) = ActionKind::from_wire(report.action_type_id) else {
                debug!(
                    action_type_id = report.action_type_id,
                    "Skipping quota report with unknown action-type id"
                );
                continue;
            };
            self.entries.insert(
                kind,
                OperationQuota {
                    kind,
                    count_today: report.count_today,
                    count_limit: report.count_limit,
                    exp_count_today: report.exp_count_today,
                    exp_count_limit: report.exp_count_limit,
                },
            );
        }
    }

    /// Whether the action may still be performed today.
    ///
    /// True when no entry is recorded (fail-open), the limit is `<= 0`
    /// (unlimited), or the count is below the limit.
    pub fn can_operate(&self, kind: ActionKind) -> bool {
        self.entries
            .get(&kind)
            .is_none_or(|quota| !quota.count_exhausted())
    }

    /// Whether the action can still earn experience today.
    ///
    /// False when no entry is recorded (fail-closed); otherwise the same
    /// logic as [`can_operate`] against the experience-specific limit.
    ///
    /// [`can_operate`]: QuotaTracker::can_operate
    pub fn can_earn_experience(&self, kind: ActionKind) -> bool {
        self.entries
            .get(&kind)
            .is_some_and(|quota| !quota.exp_exhausted())
    }

    /// Remaining performances today, clamped to zero when a positive
    /// limit exists; [`UNLIMITED`] when no cap is recorded.
    pub fn remaining(&self, kind: ActionKind) -> u32 {
        match self.entries.get(&kind) {
            Some(quota) if quota.count_limit > 0 => quota
                .count_limit
                .unsigned_abs()
                .saturating_sub(quota.count_today),
            _ => UNLIMITED,
        }
    }

    /// Whether at least one mischief kind still has remaining quota.
    ///
    /// Used by the scheduler to decide if non-priority targets are worth
    /// visiting at all.
    pub fn any_mischief_remaining(&self) -> bool {
        MISCHIEF_KINDS.iter().any(|&kind| self.remaining(kind) > 0)
    }

    /// The local date the store was last cleared for.
    pub const fn last_reset(&self) -> NaiveDate {
        self.last_reset
    }

    /// Diagnostic snapshot of every cached entry, for external display.
    pub fn snapshot(&self) -> Vec<QuotaSnapshotEntry> {
        self.entries
            .values()
            .map(|quota| QuotaSnapshotEntry {
                kind: quota.kind,
                count_today: quota.count_today,
                count_limit: quota.count_limit,
                remaining: self.remaining(quota.kind),
                exp_count_today: quota.exp_count_today,
                exp_count_limit: quota.exp_count_limit,
            })
            .collect()
    }
}
