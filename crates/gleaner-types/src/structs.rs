//! Core data structs: quota records, targets, land snapshots, farm views.
//!
//! Everything here is either a best-effort cache of server-authoritative
//! state ([`OperationQuota`]) or a pass-scoped snapshot created fresh on
//! each visit and discarded afterwards ([`Target`], [`LandSnapshot`],
//! [`FarmView`]). Nothing in this module is persisted.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::enums::ActionKind;
use crate::ids::{LandId, UserId};

/// Locally cached daily quota state for one action kind.
///
/// Counts are monotonically non-decreasing within a calendar day; the
/// server is the source of truth and entries are overwritten wholesale
/// from each authoritative reply. A limit `<= 0` means the server
/// enforces no cap for that dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationQuota {
    /// The action kind this quota applies to.
    pub kind: ActionKind,
    /// How many times the action was performed today.
    pub count_today: u32,
    /// Daily cap on performances; `<= 0` means unlimited.
    pub count_limit: i32,
    /// How many experience-eligible performances happened today.
    pub exp_count_today: u32,
    /// Daily cap on experience-eligible performances; `<= 0` means
    /// unlimited.
    pub exp_count_limit: i32,
}

impl OperationQuota {
    /// Whether the plain daily count is exhausted.
    pub const fn count_exhausted(&self) -> bool {
        self.count_limit > 0 && self.count_today >= self.count_limit.unsigned_abs()
    }

    /// Whether the experience-eligible daily count is exhausted.
    pub const fn exp_exhausted(&self) -> bool {
        self.exp_count_limit > 0 && self.exp_count_today >= self.exp_count_limit.unsigned_abs()
    }
}

/// Wire-shaped quota tuple as delivered inside server replies.
///
/// `action_type_id` is the server's numeric id; unknown ids are skipped
/// by quota bookkeeping rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaReport {
    /// Server-side numeric action-type id (see [`ActionKind::wire_id`]).
    pub action_type_id: u32,
    /// Performances counted today.
    pub count_today: u32,
    /// Daily cap; `<= 0` means unlimited.
    pub count_limit: i32,
    /// Experience-eligible performances counted today.
    pub exp_count_today: u32,
    /// Daily experience cap; `<= 0` means unlimited.
    pub exp_count_limit: i32,
}

/// A friend whose farm the scheduler may visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// The friend's user id.
    pub id: UserId,
    /// Display name, used only for logging.
    pub display_name: String,
    /// True when the friend-list summary counters (pending steal / dry /
    /// weed / insect indicators) are nonzero. Such targets are visited
    /// with priority.
    pub has_preview_signal: bool,
    /// Set once the pass has visited this target; guards against
    /// duplicate visits within a single pass.
    pub visited_this_pass: bool,
}

impl Target {
    /// Convenience constructor for a not-yet-visited target.
    pub const fn new(id: UserId, display_name: String, has_preview_signal: bool) -> Self {
        Self {
            id,
            display_name,
            has_preview_signal,
            visited_this_pass: false,
        }
    }
}

/// Snapshot of a single land plot, as observed on entering a farm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandSnapshot {
    /// The plot's id.
    pub id: LandId,
    /// Growth phase; `None` when the plot carries no active crop data
    /// (empty plot), in which case it yields no actions.
    pub phase: Option<crate::enums::LifecyclePhase>,
    /// Whether a mature crop still has a stealable share left.
    pub stealable: bool,
    /// Dryness level; `> 0` means the land needs water.
    pub dryness: u32,
    /// Actors who placed weed markers on this land (capped at 2 by the
    /// server; one per actor).
    pub weed_markers: BTreeSet<UserId>,
    /// Actors who placed insect markers on this land (same caps).
    pub insect_markers: BTreeSet<UserId>,
}

impl LandSnapshot {
    /// An empty plot with the given id (no crop, nothing to do).
    pub const fn empty(id: LandId) -> Self {
        Self {
            id,
            phase: None,
            stealable: false,
            dryness: 0,
            weed_markers: BTreeSet::new(),
            insect_markers: BTreeSet::new(),
        }
    }
}

/// What entering a target's farm yields: the land snapshots plus any
/// quota reports piggybacked on the reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmView {
    /// The farm owner's user id.
    pub owner: UserId,
    /// Snapshot of every land plot on the farm.
    pub lands: Vec<LandSnapshot>,
    /// Authoritative quota tuples carried by the enter reply, if any.
    pub quota_reports: Vec<QuotaReport>,
}

/// One row of the diagnostic quota snapshot exposed for external
/// display (panel, logs). Not used internally beyond logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaSnapshotEntry {
    /// The action kind.
    pub kind: ActionKind,
    /// Performances counted today.
    pub count_today: u32,
    /// Daily cap; `<= 0` means unlimited.
    pub count_limit: i32,
    /// Remaining performances today (`u32::MAX` when uncapped).
    pub remaining: u32,
    /// Experience-eligible performances counted today.
    pub exp_count_today: u32,
    /// Daily experience cap; `<= 0` means unlimited.
    pub exp_count_limit: i32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn quota_exhaustion_respects_unlimited() {
        let quota = OperationQuota {
            kind: ActionKind::Steal,
            count_today: 999,
            count_limit: 0,
            exp_count_today: 999,
            exp_count_limit: -1,
        };
        assert!(!quota.count_exhausted());
        assert!(!quota.exp_exhausted());
    }

    #[test]
    fn quota_exhaustion_at_limit() {
        let quota = OperationQuota {
            kind: ActionKind::HelpWater,
            count_today: 10,
            count_limit: 10,
            exp_count_today: 3,
            exp_count_limit: 5,
        };
        assert!(quota.count_exhausted());
        assert!(!quota.exp_exhausted());
    }

    #[test]
    fn empty_land_has_no_phase() {
        let land = LandSnapshot::empty(LandId::new(1));
        assert!(land.phase.is_none());
        assert!(!land.stealable);
        assert!(land.weed_markers.is_empty());
    }

    #[test]
    fn target_starts_unvisited() {
        let target = Target::new(UserId::new(5), String::from("Mei"), true);
        assert!(!target.visited_this_pass);
        assert!(target.has_preview_signal);
    }

    #[test]
    fn farm_view_serde_roundtrip() {
        let view = FarmView {
            owner: UserId::new(8),
            lands: vec![LandSnapshot::empty(LandId::new(1))],
            quota_reports: vec![QuotaReport {
                action_type_id: 4,
                count_today: 2,
                count_limit: 30,
                exp_count_today: 0,
                exp_count_limit: 0,
            }],
        };
        let json = serde_json::to_string(&view).unwrap();
        let back: FarmView = serde_json::from_str(&json).unwrap();
        assert_eq!(back, view);
    }
}
