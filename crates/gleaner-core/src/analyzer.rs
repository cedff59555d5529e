//! Land classification into disjoint action buckets.
//!
//! On entering a farm the engine receives one [`LandSnapshot`] per plot
//! and sorts each into at most a handful of buckets. The buckets drive
//! the per-visit execution order; they are ephemeral and discarded when
//! the visit ends.
//!
//! Classification rules:
//!
//! - A plot without active crop data yields nothing.
//! - A `Dead` plot yields nothing, even if dry or weeded.
//! - A `Mature` plot yields exactly `stealable` when the flag is set,
//!   and nothing otherwise (someone already harvested it).
//! - A `Growing` plot needs water iff dryness is nonzero, and needs
//!   weeding/spraying iff the corresponding marker set is non-empty --
//!   regardless of who placed the markers, since removing them helps
//!   the owner either way.
//!
//! Mischief eligibility enforces the server's global 2-marker-per-land
//! capacity and per-actor idempotence: a `Growing` plot is eligible iff
//! its marker set has fewer than 2 entries and does not already contain
//! our own id.

use gleaner_types::{LandId, LandSnapshot, LifecyclePhase, UserId};

/// Maximum concurrent mischief markers of one type per land.
const MARKER_CAPACITY: usize = 2;

/// Disjoint per-visit action buckets derived from the land snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionBuckets {
    /// Mature plots with a stealable share left.
    pub stealable: Vec<LandId>,
    /// Growing plots with nonzero dryness.
    pub needs_water: Vec<LandId>,
    /// Growing plots carrying at least one weed marker.
    pub needs_weed: Vec<LandId>,
    /// Growing plots carrying at least one insect marker.
    pub needs_insecticide: Vec<LandId>,
    /// Growing plots we may still place a weed marker on.
    pub weed_mischief: Vec<LandId>,
    /// Growing plots we may still place an insect marker on.
    pub insect_mischief: Vec<LandId>,
}

impl ActionBuckets {
    /// Whether every bucket is empty (nothing to do on this farm).
    pub fn is_empty(&self) -> bool {
        self.stealable.is_empty()
            && self.needs_water.is_empty()
            && self.needs_weed.is_empty()
            && self.needs_insecticide.is_empty()
            && self.weed_mischief.is_empty()
            && self.insect_mischief.is_empty()
    }
}

/// Whether we may still place a marker in the given set: below the
/// global capacity and not already marked by us.
fn mischief_eligible(markers: &std::collections::BTreeSet<UserId>, self_id: UserId) -> bool {
    markers.len() < MARKER_CAPACITY && !markers.contains(&self_id)
}

/// Classify a farm's land snapshots into disjoint action buckets.
///
/// `self_id` is our own user id, needed for mischief idempotence.
pub fn classify(lands: &[LandSnapshot], self_id: UserId) -> ActionBuckets {
    let mut buckets = ActionBuckets::default();

    for land in lands {
        let Some(phase) = land.phase else {
            continue;
        };

        match phase {
            LifecyclePhase::Dead => {}
            LifecyclePhase::Mature => {
                if land.stealable {
                    buckets.stealable.push(land.id);
                }
            }
            LifecyclePhase::Growing => {
                if land.dryness > 0 {
                    buckets.needs_water.push(land.id);
                }
                if !land.weed_markers.is_empty() {
                    buckets.needs_weed.push(land.id);
                }
                if !land.insect_markers.is_empty() {
                    buckets.needs_insecticide.push(land.id);
                }
                if mischief_eligible(&land.weed_markers, self_id) {
                    buckets.weed_mischief.push(land.id);
                }
                if mischief_eligible(&land.insect_markers, self_id) {
                    buckets.insect_mischief.push(land.id);
                }
            }
        }
    }

    buckets
}
