//! Demo farm harness for offline runs.
//!
//! Without a live game server the binary drives the pass loop against a
//! scripted in-memory farm. The harness seeds N friends, each with a
//! deterministic mix of plot states, so every action family gets
//! exercised: dry plots to water, marked plots to clean up, mature
//! plots to steal from, clean plots open for mischief, and the odd dead
//! plot that must yield nothing.

use std::collections::BTreeSet;

use serde::Deserialize;
use tracing::info;

use gleaner_core::scripted::ScriptedFarm;
use gleaner_types::{
    ActionKind, FarmView, LandId, LandSnapshot, LifecyclePhase, QuotaReport, Target, UserId,
};

use crate::error::EngineError;

// -----------------------------------------------------------------------
// Configuration
// -----------------------------------------------------------------------

/// Configuration for the demo harness, loaded from the `demo` section
/// of `gleaner-config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HarnessConfig {
    /// Number of demo friends to seed.
    #[serde(default = "default_friend_count")]
    pub friend_count: u32,

    /// Plots per demo farm.
    #[serde(default = "default_lands_per_farm")]
    pub lands_per_farm: u32,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            friend_count: default_friend_count(),
            lands_per_farm: default_lands_per_farm(),
        }
    }
}

const fn default_friend_count() -> u32 {
    6
}

const fn default_lands_per_farm() -> u32 {
    8
}

// -----------------------------------------------------------------------
// Name pool
// -----------------------------------------------------------------------

/// Built-in pool of friend names. Friends are named in order, so the
/// pool size caps the seedable friend count.
const NAME_POOL: &[&str] = &[
    "Mei", "Lin", "Wen", "Hua", "Jun", "Tao", "Yun", "Lan", "Bo", "Ning",
    "Qing", "Rui", "Shan", "Ting", "Xia", "Yan", "Zhi", "Kai", "Feng", "Hong",
    "An", "Chen", "Dai", "Fang", "Gang", "Hui", "Jia", "Ke", "Li", "Min",
];

/// Friend ids are offset from our own id so markers placed by friends
/// are never mistaken for our own.
const FRIEND_ID_OFFSET: u64 = 1000;

// -----------------------------------------------------------------------
// Demo world construction
// -----------------------------------------------------------------------

/// Build a scripted farm seeded with demo friends.
///
/// Every third friend lacks the preview signal, so the two-tier
/// scheduling is visible in demo runs. Plot states cycle through a
/// fixed pattern per index; markers on plots are attributed to a fellow
/// friend, never to us.
///
/// # Errors
///
/// Returns [`EngineError::Harness`] if the requested friend count
/// exceeds the name pool.
pub fn build_demo_farm(config: &HarnessConfig, self_id: UserId) -> Result<ScriptedFarm, EngineError> {
    let pool_len = u32::try_from(NAME_POOL.len()).unwrap_or(u32::MAX);
    if config.friend_count > pool_len {
        return Err(EngineError::Harness {
            message: format!(
                "requested {} friends but name pool only has {pool_len} entries",
                config.friend_count
            ),
        });
    }

    let farm = ScriptedFarm::new();

    for index in 0..config.friend_count {
        let id = friend_id(self_id, index);
        let name = NAME_POOL
            .get(index as usize)
            .copied()
            .unwrap_or("Friend")
            .to_owned();
        let priority = index.checked_rem(3) != Some(2);
        let neighbor = friend_id(
            self_id,
            index.checked_add(1).unwrap_or(0).checked_rem(config.friend_count).unwrap_or(0),
        );

        let lands = (0..config.lands_per_farm)
            .map(|plot| demo_land(index, plot, neighbor))
            .collect();

        info!(friend = %id, name = %name, priority, "Seeded demo friend");
        farm.add_target(
            Target::new(id, name, priority),
            FarmView {
                owner: id,
                lands,
                quota_reports: demo_quota_reports(),
            },
        );
    }

    Ok(farm)
}

/// The id of the demo friend at `index`.
fn friend_id(self_id: UserId, index: u32) -> UserId {
    UserId::new(
        self_id
            .into_inner()
            .saturating_add(FRIEND_ID_OFFSET)
            .saturating_add(u64::from(index)),
    )
}

/// One demo plot. The state cycles with the plot index so every farm
/// covers the full range of classifications.
fn demo_land(farm_index: u32, plot: u32, neighbor: UserId) -> LandSnapshot {
    let id = LandId::new(
        u64::from(farm_index)
            .saturating_mul(100)
            .saturating_add(u64::from(plot)),
    );
    let mut land = LandSnapshot {
        id,
        phase: Some(LifecyclePhase::Growing),
        stealable: false,
        dryness: 0,
        weed_markers: BTreeSet::new(),
        insect_markers: BTreeSet::new(),
    };

    match plot.checked_rem(6) {
        Some(0) => {
            land.dryness = plot.checked_rem(3).unwrap_or(0).saturating_add(1);
        }
        Some(1) => {
            land.weed_markers.insert(neighbor);
        }
        Some(2) => {
            land.insect_markers.insert(neighbor);
        }
        Some(3) => {
            land.phase = Some(LifecyclePhase::Mature);
            land.stealable = true;
        }
        Some(5) => {
            land.phase = Some(LifecyclePhase::Dead);
        }
        // Plot 4 of each cycle stays clean: mischief-eligible.
        _ => {}
    }

    land
}

/// Quota tuples carried on every demo enter reply. Limits are generous
/// so a short demo run never stalls on exhaustion.
fn demo_quota_reports() -> Vec<QuotaReport> {
    demo_quota_table()
        .iter()
        .map(|&(kind, limit, exp_limit)| QuotaReport {
            action_type_id: kind.wire_id(),
            count_today: 0,
            count_limit: limit,
            exp_count_today: 0,
            exp_count_limit: exp_limit,
        })
        .collect()
}

/// Per-kind daily limits for the demo server: `(kind, limit, exp_limit)`.
const fn demo_quota_table() -> &'static [(ActionKind, i32, i32)] {
    &[
        (ActionKind::HelpWeed, 100, 30),
        (ActionKind::HelpInsect, 100, 30),
        (ActionKind::HelpWater, 100, 30),
        (ActionKind::Steal, 50, 0),
        (ActionKind::PutWeed, 20, 0),
        (ActionKind::PutInsect, 20, 0),
    ]
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gleaner_core::analyzer;
    use gleaner_core::client::FarmClient;

    use super::*;

    const SELF: UserId = UserId::new(7);

    #[tokio::test]
    async fn seeds_requested_friend_count() {
        let config = HarnessConfig {
            friend_count: 5,
            ..HarnessConfig::default()
        };
        let farm = build_demo_farm(&config, SELF).unwrap();
        let targets = farm.fetch_targets().await.unwrap();
        assert_eq!(targets.len(), 5);
    }

    #[tokio::test]
    async fn friend_ids_and_names_are_unique() {
        let config = HarnessConfig {
            friend_count: 12,
            ..HarnessConfig::default()
        };
        let farm = build_demo_farm(&config, SELF).unwrap();
        let targets = farm.fetch_targets().await.unwrap();

        let ids: BTreeSet<UserId> = targets.iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), 12);
        let names: BTreeSet<&String> = targets.iter().map(|t| &t.display_name).collect();
        assert_eq!(names.len(), 12);
        assert!(!ids.contains(&SELF));
    }

    #[tokio::test]
    async fn mixes_priority_tiers() {
        let config = HarnessConfig {
            friend_count: 6,
            ..HarnessConfig::default()
        };
        let farm = build_demo_farm(&config, SELF).unwrap();
        let targets = farm.fetch_targets().await.unwrap();

        assert!(targets.iter().any(|t| t.has_preview_signal));
        assert!(targets.iter().any(|t| !t.has_preview_signal));
    }

    #[tokio::test]
    async fn demo_farm_covers_every_bucket() {
        let config = HarnessConfig {
            friend_count: 1,
            lands_per_farm: 8,
        };
        let farm = build_demo_farm(&config, SELF).unwrap();
        let target = farm.fetch_targets().await.unwrap().into_iter().next().unwrap();
        let view = farm.enter_farm(target.id).await.unwrap();

        let buckets = analyzer::classify(&view.lands, SELF);
        assert!(!buckets.needs_water.is_empty());
        assert!(!buckets.needs_weed.is_empty());
        assert!(!buckets.needs_insecticide.is_empty());
        assert!(!buckets.stealable.is_empty());
        assert!(!buckets.weed_mischief.is_empty());
        assert!(!buckets.insect_mischief.is_empty());
    }

    #[tokio::test]
    async fn enter_reply_carries_quota_tuples() {
        let farm = build_demo_farm(&HarnessConfig::default(), SELF).unwrap();
        let target = farm.fetch_targets().await.unwrap().into_iter().next().unwrap();
        let view = farm.enter_farm(target.id).await.unwrap();
        assert_eq!(view.quota_reports.len(), 6);
    }

    #[test]
    fn zero_friends_yields_empty_world() {
        let config = HarnessConfig {
            friend_count: 0,
            ..HarnessConfig::default()
        };
        assert!(build_demo_farm(&config, SELF).is_ok());
    }

    #[test]
    fn too_many_friends_is_an_error() {
        let config = HarnessConfig {
            friend_count: 100,
            ..HarnessConfig::default()
        };
        assert!(build_demo_farm(&config, SELF).is_err());
    }
}
