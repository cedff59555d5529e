//! Self-rescheduling pass loop with operator controls.
//!
//! [`PassLoop`] owns the quota tracker and the farm client and drives
//! [`run_pass`] in one of two modes:
//!
//! - **Self-scheduling** ([`run`]): after each completed pass the loop
//!   sleeps a fixed interval measured from pass *completion* (not
//!   fixed-rate from pass start), so a slow pass naturally delays the
//!   next one and total call volume stays bounded.
//! - **Externally driven** ([`run_once`]): an outside scheduler invokes
//!   the pass function directly and no self-rescheduling happens.
//!
//! A pass is skipped outright while the helper is disabled, while quiet
//! hours are active, or while another pass is still running
//! (single-flight). The stop signal is checked at pass and target
//! boundaries only; an in-flight remote call always completes before
//! the stop takes effect.
//!
//! [`run`]: PassLoop::run
//! [`run_once`]: PassLoop::run_once
//! [`run_pass`]: crate::pass::run_pass

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info};

use gleaner_types::{QuotaSnapshotEntry, UserId};

use crate::client::FarmClient;
use crate::config::{Features, GleanerConfig, Pacing};
use crate::pass::{PassOutcome, run_pass};
use crate::quiet::QuietHours;
use crate::quota::QuotaTracker;
use crate::visit::{ManualAction, ManualOutcome, perform_action};

/// Cloneable stop signal shared between the loop and its operator.
///
/// Setting the flag is sticky; the loop observes it at pass and target
/// boundaries and winds down after in-flight work completes.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    /// A fresh, unset stop signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the loop to stop at the next boundary.
    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Why a pass invocation did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The helper is globally disabled.
    Disabled,
    /// The current time falls inside quiet hours.
    QuietHours,
    /// A pass is already in flight (single-flight guard).
    AlreadyRunning,
}

/// Result of one pass invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassRun {
    /// The pass ran; here is its outcome.
    Completed(PassOutcome),
    /// The pass was skipped without performing any call.
    Skipped(SkipReason),
}

/// The scheduling driver: owns the tracker, the client, and the
/// config-derived gates.
///
/// The quota store is the only state shared across passes; it is
/// mutated exclusively from this loop's single sequential flow, so no
/// locking is needed. Anyone wiring concurrent triggers around this
/// type must serialize access themselves.
#[derive(Debug)]
pub struct PassLoop<C> {
    client: C,
    tracker: QuotaTracker,
    self_id: UserId,
    features: Features,
    pacing: Pacing,
    quiet: QuietHours,
    enabled: bool,
    running: bool,
    stop: StopHandle,
}

impl<C: FarmClient> PassLoop<C> {
    /// Build the loop from configuration.
    ///
    /// `today` anchors the quota tracker's reset date; production
    /// callers pass the current local date.
    pub fn new(client: C, config: &GleanerConfig, today: chrono::NaiveDate) -> Self {
        Self {
            client,
            tracker: QuotaTracker::new(today),
            self_id: UserId::new(config.helper.self_id),
            features: Features::from_config(&config.features),
            pacing: Pacing::from_config(&config.helper),
            quiet: QuietHours::from_config(&config.quiet_hours),
            enabled: config.helper.enabled,
            running: false,
            stop: StopHandle::new(),
        }
    }

    /// A stop signal for this loop, cloneable across tasks.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run a single pass now, using the local wall clock for the quiet
    /// gate and the day rollover. This is the externally-driven entry
    /// point: no rescheduling happens here.
    pub async fn run_once(&mut self) -> PassRun {
        self.run_once_at(Local::now().naive_local()).await
    }

    /// [`run_once`] with an explicit clock, for tests.
    ///
    /// [`run_once`]: PassLoop::run_once
    pub async fn run_once_at(&mut self, now: NaiveDateTime) -> PassRun {
        if !self.enabled {
            debug!("Helper disabled; pass skipped");
            return PassRun::Skipped(SkipReason::Disabled);
        }
        if self.quiet.is_quiet(now.time()) {
            debug!("Quiet hours active; pass skipped");
            return PassRun::Skipped(SkipReason::QuietHours);
        }
        if self.running {
            debug!("Pass already in flight; invocation skipped");
            return PassRun::Skipped(SkipReason::AlreadyRunning);
        }

        self.running = true;
        let outcome = run_pass(
            &self.client,
            &mut self.tracker,
            self.self_id,
            self.features,
            &self.pacing,
            now.date(),
            &self.stop,
        )
        .await;
        self.running = false;
        PassRun::Completed(outcome)
    }

    /// Self-scheduling driver: run passes until stopped, sleeping the
    /// configured interval after each completion.
    pub async fn run(&mut self) {
        info!(
            interval_secs = self.pacing.pass_interval.as_secs(),
            enabled = self.enabled,
            "Pass loop starting"
        );
        loop {
            if self.stop.is_stop_requested() {
                break;
            }
            let _ = self.run_once().await;
            if self.stop.is_stop_requested() {
                break;
            }
            tokio::time::sleep(self.pacing.pass_interval).await;
        }
        info!("Pass loop stopped");
    }

    /// Run one action family against a single target right now,
    /// outside the periodic schedule, with the same precheck and
    /// fallback rules as a pass visit.
    pub async fn perform_action(&mut self, target: UserId, action: ManualAction) -> ManualOutcome {
        perform_action(
            &self.client,
            &mut self.tracker,
            target,
            action,
            self.self_id,
            &self.pacing,
        )
        .await
    }

    /// Current quota snapshot per action kind, for external display.
    pub fn quota_snapshot(&self) -> Vec<QuotaSnapshotEntry> {
        self.tracker.snapshot()
    }

    /// Force the single-flight guard, simulating an in-flight pass.
    #[cfg(test)]
    const fn force_running(&mut self, running: bool) {
        self.running = running;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;
    use std::time::Duration;

    use chrono::{NaiveDate, NaiveTime};
    use gleaner_types::{
        ActionKind, FarmView, LandId, LandSnapshot, LifecyclePhase, QuotaReport, Target,
    };

    use super::*;
    use crate::scripted::{CallRecord, ScriptedFarm};

    fn make_config() -> GleanerConfig {
        let mut config = GleanerConfig::default();
        config.helper.self_id = 1;
        config.helper.call_pause_ms = 1;
        config.features.mischief_enabled = true;
        config
    }

    fn noon(ordinal: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, ordinal)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap())
    }

    fn make_farm_with_dry_land() -> ScriptedFarm {
        let farm = ScriptedFarm::new();
        let owner = UserId::new(2);
        farm.add_target(
            Target::new(owner, String::from("Lin"), true),
            FarmView {
                owner,
                lands: vec![LandSnapshot {
                    id: LandId::new(7),
                    phase: Some(LifecyclePhase::Growing),
                    stealable: false,
                    dryness: 1,
                    weed_markers: BTreeSet::new(),
                    insect_markers: BTreeSet::new(),
                }],
                quota_reports: vec![QuotaReport {
                    action_type_id: ActionKind::HelpWater.wire_id(),
                    count_today: 0,
                    count_limit: 50,
                    exp_count_today: 0,
                    exp_count_limit: 20,
                }],
            },
        );
        farm
    }

    #[tokio::test]
    async fn completed_pass_updates_quota_snapshot() {
        let mut pass_loop =
            PassLoop::new(make_farm_with_dry_land(), &make_config(), noon(1).date());

        let run = pass_loop.run_once_at(noon(1)).await;
        let PassRun::Completed(outcome) = run else {
            panic!("expected a completed pass");
        };
        assert_eq!(outcome.tally.get(ActionKind::HelpWater), 1);

        let snapshot = pass_loop.quota_snapshot();
        let water = snapshot
            .iter()
            .find(|entry| entry.kind == ActionKind::HelpWater)
            .unwrap();
        assert_eq!(water.count_today, 1);
        assert_eq!(water.remaining, 49);
    }

    #[tokio::test]
    async fn disabled_helper_skips_pass() {
        let mut config = make_config();
        config.helper.enabled = false;
        let mut pass_loop = PassLoop::new(ScriptedFarm::new(), &config, noon(1).date());

        let run = pass_loop.run_once_at(noon(1)).await;
        assert_eq!(run, PassRun::Skipped(SkipReason::Disabled));
    }

    #[tokio::test]
    async fn quiet_hours_skip_pass() {
        let mut config = make_config();
        config.quiet_hours.enabled = true;
        config.quiet_hours.start = String::from("22:00");
        config.quiet_hours.end = String::from("06:00");
        let farm = make_farm_with_dry_land();
        let mut pass_loop = PassLoop::new(farm, &config, noon(1).date());

        let late = noon(1).date().and_time(NaiveTime::from_hms_opt(23, 30, 0).unwrap());
        assert_eq!(
            pass_loop.run_once_at(late).await,
            PassRun::Skipped(SkipReason::QuietHours)
        );
        // Midday is outside the window: the pass runs.
        assert!(matches!(
            pass_loop.run_once_at(noon(1)).await,
            PassRun::Completed(_)
        ));
    }

    #[tokio::test]
    async fn single_flight_guard_skips_overlap() {
        let mut pass_loop =
            PassLoop::new(make_farm_with_dry_land(), &make_config(), noon(1).date());
        pass_loop.force_running(true);

        let run = pass_loop.run_once_at(noon(1)).await;
        assert_eq!(run, PassRun::Skipped(SkipReason::AlreadyRunning));

        pass_loop.force_running(false);
        assert!(matches!(
            pass_loop.run_once_at(noon(1)).await,
            PassRun::Completed(_)
        ));
    }

    #[tokio::test]
    async fn day_rollover_between_passes_resets_store() {
        // A non-priority target is only worth scheduling while mischief
        // quota remains. The enter reply reports it as spent, so the
        // second same-day pass drops the target; the next day's reset
        // forgets the spent counters and schedules it again.
        let farm = ScriptedFarm::new();
        let owner = UserId::new(3);
        let spent = |kind: ActionKind| QuotaReport {
            action_type_id: kind.wire_id(),
            count_today: 10,
            count_limit: 10,
            exp_count_today: 0,
            exp_count_limit: 0,
        };
        farm.add_target(
            Target::new(owner, String::from("Mei"), false),
            FarmView {
                owner,
                lands: Vec::new(),
                quota_reports: vec![spent(ActionKind::PutWeed), spent(ActionKind::PutInsect)],
            },
        );
        let mut pass_loop = PassLoop::new(farm, &make_config(), noon(1).date());

        let PassRun::Completed(first) = pass_loop.run_once_at(noon(1)).await else {
            panic!("expected a completed pass");
        };
        assert_eq!(first.targets_visited, 1);

        let PassRun::Completed(second) = pass_loop.run_once_at(noon(1)).await else {
            panic!("expected a completed pass");
        };
        assert_eq!(second.targets_visited, 0);

        let PassRun::Completed(third) = pass_loop.run_once_at(noon(2)).await else {
            panic!("expected a completed pass");
        };
        assert_eq!(third.targets_visited, 1);
    }

    #[tokio::test]
    async fn stop_handle_is_shared() {
        let pass_loop = PassLoop::new(ScriptedFarm::new(), &make_config(), noon(1).date());
        let handle = pass_loop.stop_handle();
        assert!(!handle.is_stop_requested());
        handle.request_stop();
        assert!(pass_loop.stop.is_stop_requested());
    }

    #[tokio::test]
    async fn manual_action_through_loop() {
        let mut pass_loop =
            PassLoop::new(make_farm_with_dry_land(), &make_config(), noon(1).date());

        let outcome = pass_loop
            .perform_action(UserId::new(2), ManualAction::Water)
            .await;
        assert!(outcome.ok);
        assert_eq!(outcome.count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_is_measured_from_pass_completion() {
        let farm = ScriptedFarm::new();
        let owner = UserId::new(2);
        let dry = |id: u64| LandSnapshot {
            id: LandId::new(id),
            phase: Some(LifecyclePhase::Growing),
            stealable: false,
            dryness: 1,
            weed_markers: BTreeSet::new(),
            insect_markers: BTreeSet::new(),
        };
        farm.add_target(
            Target::new(owner, String::from("Lin"), true),
            FarmView {
                owner,
                lands: vec![dry(7), dry(8)],
                quota_reports: vec![QuotaReport {
                    action_type_id: ActionKind::HelpWater.wire_id(),
                    count_today: 0,
                    count_limit: 50,
                    exp_count_today: 0,
                    exp_count_limit: 20,
                }],
            },
        );
        // Force the per-item fallback: two lands at 30s of pause each
        // stretch the pass to 60s of virtual time.
        farm.fail_batch_for(ActionKind::HelpWater);

        let mut config = make_config();
        config.helper.call_pause_ms = 30_000;
        config.helper.pass_interval_secs = 100;

        let mut pass_loop = PassLoop::new(farm, &config, Local::now().date_naive());
        let stop = pass_loop.stop_handle();
        let started = tokio::time::Instant::now();
        let worker = tokio::spawn(async move {
            pass_loop.run().await;
            pass_loop
        });

        // The first pass ends at t=60 and the next starts at t=160
        // (interval counted from completion). A fixed-rate schedule
        // would already be mid-second-pass by t=130.
        tokio::time::sleep(Duration::from_secs(130)).await;
        stop.request_stop();
        let pass_loop = worker.await.unwrap();

        let fetches = pass_loop
            .client
            .calls()
            .iter()
            .filter(|call| matches!(call, CallRecord::FetchTargets))
            .count();
        assert_eq!(fetches, 1);
        // The loop wakes from its interval sleep at t=160 and exits.
        assert_eq!(started.elapsed(), Duration::from_secs(160));
    }

    #[tokio::test]
    async fn stopped_loop_exits_promptly() {
        let mut pass_loop =
            PassLoop::new(make_farm_with_dry_land(), &make_config(), noon(1).date());
        pass_loop.stop_handle().request_stop();
        // Returns without sleeping the inter-pass interval.
        pass_loop.run().await;
    }
}
