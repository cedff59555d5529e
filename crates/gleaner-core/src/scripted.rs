//! Deterministic in-memory [`FarmClient`] for tests and offline runs.
//!
//! [`ScriptedFarm`] plays the role the stub decision source plays for a
//! simulation engine: it lets the whole pass cycle be exercised
//! end-to-end without a wire transport. Failure injection is explicit
//! and per-surface (enter, precheck, batch, individual lands), and
//! every call is recorded so tests can assert on call shapes -- e.g.
//! that a batch call was attempted exactly once before falling back.
//!
//! Quota counters are seeded from the quota reports carried on each
//! added farm view, advance on successful executes, and are reported
//! back on both enter and execute replies, mimicking the server's
//! piggybacked quota tuples. The two reply surfaces always agree:
//! the stored view only decides *which* kinds a farm reports, while
//! the live counters supply the values.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use gleaner_types::{
    ActionKind, FarmView, LandId, PrecheckVerdict, QuotaReport, Target, UserId,
};

use crate::client::{CallReply, FarmClient, RpcError};

/// A record of one call made against the scripted farm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallRecord {
    /// `fetch_targets` was called.
    FetchTargets,
    /// `enter_farm` was called for the given target.
    Enter(UserId),
    /// `leave_farm` was called for the given target.
    Leave(UserId),
    /// `precheck` was called for the given kind and target.
    Precheck(ActionKind, UserId),
    /// `execute` was called with the given kind, target, and land ids.
    Execute(ActionKind, UserId, Vec<LandId>),
}

/// Per-kind quota counters maintained by the scripted server.
#[derive(Debug, Clone, Copy, Default)]
struct Counters {
    count_today: u32,
    count_limit: i32,
    exp_count_today: u32,
    exp_count_limit: i32,
}

/// Mutable scripted state behind the client's `&self` surface.
#[derive(Debug, Default)]
struct Inner {
    targets: Vec<Target>,
    farms: BTreeMap<UserId, FarmView>,
    quotas: BTreeMap<ActionKind, Counters>,
    fail_fetch: bool,
    fail_enter: BTreeSet<UserId>,
    fail_leave: BTreeSet<UserId>,
    fail_precheck: BTreeSet<ActionKind>,
    deny_precheck: BTreeSet<ActionKind>,
    fail_batch: BTreeSet<ActionKind>,
    fail_lands: BTreeSet<LandId>,
    calls: Vec<CallRecord>,
}

/// Deterministic in-memory farm server.
///
/// Interior mutability lets the `&self` trait surface advance quota
/// counters and record calls; the engine's flow is strictly sequential
/// so the mutex is uncontended.
#[derive(Debug, Default)]
pub struct ScriptedFarm {
    inner: Mutex<Inner>,
}

impl ScriptedFarm {
    /// An empty scripted farm with no targets.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a visitable target together with its farm view.
    ///
    /// The view's quota reports seed the server counters, so enter and
    /// execute replies report the same numbers from the start.
    pub fn add_target(&self, target: Target, view: FarmView) {
        let mut inner = self.lock();
        for report in &view.quota_reports {
            if let Some(kind) = ActionKind::from_wire(report.action_type_id) {
                inner.quotas.insert(
                    kind,
                    Counters {
                        count_today: report.count_today,
                        count_limit: report.count_limit,
                        exp_count_today: report.exp_count_today,
                        exp_count_limit: report.exp_count_limit,
                    },
                );
            }
        }
        inner.farms.insert(target.id, view);
        inner.targets.push(target);
    }

    /// Seed the scripted server's quota counters for one kind.
    pub fn set_quota(
        &self,
        kind: ActionKind,
        count_today: u32,
        count_limit: i32,
        exp_count_today: u32,
        exp_count_limit: i32,
    ) {
        self.lock().quotas.insert(
            kind,
            Counters {
                count_today,
                count_limit,
                exp_count_today,
                exp_count_limit,
            },
        );
    }

    /// Make `fetch_targets` fail with a transport error.
    pub fn fail_fetch_targets(&self) {
        self.lock().fail_fetch = true;
    }

    /// Make `enter_farm` fail for the given target.
    pub fn fail_enter_for(&self, target: UserId) {
        self.lock().fail_enter.insert(target);
    }

    /// Make `leave_farm` fail for the given target.
    pub fn fail_leave_for(&self, target: UserId) {
        self.lock().fail_leave.insert(target);
    }

    /// Make `precheck` fail (transport error) for the given kind.
    pub fn fail_precheck_for(&self, kind: ActionKind) {
        self.lock().fail_precheck.insert(kind);
    }

    /// Make `precheck` report the given kind as disallowed.
    pub fn deny_precheck_for(&self, kind: ActionKind) {
        self.lock().deny_precheck.insert(kind);
    }

    /// Make multi-item `execute` calls fail for the given kind,
    /// forcing the per-item fallback path.
    pub fn fail_batch_for(&self, kind: ActionKind) {
        self.lock().fail_batch.insert(kind);
    }

    /// Make single-item `execute` calls fail for the given land.
    pub fn fail_land(&self, land: LandId) {
        self.lock().fail_lands.insert(land);
    }

    /// All calls recorded so far, in order.
    pub fn calls(&self) -> Vec<CallRecord> {
        self.lock().calls.clone()
    }

    /// The execute calls recorded for one action kind, in order.
    pub fn execute_calls_for(&self, kind: ActionKind) -> Vec<Vec<LandId>> {
        self.lock()
            .calls
            .iter()
            .filter_map(|record| match record {
                CallRecord::Execute(k, _, lands) if *k == kind => Some(lands.clone()),
                _ => None,
            })
            .collect()
    }

    /// Build the quota report for one kind from the current counters.
    fn report_for(inner: &Inner, kind: ActionKind) -> QuotaReport {
        let counters = inner.quotas.get(&kind).copied().unwrap_or_default();
        QuotaReport {
            action_type_id: kind.wire_id(),
            count_today: counters.count_today,
            count_limit: counters.count_limit,
            exp_count_today: counters.exp_count_today,
            exp_count_limit: counters.exp_count_limit,
        }
    }
}

#[async_trait]
impl FarmClient for ScriptedFarm {
    async fn fetch_targets(&self) -> Result<Vec<Target>, RpcError> {
        let mut inner = self.lock();
        inner.calls.push(CallRecord::FetchTargets);
        if inner.fail_fetch {
            return Err(RpcError::Transport {
                message: String::from("scripted fetch failure"),
            });
        }
        Ok(inner.targets.clone())
    }

    async fn enter_farm(&self, target: UserId) -> Result<FarmView, RpcError> {
        let mut inner = self.lock();
        inner.calls.push(CallRecord::Enter(target));
        if inner.fail_enter.contains(&target) {
            return Err(RpcError::Transport {
                message: format!("scripted enter failure for {target}"),
            });
        }
        let mut view = inner
            .farms
            .get(&target)
            .cloned()
            .ok_or_else(|| RpcError::Rejected {
                code: 404,
                message: format!("no farm scripted for {target}"),
            })?;
        // The stored view picks the reported kinds; the live counters
        // supply the current numbers, as on a real server.
        view.quota_reports = view
            .quota_reports
            .iter()
            .map(|report| {
                ActionKind::from_wire(report.action_type_id)
                    .map_or(*report, |kind| Self::report_for(&inner, kind))
            })
            .collect();
        Ok(view)
    }

    async fn leave_farm(&self, target: UserId) -> Result<(), RpcError> {
        let mut inner = self.lock();
        inner.calls.push(CallRecord::Leave(target));
        if inner.fail_leave.contains(&target) {
            return Err(RpcError::Transport {
                message: format!("scripted leave failure for {target}"),
            });
        }
        Ok(())
    }

    async fn precheck(
        &self,
        kind: ActionKind,
        target: UserId,
    ) -> Result<PrecheckVerdict, RpcError> {
        let mut inner = self.lock();
        inner.calls.push(CallRecord::Precheck(kind, target));
        if inner.fail_precheck.contains(&kind) {
            return Err(RpcError::Transport {
                message: format!("scripted precheck failure for {kind}"),
            });
        }
        if inner.deny_precheck.contains(&kind) {
            return Ok(PrecheckVerdict::Denied);
        }
        Ok(PrecheckVerdict::Allowed)
    }

    async fn execute(
        &self,
        kind: ActionKind,
        target: UserId,
        lands: &[LandId],
    ) -> Result<CallReply, RpcError> {
        let mut inner = self.lock();
        inner
            .calls
            .push(CallRecord::Execute(kind, target, lands.to_vec()));

        if lands.len() > 1 && inner.fail_batch.contains(&kind) {
            return Err(RpcError::Transport {
                message: format!("scripted batch failure for {kind}"),
            });
        }
        if let Some(failing) = lands.iter().find(|land| inner.fail_lands.contains(land)) {
            return Err(RpcError::Transport {
                message: format!("scripted land failure for {failing}"),
            });
        }

        let applied = u32::try_from(lands.len()).unwrap_or(u32::MAX);
        let counters = inner.quotas.entry(kind).or_default();
        counters.count_today = counters.count_today.saturating_add(applied);
        if kind.is_help() {
            counters.exp_count_today = counters.exp_count_today.saturating_add(applied);
        }

        let report = Self::report_for(&inner, kind);
        Ok(CallReply {
            ok: true,
            message: String::new(),
            quota_reports: vec![report],
        })
    }
}
