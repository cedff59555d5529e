//! Scheduling and quota engine for the Gleaner farm helper.
//!
//! This crate owns the pass cycle that drives the helper: quota
//! tracking with day-rollover reset, two-tier target prioritization,
//! per-land classification into action buckets, batch execution with
//! per-item fallback, and the self-rescheduling pass loop.
//!
//! Everything remote is reached through the [`FarmClient`] trait; wire
//! encoding, transport, and session management are external
//! collaborators. The [`ScriptedFarm`] implementation exercises the
//! whole cycle deterministically for tests and offline runs.
//!
//! # Modules
//!
//! - [`analyzer`] -- Land snapshot classification into action buckets.
//! - [`batch`] -- Batch execution with isolated per-item fallback.
//! - [`client`] -- The abstracted remote-call surface.
//! - [`config`] -- Configuration loading from `gleaner-config.yaml`.
//! - [`pass`] -- One full scheduling pass over the target list.
//! - [`quiet`] -- Quiet-hours gate.
//! - [`quota`] -- Daily quota tracking with day-rollover reset.
//! - [`runner`] -- The self-rescheduling pass loop.
//! - [`scheduler`] -- Two-tier target prioritization.
//! - [`scripted`] -- Deterministic in-memory farm for tests/offline.
//! - [`visit`] -- Per-target visit state machine and manual actions.
//!
//! [`FarmClient`]: client::FarmClient
//! [`ScriptedFarm`]: scripted::ScriptedFarm

pub mod analyzer;
pub mod batch;
pub mod client;
pub mod config;
pub mod pass;
pub mod quiet;
pub mod quota;
pub mod runner;
pub mod scheduler;
pub mod scripted;
pub mod visit;
