//! Shared type definitions for the Gleaner farm helper.
//!
//! This crate is the single source of truth for the data model shared
//! between the scheduling engine and its collaborators: identifiers,
//! action enumerations, and the snapshot/report structs that cross the
//! remote-call boundary.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe wrappers for server-assigned numeric identifiers
//! - [`enums`] -- Action kinds, land lifecycle phases, precheck verdicts
//! - [`structs`] -- Quota records, targets, land snapshots, farm views

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{ActionKind, HELP_KINDS, LifecyclePhase, MISCHIEF_KINDS, PrecheckVerdict};
pub use ids::{LandId, UserId};
pub use structs::{
    FarmView, LandSnapshot, OperationQuota, QuotaReport, QuotaSnapshotEntry, Target,
};
