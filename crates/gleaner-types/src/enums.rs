//! Enumeration types shared across the Gleaner workspace.
//!
//! [`ActionKind`] is the central vocabulary of the engine: every quota
//! counter, precheck, batch call, and tally is keyed by it. The wire ids
//! map each kind to the numeric action-type id the server uses in quota
//! reports.

use serde::{Deserialize, Serialize};

/// An action the helper can apply to a friend's land.
///
/// The first four kinds benefit the farm owner (or ourselves, for
/// [`Steal`]); the `Put*` kinds are mischief actions placed on a land at
/// the owner's expense.
///
/// [`Steal`]: ActionKind::Steal
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Pull weeds placed on a growing land (helps the owner).
    HelpWeed,
    /// Spray insects off a growing land (helps the owner).
    HelpInsect,
    /// Water a dry growing land (helps the owner).
    HelpWater,
    /// Take a share of a mature, still-stealable harvest.
    Steal,
    /// Place a weed marker on a growing land (mischief).
    PutWeed,
    /// Place an insect marker on a growing land (mischief).
    PutInsect,
}

/// The help kinds in the fixed per-visit execution order.
pub const HELP_KINDS: [ActionKind; 3] = [
    ActionKind::HelpWeed,
    ActionKind::HelpInsect,
    ActionKind::HelpWater,
];

/// The mischief kinds in the fixed per-visit execution order.
pub const MISCHIEF_KINDS: [ActionKind; 2] = [ActionKind::PutWeed, ActionKind::PutInsect];

impl ActionKind {
    /// Whether this kind helps the farm owner (weed, insect, water).
    ///
    /// Help kinds are experience-gated: the server tracks a separate
    /// experience-eligible count alongside the plain count.
    pub const fn is_help(self) -> bool {
        matches!(self, Self::HelpWeed | Self::HelpInsect | Self::HelpWater)
    }

    /// Whether this kind is a mischief action (quantity-gated, no
    /// remote precheck).
    pub const fn is_mischief(self) -> bool {
        matches!(self, Self::PutWeed | Self::PutInsect)
    }

    /// The server's numeric action-type id for this kind, as carried in
    /// quota reports.
    pub const fn wire_id(self) -> u32 {
        match self {
            Self::HelpWeed => 1,
            Self::HelpInsect => 2,
            Self::HelpWater => 3,
            Self::Steal => 4,
            Self::PutWeed => 5,
            Self::PutInsect => 6,
        }
    }

    /// Map a server action-type id back to a kind. Unknown ids yield
    /// `None` and are skipped by quota bookkeeping.
    pub const fn from_wire(id: u32) -> Option<Self> {
        match id {
            1 => Some(Self::HelpWeed),
            2 => Some(Self::HelpInsect),
            3 => Some(Self::HelpWater),
            4 => Some(Self::Steal),
            5 => Some(Self::PutWeed),
            6 => Some(Self::PutInsect),
            _ => None,
        }
    }

    /// Short human-readable label used in logs and diagnostics.
    pub const fn label(self) -> &'static str {
        match self {
            Self::HelpWeed => "help-weed",
            Self::HelpInsect => "help-insect",
            Self::HelpWater => "help-water",
            Self::Steal => "steal",
            Self::PutWeed => "put-weed",
            Self::PutInsect => "put-insect",
        }
    }

    /// All kinds in the fixed per-visit execution order:
    /// weed -> insect -> water -> steal -> mischief.
    pub const fn all() -> [Self; 6] {
        [
            Self::HelpWeed,
            Self::HelpInsect,
            Self::HelpWater,
            Self::Steal,
            Self::PutWeed,
            Self::PutInsect,
        ]
    }
}

impl core::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// Growth phase of a land plot as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    /// The crop is still growing; the land can be watered, weeded,
    /// sprayed, or targeted by mischief.
    Growing,
    /// The crop is ripe; the land may be stealable.
    Mature,
    /// The crop has withered; the land yields no actions.
    Dead,
}

/// What a remote quota precheck reduces to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecheckVerdict {
    /// The server confirmed the action is currently permitted.
    Allowed,
    /// The server reported the action disallowed (quota spent, feature
    /// closed, ...). The bucket is skipped without wasting calls.
    Denied,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn wire_ids_roundtrip() {
        for kind in ActionKind::all() {
            assert_eq!(ActionKind::from_wire(kind.wire_id()), Some(kind));
        }
    }

    #[test]
    fn unknown_wire_id_is_none() {
        assert_eq!(ActionKind::from_wire(0), None);
        assert_eq!(ActionKind::from_wire(99), None);
    }

    #[test]
    fn help_and_mischief_partitions() {
        for kind in HELP_KINDS {
            assert!(kind.is_help());
            assert!(!kind.is_mischief());
        }
        for kind in MISCHIEF_KINDS {
            assert!(kind.is_mischief());
            assert!(!kind.is_help());
        }
        assert!(!ActionKind::Steal.is_help());
        assert!(!ActionKind::Steal.is_mischief());
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(ActionKind::HelpWater.to_string(), "help-water");
        assert_eq!(ActionKind::PutInsect.to_string(), "put-insect");
    }
}
