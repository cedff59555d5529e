//! Type-safe identifier wrappers around server-assigned numeric ids.
//!
//! The game server hands out plain integers for users and land plots.
//! Wrapping them in distinct newtypes prevents accidental mixing of
//! identifiers at compile time: a [`UserId`] can never be passed where a
//! [`LandId`] is expected.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around `u64` with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Wrap a raw server-assigned id.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Return the inner numeric value.
            pub const fn into_inner(self) -> u64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for an actor: ourselves or a friend whose farm
    /// we may visit.
    UserId
}

define_id! {
    /// Unique identifier for a single land plot on a farm.
    LandId
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ids_roundtrip_raw_value() {
        let user = UserId::new(42);
        assert_eq!(user.into_inner(), 42);
        assert_eq!(u64::from(user), 42);
        assert_eq!(UserId::from(42), user);
    }

    #[test]
    fn id_display_matches_raw() {
        let land = LandId::new(7);
        assert_eq!(land.to_string(), "7");
    }

    #[test]
    fn id_serde_is_transparent() {
        let json = serde_json::to_string(&LandId::new(9)).unwrap();
        assert_eq!(json, "9");
        let back: LandId = serde_json::from_str("9").unwrap();
        assert_eq!(back, LandId::new(9));
    }
}
