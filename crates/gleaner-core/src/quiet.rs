//! Quiet-hours gate: a time-window predicate deciding whether a
//! scheduling pass may run at all.
//!
//! Window bounds come from configuration as `HH:MM` strings and are
//! compared as minutes-since-midnight. Three window shapes exist:
//!
//! - equal bounds: quiet hours cover the full day;
//! - start before end: quiet iff `start <= now < end`;
//! - start after end: overnight wraparound, quiet iff
//!   `now >= start || now < end`.
//!
//! Malformed bounds disable the gate entirely (never quiet) -- a broken
//! config line must not silently stall the helper forever.

use chrono::{NaiveTime, Timelike};
use tracing::warn;

use crate::config::QuietHoursConfig;

/// Parse a strict `HH:MM` string into minutes since midnight.
///
/// Returns `None` for anything that is not exactly two colon-separated
/// decimal fields within range.
pub fn parse_hhmm(text: &str) -> Option<u32> {
    let (hours_text, minutes_text) = text.split_once(':')?;
    let hours: u32 = hours_text.parse().ok()?;
    let minutes: u32 = minutes_text.parse().ok()?;
    if hours >= 24 || minutes >= 60 {
        return None;
    }
    hours.checked_mul(60)?.checked_add(minutes)
}

/// Core window predicate on minutes-since-midnight values.
///
/// Both bounds must be below 1440 (minutes per day); callers obtain
/// them via [`parse_hhmm`].
pub const fn is_quiet_minutes(now: u32, window_start: u32, window_end: u32) -> bool {
    if window_start == window_end {
        // Degenerate window: quiet hours cover the full day.
        return true;
    }
    if window_start < window_end {
        window_start <= now && now < window_end
    } else {
        // Overnight wraparound, e.g. 22:00 -> 06:00.
        now >= window_start || now < window_end
    }
}

/// A configured quiet-hours gate.
///
/// Built once from [`QuietHoursConfig`]; a disabled or malformed
/// configuration yields a gate that is never quiet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietHours {
    /// Parsed window, or `None` when the gate is disabled.
    window: Option<(u32, u32)>,
}

impl QuietHours {
    /// A gate that is never quiet.
    pub const fn disabled() -> Self {
        Self { window: None }
    }

    /// Build the gate from configuration.
    ///
    /// Unparsable bounds log a warning and disable the gate.
    pub fn from_config(config: &QuietHoursConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        match (parse_hhmm(&config.start), parse_hhmm(&config.end)) {
            (Some(start), Some(end)) => Self {
                window: Some((start, end)),
            },
            _ => {
                warn!(
                    start = %config.start,
                    end = %config.end,
                    "Malformed quiet-hours bounds; gate disabled"
                );
                Self::disabled()
            }
        }
    }

    /// Whether the given wall-clock time falls inside quiet hours.
    pub fn is_quiet(&self, now: NaiveTime) -> bool {
        match self.window {
            Some((start, end)) => {
                let minutes = now.hour().saturating_mul(60).saturating_add(now.minute());
                is_quiet_minutes(minutes, start, end)
            }
            None => false,
        }
    }
}
