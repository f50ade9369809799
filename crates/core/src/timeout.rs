//! Per-call timeout tiers.
//!
//! Status polls must stay responsive, while task creation may sit behind
//! upstream queueing. Every outbound call picks one of three tiers instead
//! of sharing a single global timeout.

use std::time::Duration;

/// Logical class of an outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeoutTier {
    /// Read-only lookups (task status, balance, health).
    Read,
    /// Generic calls (MCP forwarding, SDK default).
    Standard,
    /// Task creation and other long-running writes.
    Create,
}

impl TimeoutTier {
    pub fn default_duration(self) -> Duration {
        match self {
            TimeoutTier::Read => Duration::from_secs(30),
            TimeoutTier::Standard => Duration::from_secs(60),
            TimeoutTier::Create => Duration::from_secs(120),
        }
    }
}

/// Concrete durations for each [`TimeoutTier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub read: Duration,
    pub standard: Duration,
    pub create: Duration,
}

impl Timeouts {
    /// Use the same duration for every tier.
    pub fn uniform(duration: Duration) -> Self {
        Self {
            read: duration,
            standard: duration,
            create: duration,
        }
    }

    pub fn for_tier(&self, tier: TimeoutTier) -> Duration {
        match tier {
            TimeoutTier::Read => self.read,
            TimeoutTier::Standard => self.standard,
            TimeoutTier::Create => self.create,
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            read: TimeoutTier::Read.default_duration(),
            standard: TimeoutTier::Standard.default_duration(),
            create: TimeoutTier::Create.default_duration(),
        }
    }
}
