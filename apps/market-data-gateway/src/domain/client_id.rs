//! Client identifier generation.
//!
//! The broker gateway distinguishes simultaneous sessions by an integer
//! client id and rejects a handshake that reuses a live one. Several gateway
//! processes may share one broker, so ids are carved out of a per-process
//! range: `pid * multiplier + offset`.
//!
//! The randomized policy draws the offset from `[1, range)` so that sessions
//! opened by the same process in quick succession rarely collide. A
//! collision is still possible; it surfaces as a handshake failure.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Default multiplier giving each process a disjoint id range.
pub const DEFAULT_MULTIPLIER: i64 = 100;

/// Default exclusive upper bound of the randomized offset.
pub const DEFAULT_OFFSET_RANGE: i64 = 50;

/// Integer id the broker uses to tell sessions apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(i64);

impl ClientId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Raw id.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the per-session offset within the process range is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetPolicy {
    /// Always offset 0: one id per process.
    Deterministic,
    /// Uniform offset in `[1, range)`.
    Randomized {
        /// Exclusive upper bound.
        range: i64,
    },
}

/// Generates client ids from the process id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIdGenerator {
    multiplier: i64,
    policy: OffsetPolicy,
}

impl Default for ClientIdGenerator {
    fn default() -> Self {
        Self::randomized(DEFAULT_MULTIPLIER, DEFAULT_OFFSET_RANGE)
    }
}

impl ClientIdGenerator {
    /// Generator with an explicit offset policy.
    #[must_use]
    pub const fn new(multiplier: i64, policy: OffsetPolicy) -> Self {
        Self { multiplier, policy }
    }

    /// Generator that always yields `pid * multiplier`.
    #[must_use]
    pub const fn deterministic(multiplier: i64) -> Self {
        Self::new(multiplier, OffsetPolicy::Deterministic)
    }

    /// Generator that yields `pid * multiplier + rand[1, range)`.
    #[must_use]
    pub const fn randomized(multiplier: i64, range: i64) -> Self {
        Self::new(multiplier, OffsetPolicy::Randomized { range })
    }

    /// Offset policy in use.
    #[must_use]
    pub const fn policy(&self) -> OffsetPolicy {
        self.policy
    }

    /// Next id for the current process.
    #[must_use]
    pub fn generate(&self) -> ClientId {
        self.generate_for(std::process::id())
    }

    /// Next id for an arbitrary process id.
    #[must_use]
    pub fn generate_for(&self, pid: u32) -> ClientId {
        let base = i64::from(pid).saturating_mul(self.multiplier);
        let offset = match self.policy {
            OffsetPolicy::Randomized { range } if range > 1 => rand::rng().random_range(1..range),
            OffsetPolicy::Randomized { .. } | OffsetPolicy::Deterministic => 0,
        };
        let id = ClientId(base.saturating_add(offset));
        tracing::debug!(pid, client_id = %id, "Generated client id");
        id
    }
}
