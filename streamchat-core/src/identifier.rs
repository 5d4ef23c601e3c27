//! Request identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one outstanding streamed request.
///
/// Every update produced by a request is tagged with its identity so that
/// updates from a superseded request can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestIdentity(u64);

impl RequestIdentity {
    /// Wrap a raw value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw value.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req_{}", self.0)
    }
}

/// Hands out strictly increasing identities.
#[derive(Debug, Default)]
pub struct IdentitySequence {
    next: u64,
}

impl IdentitySequence {
    /// Start a new sequence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next identity.
    pub fn next_identity(&mut self) -> RequestIdentity {
        self.next += 1;
        RequestIdentity(self.next)
    }
}
