//! Per-call context: who is calling, what value is attached, and when.

use baseswap_types::{AccountId, Amount};
use chrono::{DateTime, Utc};

/// The opaque envelope a host delivers with every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub caller: AccountId,
    /// Native currency attached to the call.
    pub value: Amount,
    /// Timestamp the deadline is compared against.
    pub now: DateTime<Utc>,
}

impl CallContext {
    #[must_use]
    pub fn new(caller: AccountId, now: DateTime<Utc>) -> Self {
        Self {
            caller,
            value: 0,
            now,
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }
}
