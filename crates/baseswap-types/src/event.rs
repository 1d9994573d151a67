//! Notifications emitted by agreement operations.
//!
//! Each successful call returns its events and appends them to the
//! agreement's append-only log.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{AccountId, Amount, AssetHandle, Side};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapEvent {
    /// A deposit was recorded. `cumulative` is the depositor's running
    /// total on that side.
    Deposit {
        asset: AssetHandle,
        depositor: AccountId,
        amount: Amount,
        cumulative: Amount,
    },
    /// Both sides reached their limits and were cross-distributed.
    Swap { triggered_by: AccountId },
    /// The owner cancelled before expiration.
    Cancel { by: AccountId },
    /// One side was refunded after expiration.
    Refund { side: Side, by: AccountId },
    /// A payout the adapter refused after other payouts of the same call
    /// had already left escrow. It stays owed until retried.
    PayoutDeferred {
        asset: AssetHandle,
        recipient: AccountId,
        amount: Amount,
    },
    /// A previously deferred payout went through on retry.
    DeferredPayoutSent {
        asset: AssetHandle,
        recipient: AccountId,
        amount: Amount,
    },
}

impl fmt::Display for SwapEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deposit { .. } => write!(f, "DEPOSIT"),
            Self::Swap { .. } => write!(f, "SWAP"),
            Self::Cancel { .. } => write!(f, "CANCEL"),
            Self::Refund { .. } => write!(f, "REFUND"),
            Self::PayoutDeferred { .. } => write!(f, "PAYOUT_DEFERRED"),
            Self::DeferredPayoutSent { .. } => write!(f, "DEFERRED_PAYOUT_SENT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_display() {
        let ev = SwapEvent::Swap {
            triggered_by: AccountId::new(),
        };
        assert_eq!(format!("{ev}"), "SWAP");
    }

    #[test]
    fn deposit_serde_roundtrip() {
        let ev = SwapEvent::Deposit {
            asset: AssetHandle::Native,
            depositor: AccountId::new(),
            amount: 5,
            cumulative: 15,
        };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.starts_with("{\"Deposit\""), "Got: {json}");
        assert!(json.contains("\"cumulative\":15"), "Got: {json}");
        let back: SwapEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(ev, back);
    }
}
