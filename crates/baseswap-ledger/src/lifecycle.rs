//! Lifecycle gating: terminal states, expiration and owner authority.
//!
//! Expiration is a deadline compared against the call's timestamp at the
//! start of each operation, never a running timer.
//!
//! | Operation | Before expiration | At/after expiration |
//! |-----------|-------------------|---------------------|
//! | deposit   | allowed           | `Expired`           |
//! | cancel    | owner only        | `Expired`           |
//! | refund    | `NotExpired`      | allowed (anyone)    |
//!
//! Every gate fails with `AlreadyTerminal` once swapped or cancelled.

use baseswap_types::{AccountId, Result, SwapError, SwapStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleController {
    owner: AccountId,
    expiration: DateTime<Utc>,
    status: SwapStatus,
}

impl LifecycleController {
    /// Start in `Open`.
    #[must_use]
    pub fn new(owner: AccountId, expiration: DateTime<Utc>) -> Self {
        Self {
            owner,
            expiration,
            status: SwapStatus::Open,
        }
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiration
    }

    pub fn ensure_open(&self) -> Result<()> {
        if self.status.is_terminal() {
            return Err(SwapError::AlreadyTerminal {
                status: self.status,
            });
        }
        Ok(())
    }

    /// Deposits are accepted only while open and strictly before expiration.
    pub fn deposit_gate(&self, now: DateTime<Utc>) -> Result<()> {
        self.ensure_open()?;
        if self.is_expired(now) {
            return Err(SwapError::Expired {
                expiration: self.expiration,
            });
        }
        Ok(())
    }

    /// Administrative cancel: open, before expiration, owner only.
    pub fn authorize_cancel(&self, caller: AccountId, now: DateTime<Utc>) -> Result<()> {
        self.ensure_open()?;
        if self.is_expired(now) {
            return Err(SwapError::Expired {
                expiration: self.expiration,
            });
        }
        if caller != self.owner {
            return Err(SwapError::Unauthorized { caller });
        }
        Ok(())
    }

    /// Post-expiration unwind: open and at/after expiration, any caller.
    pub fn authorize_refund(&self, now: DateTime<Utc>) -> Result<()> {
        self.ensure_open()?;
        if !self.is_expired(now) {
            return Err(SwapError::NotExpired {
                expiration: self.expiration,
            });
        }
        Ok(())
    }

    pub fn mark_swapped(&mut self) -> Result<()> {
        self.transition(SwapStatus::Swapped)
    }

    pub fn mark_cancelled(&mut self) -> Result<()> {
        self.transition(SwapStatus::Cancelled)
    }

    fn transition(&mut self, target: SwapStatus) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(SwapError::AlreadyTerminal {
                status: self.status,
            });
        }
        tracing::info!(from = %self.status, to = %target, "lifecycle transition");
        self.status = target;
        Ok(())
    }

    #[must_use]
    pub fn status(&self) -> SwapStatus {
        self.status
    }

    #[must_use]
    pub fn is_swapped(&self) -> bool {
        self.status == SwapStatus::Swapped
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.status == SwapStatus::Cancelled
    }

    #[must_use]
    pub fn owner(&self) -> AccountId {
        self.owner
    }

    #[must_use]
    pub fn expiration(&self) -> DateTime<Utc> {
        self.expiration
    }
}
