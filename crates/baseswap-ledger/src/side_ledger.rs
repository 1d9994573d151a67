//! Per-side deposit bookkeeping.
//!
//! A `SideLedger` tracks one pool: the cumulative raised amount, the
//! investors in first-deposit order, and each investor's cumulative
//! contribution. All admission checks run before any field is touched,
//! so a rejected deposit leaves the ledger unchanged.

use std::collections::HashMap;

use baseswap_types::{AccountId, Amount, Result, Share, Side, SwapError};
use serde::{Deserialize, Serialize};

/// One investor's cumulative contribution to a side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub investor: AccountId,
    pub amount: Amount,
}

/// Bookkeeping for one asset pool.
///
/// Invariants:
/// - `raised <= limit`
/// - `investors.len() <= max_investors`, no duplicates
/// - `Σ contributions == raised`, every listed investor has a positive amount
#[derive(Debug, Clone)]
pub struct SideLedger {
    side: Side,
    limit: Amount,
    max_investors: usize,
    raised: Amount,
    /// Insertion-ordered by first deposit; drives payout order.
    investors: Vec<AccountId>,
    contributions: HashMap<AccountId, Amount>,
}

impl SideLedger {
    #[must_use]
    pub fn new(side: Side, limit: Amount, max_investors: usize) -> Self {
        Self {
            side,
            limit,
            max_investors,
            raised: 0,
            investors: Vec::new(),
            contributions: HashMap::new(),
        }
    }

    /// Validate a deposit without recording it.
    ///
    /// # Errors
    /// - `ZeroAmount` if `amount == 0`
    /// - `OverLimit` if `raised + amount > limit`
    /// - `InvestorCapExceeded` if `investor` is new and the cap is reached
    pub fn check_deposit(&self, investor: AccountId, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Err(SwapError::ZeroAmount);
        }
        // raised <= limit always holds, so remaining() cannot underflow.
        if amount > self.remaining() {
            return Err(SwapError::OverLimit {
                side: self.side,
                amount,
                raised: self.raised,
                limit: self.limit,
            });
        }
        if !self.contributions.contains_key(&investor) && self.investors.len() >= self.max_investors
        {
            return Err(SwapError::InvestorCapExceeded {
                side: self.side,
                cap: self.max_investors,
            });
        }
        Ok(())
    }

    /// Record a deposit and return the investor's new cumulative amount.
    ///
    /// # Errors
    /// Same as [`check_deposit`](Self::check_deposit); nothing changes on error.
    pub fn record_deposit(&mut self, investor: AccountId, amount: Amount) -> Result<Amount> {
        self.check_deposit(investor, amount)?;

        let entry = self.contributions.entry(investor).or_insert_with(|| {
            self.investors.push(investor);
            0
        });
        *entry += amount;
        self.raised += amount;

        tracing::debug!(
            side = %self.side,
            %investor,
            amount,
            raised = self.raised,
            limit = self.limit,
            "deposit recorded"
        );
        Ok(*entry)
    }

    /// `raised == limit`.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.raised == self.limit
    }

    /// Snapshot every contribution in insertion order, then empty the ledger.
    pub fn clear(&mut self) -> Vec<Contribution> {
        let snapshot = self.entries();
        self.raised = 0;
        self.investors.clear();
        self.contributions.clear();
        tracing::debug!(side = %self.side, investors = snapshot.len(), "side cleared");
        snapshot
    }

    /// `contribution / limit`, or `None` for a non-investor.
    #[must_use]
    pub fn share_of(&self, investor: AccountId) -> Option<Share> {
        self.contributions.get(&investor).map(|amount| Share {
            numerator: *amount,
            denominator: self.limit,
        })
    }

    /// Cumulative contribution of `investor` (zero if none).
    #[must_use]
    pub fn contribution(&self, investor: AccountId) -> Amount {
        self.contributions.get(&investor).copied().unwrap_or(0)
    }

    /// Contributions in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<Contribution> {
        self.investors
            .iter()
            .map(|investor| Contribution {
                investor: *investor,
                amount: self.contribution(*investor),
            })
            .collect()
    }

    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    #[must_use]
    pub fn limit(&self) -> Amount {
        self.limit
    }

    #[must_use]
    pub fn raised(&self) -> Amount {
        self.raised
    }

    /// Amount still needed to fill the side.
    #[must_use]
    pub fn remaining(&self) -> Amount {
        self.limit - self.raised
    }

    #[must_use]
    pub fn investors(&self) -> &[AccountId] {
        &self.investors
    }

    #[must_use]
    pub fn max_investors(&self) -> usize {
        self.max_investors
    }
}
