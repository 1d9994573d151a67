//! Settlement planning.
//!
//! Once both sides are full, each side's pool is paid out to the other
//! side's investors pro-rata:
//!
//! ```text
//! base investor i  receives  quote_limit * contribution_i / base_limit   (quote asset)
//! quote investor j receives  base_limit  * contribution_j / quote_limit  (base asset)
//! ```
//!
//! Each payout truncates toward zero. The residual (dust) stays in the
//! escrow and is reported on the plan. Payout order is investor
//! insertion order, base side first.

use baseswap_types::{AccountId, Amount, Result, Side, SwapError};
use serde::{Deserialize, Serialize};

use crate::side_ledger::{Contribution, SideLedger};

/// A single transfer out of the escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    /// Pool the funds are drawn from.
    pub pool: Side,
    pub recipient: AccountId,
    pub amount: Amount,
}

impl Payout {
    /// Refund payouts: every contribution goes back to its investor.
    #[must_use]
    pub fn refunds(pool: Side, contributions: &[Contribution]) -> Vec<Payout> {
        contributions
            .iter()
            .map(|c| Payout {
                pool,
                recipient: c.investor,
                amount: c.amount,
            })
            .collect()
    }
}

/// Sum of payouts drawn from `pool`.
#[must_use]
pub fn total_from(payouts: &[Payout], pool: Side) -> Amount {
    payouts
        .iter()
        .filter(|p| p.pool == pool)
        .map(|p| p.amount)
        .sum()
}

/// The full cross-distribution of a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPlan {
    /// Base-side investors paid from the quote pool, then quote-side
    /// investors paid from the base pool.
    pub payouts: Vec<Payout>,
    /// Base asset left in escrow after truncation.
    pub base_dust: Amount,
    /// Quote asset left in escrow after truncation.
    pub quote_dust: Amount,
}

impl SettlementPlan {
    #[must_use]
    pub fn dust(&self, pool: Side) -> Amount {
        match pool {
            Side::Base => self.base_dust,
            Side::Quote => self.quote_dust,
        }
    }
}

/// Stateless settlement rules over two side ledgers.
pub struct SettlementEngine;

impl SettlementEngine {
    /// The joint trigger: both sides at full capacity.
    #[must_use]
    pub fn is_triggered(base: &SideLedger, quote: &SideLedger) -> bool {
        base.is_full() && quote.is_full()
    }

    /// Compute every payout without touching either ledger.
    ///
    /// # Errors
    /// - `Internal` if the sides are not both full, or if the payouts
    ///   from a pool would exceed what it holds
    pub fn plan(base: &SideLedger, quote: &SideLedger) -> Result<SettlementPlan> {
        if !Self::is_triggered(base, quote) {
            return Err(SwapError::Internal(format!(
                "settlement requested with base {}/{} and quote {}/{}",
                base.raised(),
                base.limit(),
                quote.raised(),
                quote.limit()
            )));
        }

        let mut payouts = Vec::with_capacity(base.investors().len() + quote.investors().len());
        payouts.extend(Self::cross_payouts(base, quote)?);
        payouts.extend(Self::cross_payouts(quote, base)?);

        let paid_quote = total_from(&payouts, Side::Quote);
        let paid_base = total_from(&payouts, Side::Base);
        if paid_quote > quote.raised() || paid_base > base.raised() {
            return Err(SwapError::Internal(format!(
                "settlement overdraws pools: base {paid_base}/{}, quote {paid_quote}/{}",
                base.raised(),
                quote.raised()
            )));
        }

        Ok(SettlementPlan {
            payouts,
            base_dust: base.raised() - paid_base,
            quote_dust: quote.raised() - paid_quote,
        })
    }

    /// Pay `receiving`'s investors out of `paying`'s pool.
    fn cross_payouts(receiving: &SideLedger, paying: &SideLedger) -> Result<Vec<Payout>> {
        receiving
            .investors()
            .iter()
            .map(|investor| {
                let amount = receiving
                    .share_of(*investor)
                    .and_then(|share| share.apply(paying.limit()))
                    .ok_or_else(|| {
                        SwapError::Internal(format!(
                            "share of {investor} on {} not computable",
                            receiving.side()
                        ))
                    })?;
                Ok(Payout {
                    pool: receiving.side().counterpart(),
                    recipient: *investor,
                    amount,
                })
            })
            .collect()
    }
}
