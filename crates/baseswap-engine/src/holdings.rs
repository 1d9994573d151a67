//! Escrow holdings audit.
//!
//! Two checks tie the bookkeeping to what the adapter actually holds:
//! ```text
//! before disbursement:  ∀ asset: balance_of(asset, escrow) >= Σ planned payouts
//! at rest:              ∀ side:  balance_of(asset(side), escrow) >= raised(side)
//! ```
//! The escrow may hold more than the ledgers record (settlement dust,
//! direct transfers), never less.

use std::collections::BTreeMap;

use baseswap_ledger::{Payout, SideLedger};
use baseswap_types::{Amount, AssetHandle, Result, Side, SwapConfig, SwapError};

use crate::adapter::AssetAdapter;

/// Total planned outflow per asset.
#[must_use]
pub fn required_by_asset(config: &SwapConfig, payouts: &[Payout]) -> BTreeMap<AssetHandle, Amount> {
    let mut required = BTreeMap::new();
    for payout in payouts {
        *required.entry(config.asset(payout.pool)).or_default() += payout.amount;
    }
    required
}

/// Fail unless the escrow can fund every planned payout.
///
/// # Errors
/// [`SwapError::InsufficientHoldings`] for the first short asset.
pub fn ensure_covered<A: AssetAdapter + ?Sized>(
    adapter: &A,
    required: &BTreeMap<AssetHandle, Amount>,
) -> Result<()> {
    let escrow = adapter.escrow_account();
    for (asset, needed) in required {
        let held = adapter.balance_of(*asset, escrow);
        if held < *needed {
            return Err(SwapError::InsufficientHoldings {
                asset: *asset,
                needed: *needed,
                held,
            });
        }
    }
    Ok(())
}

/// Verify both ledgers are backed by actual escrow holdings.
///
/// # Errors
/// [`SwapError::InsufficientHoldings`] naming the under-backed asset.
pub fn verify_backing<A: AssetAdapter + ?Sized>(
    adapter: &A,
    config: &SwapConfig,
    base: &SideLedger,
    quote: &SideLedger,
) -> Result<()> {
    let mut required = BTreeMap::new();
    for (side, ledger) in [(Side::Base, base), (Side::Quote, quote)] {
        required.insert(config.asset(side), ledger.raised());
    }
    ensure_covered(adapter, &required)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryAssets;
    use baseswap_types::AccountId;

    #[test]
    fn required_sums_per_asset() {
        let cfg = SwapConfig::dummy(10, 20);
        let (a, b) = (AccountId::new(), AccountId::new());
        let payouts = vec![
            Payout {
                pool: Side::Quote,
                recipient: a,
                amount: 12,
            },
            Payout {
                pool: Side::Quote,
                recipient: b,
                amount: 8,
            },
            Payout {
                pool: Side::Base,
                recipient: b,
                amount: 10,
            },
        ];
        let required = required_by_asset(&cfg, &payouts);
        assert_eq!(required[&cfg.quote_asset], 20);
        assert_eq!(required[&AssetHandle::Native], 10);
    }

    #[test]
    fn short_escrow_is_reported() {
        let cfg = SwapConfig::dummy(10, 20);
        let mut book = InMemoryAssets::new(AccountId::new());
        book.mint(cfg.quote_asset, book.escrow_account(), 5);

        let mut required = BTreeMap::new();
        required.insert(cfg.quote_asset, 6);
        let err = ensure_covered(&book, &required).unwrap_err();
        assert!(matches!(
            err,
            SwapError::InsufficientHoldings {
                needed: 6,
                held: 5,
                ..
            }
        ));

        required.insert(cfg.quote_asset, 5);
        assert!(ensure_covered(&book, &required).is_ok());
    }

    #[test]
    fn backing_matches_raised() {
        let cfg = SwapConfig::dummy(10, 20);
        let mut book = InMemoryAssets::new(AccountId::new());
        let mut base = SideLedger::new(Side::Base, 10, 5);
        let quote = SideLedger::new(Side::Quote, 20, 5);
        base.record_deposit(AccountId::new(), 4).unwrap();

        assert!(verify_backing(&book, &cfg, &base, &quote).is_err());
        book.mint(AssetHandle::Native, book.escrow_account(), 4);
        assert!(verify_backing(&book, &cfg, &base, &quote).is_ok());
    }
}
