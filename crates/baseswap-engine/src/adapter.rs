//! The asset adapter boundary.
//!
//! The agreement never touches balances directly. It asks an adapter to
//! pull value in, push value out, and report what the escrow holds. One
//! trait covers both asset kinds; implementations dispatch on the
//! [`AssetHandle`] tag.

use baseswap_types::{AccountId, Amount, AssetHandle, Result, TokenId};

pub trait AssetAdapter {
    /// The identity holding pooled funds on behalf of the agreement.
    fn escrow_account(&self) -> AccountId;

    /// Move `amount` of `asset` from `from` into the escrow.
    ///
    /// For native currency this is the value attached to the call; for a
    /// token it is a pull against a prior allowance.
    ///
    /// # Errors
    /// `TransferFailed` on insufficient balance or allowance. Nothing
    /// moves on error.
    fn transfer_in(&mut self, asset: AssetHandle, from: AccountId, amount: Amount) -> Result<()>;

    /// Move `amount` of `asset` from the escrow to `to`.
    fn transfer_out(&mut self, asset: AssetHandle, to: AccountId, amount: Amount) -> Result<()>;

    /// Current holdings of `holder`.
    fn balance_of(&self, asset: AssetHandle, holder: AccountId) -> Amount;

    /// Amount `owner` has approved the escrow to pull.
    fn allowance(&self, token: TokenId, owner: AccountId) -> Amount;

    /// Dry-run a [`transfer_out`](Self::transfer_out).
    ///
    /// Every payout is checked here before any is executed. A refusal the
    /// adapter could have predicted but did not report here surfaces later
    /// as a deferred payout.
    ///
    /// # Errors
    /// `TransferFailed` if `to` would refuse the transfer.
    fn check_transfer_out(&self, asset: AssetHandle, to: AccountId, amount: Amount) -> Result<()>;
}
