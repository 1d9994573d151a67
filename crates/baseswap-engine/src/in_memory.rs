//! In-memory asset book.
//!
//! Reference [`AssetAdapter`]: per-(asset, account) balances and
//! per-(token, owner) allowances toward the escrow. All mutations are
//! atomic: either the full transfer succeeds or nothing changes.

use std::collections::{HashMap, HashSet};

use baseswap_types::{AccountId, Amount, AssetHandle, Result, SwapError, TokenId};

use crate::adapter::AssetAdapter;

pub struct InMemoryAssets {
    escrow: AccountId,
    balances: HashMap<(AssetHandle, AccountId), Amount>,
    /// `(token, owner)` → amount the escrow may pull.
    allowances: HashMap<(TokenId, AccountId), Amount>,
    /// Accounts that refuse incoming transfers.
    blocked: HashSet<AccountId>,
}

impl InMemoryAssets {
    #[must_use]
    pub fn new(escrow: AccountId) -> Self {
        Self {
            escrow,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            blocked: HashSet::new(),
        }
    }

    /// Credit `amount` out of thin air (faucet / genesis).
    pub fn mint(&mut self, asset: AssetHandle, account: AccountId, amount: Amount) {
        *self.balances.entry((asset, account)).or_default() += amount;
    }

    /// Set (not add to) the amount the escrow may pull from `owner`.
    pub fn approve(&mut self, token: TokenId, owner: AccountId, amount: Amount) {
        self.allowances.insert((token, owner), amount);
    }

    /// Make `account` reject every incoming transfer.
    pub fn block_recipient(&mut self, account: AccountId) {
        self.blocked.insert(account);
    }

    /// Sum of every account's holdings of `asset`, escrow included.
    #[must_use]
    pub fn total_supply(&self, asset: AssetHandle) -> Amount {
        self.balances
            .iter()
            .filter(|((a, _), _)| *a == asset)
            .map(|(_, amount)| *amount)
            .sum()
    }

    fn failed(asset: AssetHandle, amount: Amount, reason: String) -> SwapError {
        SwapError::TransferFailed {
            asset,
            amount,
            reason,
        }
    }

    fn debit(&mut self, asset: AssetHandle, account: AccountId, amount: Amount) -> Result<()> {
        let held = self.balance_of(asset, account);
        if held < amount {
            return Err(Self::failed(
                asset,
                amount,
                format!("{account} holds only {held}"),
            ));
        }
        self.balances.insert((asset, account), held - amount);
        Ok(())
    }
}

impl AssetAdapter for InMemoryAssets {
    fn escrow_account(&self) -> AccountId {
        self.escrow
    }

    fn transfer_in(&mut self, asset: AssetHandle, from: AccountId, amount: Amount) -> Result<()> {
        if let AssetHandle::Token(token) = asset {
            let approved = self.allowance(token, from);
            if approved < amount {
                return Err(Self::failed(
                    asset,
                    amount,
                    format!("allowance of {from} is {approved}"),
                ));
            }
            self.debit(asset, from, amount)?;
            self.allowances.insert((token, from), approved - amount);
        } else {
            self.debit(asset, from, amount)?;
        }
        self.mint(asset, self.escrow, amount);
        Ok(())
    }

    fn transfer_out(&mut self, asset: AssetHandle, to: AccountId, amount: Amount) -> Result<()> {
        self.check_transfer_out(asset, to, amount)?;
        self.debit(asset, self.escrow, amount)?;
        self.mint(asset, to, amount);
        Ok(())
    }

    fn balance_of(&self, asset: AssetHandle, holder: AccountId) -> Amount {
        self.balances.get(&(asset, holder)).copied().unwrap_or(0)
    }

    fn allowance(&self, token: TokenId, owner: AccountId) -> Amount {
        self.allowances.get(&(token, owner)).copied().unwrap_or(0)
    }

    fn check_transfer_out(&self, asset: AssetHandle, to: AccountId, amount: Amount) -> Result<()> {
        if self.blocked.contains(&to) {
            return Err(Self::failed(asset, amount, format!("{to} rejects transfers")));
        }
        Ok(())
    }
}
