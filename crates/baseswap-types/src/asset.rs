//! Asset handles, sides and amounts.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::TokenId;

/// Integer amount in the asset's base units (wei, satoshi, token units).
pub type Amount = u128;

/// One of the two asset pools of an agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Base,
    Quote,
}

impl Side {
    /// The opposite pool.
    #[must_use]
    pub fn counterpart(self) -> Self {
        match self {
            Self::Base => Self::Quote,
            Self::Quote => Self::Base,
        }
    }

    pub const BOTH: [Side; 2] = [Side::Base, Side::Quote];
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => write!(f, "BASE"),
            Self::Quote => write!(f, "QUOTE"),
        }
    }
}

/// What a side holds: the chain's native currency or a fungible token.
///
/// `Native` is the sentinel handle; it never compares equal to any token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum AssetHandle {
    Native,
    Token(TokenId),
}

impl AssetHandle {
    #[must_use]
    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native)
    }

    #[must_use]
    pub fn token(&self) -> Option<TokenId> {
        match self {
            Self::Native => None,
            Self::Token(id) => Some(*id),
        }
    }
}

impl fmt::Display for AssetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "NATIVE"),
            Self::Token(id) => write!(f, "{id}"),
        }
    }
}

/// An investor's exact fraction of a side: `contribution / limit`.
///
/// Kept as an integer ratio so settlement never loses precision before
/// the final per-investor truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub numerator: Amount,
    pub denominator: Amount,
}

impl Share {
    /// Apply this share to a counterpart amount, truncating toward zero.
    ///
    /// Returns `None` on multiplication overflow or a zero denominator.
    #[must_use]
    pub fn apply(&self, amount: Amount) -> Option<Amount> {
        if self.denominator == 0 {
            return None;
        }
        self.numerator
            .checked_mul(amount)
            .map(|product| product / self.denominator)
    }

    /// Decimal approximation for display and reporting.
    #[must_use]
    pub fn to_decimal(&self) -> Option<Decimal> {
        let num = Decimal::try_from_i128_with_scale(i128::try_from(self.numerator).ok()?, 0).ok()?;
        let den =
            Decimal::try_from_i128_with_scale(i128::try_from(self.denominator).ok()?, 0).ok()?;
        num.checked_div(den)
    }
}
