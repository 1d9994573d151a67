//! Agreement configuration.
//!
//! Fixed at construction; validated once, never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, AgreementId, Amount, AssetHandle, Result, Side, SwapError, constants};

fn default_max_investors() -> usize {
    constants::MAX_INVESTORS
}

/// Construction parameters of a swap agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapConfig {
    /// Identity allowed to cancel before expiration.
    pub owner: AccountId,
    pub base_asset: AssetHandle,
    pub quote_asset: AssetHandle,
    /// Amount of base asset that must be pooled.
    pub base_limit: Amount,
    /// Amount of quote asset that must be pooled.
    pub quote_limit: Amount,
    /// Absolute deadline; deposits are accepted strictly before it.
    pub expiration: DateTime<Utc>,
    /// Cap on distinct investors per side.
    #[serde(default = "default_max_investors")]
    pub max_investors: usize,
}

impl SwapConfig {
    #[must_use]
    pub fn new(
        owner: AccountId,
        base_asset: AssetHandle,
        quote_asset: AssetHandle,
        base_limit: Amount,
        quote_limit: Amount,
        expiration: DateTime<Utc>,
    ) -> Self {
        Self {
            owner,
            base_asset,
            quote_asset,
            base_limit,
            quote_limit,
            expiration,
            max_investors: constants::MAX_INVESTORS,
        }
    }

    #[must_use]
    pub fn with_max_investors(mut self, max_investors: usize) -> Self {
        self.max_investors = max_investors;
        self
    }

    /// Parse a JSON configuration document.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    #[must_use]
    pub fn asset(&self, side: Side) -> AssetHandle {
        match side {
            Side::Base => self.base_asset,
            Side::Quote => self.quote_asset,
        }
    }

    #[must_use]
    pub fn limit(&self, side: Side) -> Amount {
        match side {
            Side::Base => self.base_limit,
            Side::Quote => self.quote_limit,
        }
    }

    /// The side holding the native currency, if any.
    #[must_use]
    pub fn native_side(&self) -> Option<Side> {
        Side::BOTH
            .into_iter()
            .find(|side| self.asset(*side).is_native())
    }

    /// Check every construction invariant against the creation time.
    ///
    /// # Errors
    /// Returns [`SwapError::InvalidConfiguration`] naming the first
    /// violated rule.
    pub fn validate(&self, created_at: DateTime<Utc>) -> Result<()> {
        let invalid = |reason: &str| {
            Err(SwapError::InvalidConfiguration {
                reason: reason.to_string(),
            })
        };
        if self.base_asset == self.quote_asset {
            return invalid("base and quote assets must differ");
        }
        if self.base_limit == 0 {
            return invalid("base limit must be positive");
        }
        if self.quote_limit == 0 {
            return invalid("quote limit must be positive");
        }
        if self.expiration <= created_at {
            return invalid("expiration must be after creation time");
        }
        if self.max_investors == 0 {
            return invalid("investor cap must be positive");
        }
        // contribution <= limit, so this bounds every settlement product.
        if self.base_limit.checked_mul(self.quote_limit).is_none() {
            return invalid("base limit * quote limit overflows");
        }
        Ok(())
    }

    /// Deterministic id over the canonical field encoding.
    #[must_use]
    pub fn agreement_id(&self) -> AgreementId {
        let mut canonical = Vec::with_capacity(128);
        canonical.extend_from_slice(self.owner.0.as_bytes());
        for side in Side::BOTH {
            match self.asset(side) {
                AssetHandle::Native => canonical.push(0),
                AssetHandle::Token(id) => {
                    canonical.push(1);
                    canonical.extend_from_slice(id.as_bytes());
                }
            }
            canonical.extend_from_slice(&self.limit(side).to_le_bytes());
        }
        canonical.extend_from_slice(&self.expiration.timestamp_millis().to_le_bytes());
        let cap = u64::try_from(self.max_investors).unwrap_or(u64::MAX);
        canonical.extend_from_slice(&cap.to_le_bytes());
        AgreementId::derive(&canonical)
    }
}

/// Dummy configuration for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl SwapConfig {
    /// Native base side, random token quote side, one-hour expiration.
    pub fn dummy(base_limit: Amount, quote_limit: Amount) -> Self {
        Self::new(
            AccountId::new(),
            AssetHandle::Native,
            AssetHandle::Token(crate::TokenId::random()),
            base_limit,
            quote_limit,
            Utc::now() + chrono::Duration::hours(1),
        )
    }
}
