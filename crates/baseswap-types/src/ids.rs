//! Identifiers used throughout BaseSwap.
//!
//! Caller identities use UUIDv7; token handles are 20-byte contract
//! addresses; agreement ids are derived from the agreement configuration.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// Identity of a caller: an investor, the owner, or the escrow itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AccountId(pub Uuid);

impl AccountId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// TokenId
// ---------------------------------------------------------------------------

/// Handle of a fungible token contract (20-byte address).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TokenId(pub [u8; 20]);

impl TokenId {
    #[must_use]
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Parse a `0x`-prefixed (or bare) 40-character hex address.
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw).map_err(|e| crate::SwapError::InvalidConfiguration {
            reason: format!("token address {s:?} is not hex: {e}"),
        })?;
        let arr: [u8; 20] =
            bytes
                .try_into()
                .map_err(|_| crate::SwapError::InvalidConfiguration {
                    reason: format!("token address {s:?} is not 20 bytes"),
                })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

// ---------------------------------------------------------------------------
// AgreementId
// ---------------------------------------------------------------------------

/// Deterministic identifier of a swap agreement.
///
/// Derived by hashing the canonical configuration bytes, so every host
/// that deploys the same parameters computes the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AgreementId(pub [u8; 32]);

impl AgreementId {
    #[must_use]
    pub fn derive(canonical: &[u8]) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(b"baseswap:agreement:v1:");
        hasher.update(canonical);
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for AgreementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "swap:{}", hex::encode(&self.0[..8]))
    }
}

/// Random token handle for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl TokenId {
    pub fn random() -> Self {
        Self(rand::random::<[u8; 20]>())
    }
}
