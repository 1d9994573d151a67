//! Error types for BaseSwap.
//!
//! All errors use the `BS_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Configuration errors
//! - 2xx: Lifecycle errors
//! - 3xx: Ledger admission errors
//! - 4xx: Asset movement errors
//! - 9xx: General / internal errors

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{AccountId, Amount, AssetHandle, Side};

/// Central error enum for all BaseSwap operations.
///
/// Every failure is a full rollback: no state change from the failed
/// call survives.
#[derive(Debug, Error)]
pub enum SwapError {
    // =================================================================
    // Configuration Errors (1xx)
    // =================================================================
    /// Construction parameters rejected; no agreement is created.
    #[error("BS_ERR_100: Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    // =================================================================
    // Lifecycle Errors (2xx)
    // =================================================================
    /// The expiration deadline has passed.
    #[error("BS_ERR_200: Agreement expired at {expiration}")]
    Expired { expiration: DateTime<Utc> },

    /// The agreement is already swapped or cancelled.
    #[error("BS_ERR_201: Agreement already terminal ({status})")]
    AlreadyTerminal { status: crate::SwapStatus },

    /// Only the owner may perform this action.
    #[error("BS_ERR_202: Unauthorized caller {caller}")]
    Unauthorized { caller: AccountId },

    /// Refund attempted before the expiration deadline.
    #[error("BS_ERR_203: Agreement not expired until {expiration}")]
    NotExpired { expiration: DateTime<Utc> },

    // =================================================================
    // Ledger Admission Errors (3xx)
    // =================================================================
    /// Deposit would push the side past its limit.
    #[error("BS_ERR_300: Deposit of {amount} exceeds {side} limit: raised {raised}, limit {limit}")]
    OverLimit {
        side: Side,
        amount: Amount,
        raised: Amount,
        limit: Amount,
    },

    /// A new investor would exceed the side's investor cap.
    #[error("BS_ERR_301: {side} investor cap of {cap} reached")]
    InvestorCapExceeded { side: Side, cap: usize },

    /// Deposits must be positive.
    #[error("BS_ERR_302: Zero amount")]
    ZeroAmount,

    /// The deposit kind does not match the side's asset.
    #[error("BS_ERR_303: Asset mismatch: {reason}")]
    AssetMismatch { reason: String },

    // =================================================================
    // Asset Movement Errors (4xx)
    // =================================================================
    /// The asset adapter refused a transfer (balance, allowance, ...).
    #[error("BS_ERR_400: Transfer of {amount} {asset} failed: {reason}")]
    TransferFailed {
        asset: AssetHandle,
        amount: Amount,
        reason: String,
    },

    /// The escrow holds less than it is about to disburse.
    #[error("BS_ERR_401: Escrow holds {held} {asset}, needs {needed}")]
    InsufficientHoldings {
        asset: AssetHandle,
        needed: Amount,
        held: Amount,
    },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("BS_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("BS_ERR_901: Serialization error: {0}")]
    Serialization(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, SwapError>;

impl From<serde_json::Error> for SwapError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
