//! # Agreement lifecycle status
//!
//! ```text
//!   ┌──────┐  both sides full   ┌─────────┐
//!   │ OPEN ├───────────────────▶│ SWAPPED │
//!   └──┬───┘                    └─────────┘
//!      │ owner cancel (before expiration)
//!      ▼
//!   ┌───────────┐
//!   │ CANCELLED │
//!   └───────────┘
//! ```
//!
//! Transitions are **monotonic**: once terminal, the agreement never
//! reopens. Per-side refunds after expiration keep the agreement `OPEN`.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapStatus {
    /// Accepting deposits (until expiration).
    Open,
    /// Both pools were cross-distributed. **Irreversible.**
    Swapped,
    /// Owner cancelled; all deposits returned. **Irreversible.**
    Cancelled,
}

impl SwapStatus {
    /// Can the agreement move from `self` to `target`?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!((self, target), (Self::Open, Self::Swapped | Self::Cancelled))
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Open)
    }
}

impl fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Swapped => write!(f, "SWAPPED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}
