//! System-wide constants for BaseSwap.

/// Default cap on distinct investors per side.
pub const MAX_INVESTORS: usize = 10;
