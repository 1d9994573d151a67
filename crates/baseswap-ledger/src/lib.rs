//! # baseswap-ledger
//!
//! Pure bookkeeping for a two-sided escrow swap. Nothing here moves
//! assets; the engine crate sequences these pieces around the asset
//! adapter.
//!
//! 1. **SideLedger**: raised total, ordered investors, per-investor contributions
//! 2. **SettlementEngine**: joint full-funding trigger and pro-rata payout plan
//! 3. **LifecycleController**: terminal states, expiration and owner gating
//!
//! ```text
//! deposit → LifecycleController.deposit_gate() → SideLedger.record_deposit()
//!         → SettlementEngine.is_triggered()? → SettlementEngine.plan()
//! ```

pub mod lifecycle;
pub mod settlement;
pub mod side_ledger;

pub use lifecycle::LifecycleController;
pub use settlement::{Payout, SettlementEngine, SettlementPlan, total_from};
pub use side_ledger::{Contribution, SideLedger};
