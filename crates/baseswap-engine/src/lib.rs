//! # baseswap-engine
//!
//! The swap agreement aggregate and its asset boundary.
//!
//! ## Architecture
//!
//! 1. **SwapAgreement**: owns both side ledgers and the lifecycle; exposes
//!    deposits, cancel, refund and every read
//! 2. **AssetAdapter**: moves native currency and tokens in and out of escrow
//! 3. **InMemoryAssets**: reference adapter with balances and allowances
//! 4. **holdings**: escrow-backing audit run before every disbursement
//! 5. **SharedAgreement**: one lock per agreement for multi-threaded hosts
//!
//! ## Call Flow
//!
//! ```text
//! deposit → gate → check → adapter.transfer_in → record → full/full?
//!         → mark swapped → plan → audit holdings → adapter.transfer_out × N
//! ```
//!
//! Any failure after the pull restores the pre-call snapshot and returns
//! the pulled value.

pub mod adapter;
pub mod agreement;
pub mod context;
pub mod holdings;
pub mod in_memory;
pub mod shared;

pub use adapter::AssetAdapter;
pub use agreement::{AgreementSnapshot, SideSnapshot, SwapAgreement};
pub use context::CallContext;
pub use in_memory::InMemoryAssets;
pub use shared::SharedAgreement;
