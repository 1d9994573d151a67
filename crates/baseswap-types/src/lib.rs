//! # baseswap-types
//!
//! Shared types, errors, and configuration for the **BaseSwap** escrow.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Identifiers**: [`AccountId`], [`TokenId`], [`AgreementId`]
//! - **Assets**: [`AssetHandle`], [`Side`], [`Amount`], [`Share`]
//! - **Lifecycle**: [`SwapStatus`]
//! - **Notifications**: [`SwapEvent`]
//! - **Configuration**: [`SwapConfig`]
//! - **Errors**: [`SwapError`] with `BS_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod asset;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod status;

pub use asset::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use status::*;

// Constants are accessed via `baseswap_types::constants::FOO`.
