//! Shared data model and persisted-key constants used across all sharebridge
//! crates.

pub mod types;

pub use types::{AuxiliaryText, InvocationResult, LocationStyle, SharedItem, TEXT_PLAIN, keys};
