//! Mock chain for local development and testing of the clearbid auction.
//!
//! The [`runtime`] module is the deterministic execution environment
//! (engine + custody ledgers + gateway); the binary in `main.rs` serves it
//! over JSON-RPC. Integration tests drive [`runtime::ChainState`]
//! directly.

pub mod runtime;
pub mod types;

pub use runtime::{AssetLedger, Bank, ChainState, RuntimeError, AUCTION_ADDRESS};
