//! Settlement engine for a sealed-bid, uniform-clearing-price auction.
//!
//! A fixed supply of a fungible asset is sold in a single shot: bids are
//! submitted as opaque ciphertext handles, revealed asynchronously by an
//! external confidential-computation service, backed by escrow on
//! confirmation, then ranked and settled at one clearing price. The
//! unbounded bid set is processed through bounded, resumable batches; the
//! outcome never depends on how the work was chunked.
//!
//! # Architecture
//!
//! - `call`: message types for state-changing operations
//! - `handlers`: business logic for processing calls
//! - `state`: the auction aggregate root and bid ledger
//! - `reveal`: correlation of asynchronous reveal callbacks
//! - `resolution`: ranking and the clearing-price walk
//! - `distribution`: allocation finalization feeding the claim paths
//! - `queries`: read-only state access
//! - `genesis`: initial configuration
//! - `error`: error taxonomy
//!
//! # Example
//!
//! ```
//! use clearbid_engine::{handlers, AuctionGenesisConfig, CallContext, EngineState};
//! use clearbid_types::{CiphertextHandle, InputProof};
//!
//! let mut config = AuctionGenesisConfig::default();
//! config.deadline = 1_000;
//! let mut state = EngineState::new(config);
//!
//! let bidder = [1u8; 32];
//! let ctx = CallContext { sender: bidder, block_height: 1, timestamp: 10, value: 0 };
//! let outcome = handlers::handle_submit_bid(
//!     &mut state,
//!     &ctx,
//!     CiphertextHandle::derive(&bidder, 0),
//!     CiphertextHandle::derive(&bidder, 1),
//!     InputProof(vec![0x01]),
//! )
//! .unwrap();
//!
//! // The reveal service later echoes the request id back with plaintexts.
//! handlers::handle_reveal_callback(&mut state, outcome.reveal.request_id, &[500, 20]).unwrap();
//! ```

pub mod call;
pub mod distribution;
pub mod error;
pub mod genesis;
pub mod handlers;
pub mod queries;
pub mod resolution;
pub mod reveal;
pub mod state;

pub use call::AuctionCall;
pub use distribution::FinalizationProgress;
pub use error::AuctionError;
pub use genesis::{AuctionGenesisConfig, GenesisValidationError};
pub use handlers::{CallContext, HandlerResult, RevealOutcome, SubmitOutcome};
pub use queries::{AuctionQuery, AuctionQueryResponse, AuctionSummary};
pub use resolution::ResolutionProgress;
pub use reveal::RevealCorrelator;
pub use state::EngineState;
