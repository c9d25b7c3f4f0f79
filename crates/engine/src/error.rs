//! Auction engine error taxonomy.
//!
//! Every rejected operation surfaces as exactly one of these kinds. A
//! rejected operation commits no state.

use thiserror::Error;

use clearbid_types::{Amount, BidId};

/// Errors returned by engine entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuctionError {
    /// Operation attempted outside its allowed auction or bid state.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// Deposited amount below the bid's required payment.
    #[error("insufficient payment: required {required}, deposited {deposited}")]
    InsufficientPayment { required: Amount, deposited: Amount },

    /// Claim attempted a second time.
    #[error("already settled")]
    AlreadySettled,

    /// Caller is not allowed to perform this operation.
    #[error("unauthorized")]
    Unauthorized,

    /// Unknown bid id.
    #[error("bid {0} not found")]
    NotFound(BidId),
}
