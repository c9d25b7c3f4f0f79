//! Query handlers for the auction engine.
//!
//! Read-only access; never mutates state.

use serde::{Deserialize, Serialize};

use clearbid_types::{Address, Amount, AuctionPhase, Bid, BidId, Price, Quantity};

use crate::state::EngineState;

/// Query request types.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AuctionQuery {
    /// Get a bid by id.
    GetBid { bid_id: BidId },

    /// Get all bid ids submitted by a bidder.
    BidsOf { bidder: Address },

    /// Get the clearing price, if resolved.
    ClearingPrice,

    /// Get the auction phase.
    Phase,

    /// Get the escrow currency currently retained.
    EscrowHeld,

    /// Get a one-shot summary of the auction.
    Summary,
}

/// Query response types.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AuctionQueryResponse {
    Bid(Option<Bid>),
    BidIds(Vec<BidId>),
    ClearingPrice(Option<Price>),
    Phase(AuctionPhase),
    EscrowHeld(Amount),
    Summary(AuctionSummary),
}

/// Snapshot of the auction for listings and the CLI status view.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuctionSummary {
    pub phase: AuctionPhase,
    pub total_supply: Quantity,
    pub deadline: u64,
    pub bid_count: u64,
    pub confirmed_count: usize,
    pub pending_reveals: usize,
    pub clearing_price: Option<Price>,
    pub total_allocated: Quantity,
    pub escrow_held: Amount,
    pub proceeds_claimed: bool,
}

/// Handle a query.
pub fn handle_query(state: &EngineState, query: AuctionQuery) -> AuctionQueryResponse {
    match query {
        AuctionQuery::GetBid { bid_id } => {
            AuctionQueryResponse::Bid(state.bid(bid_id).ok().cloned())
        }

        AuctionQuery::BidsOf { bidder } => AuctionQueryResponse::BidIds(state.bids_of(&bidder)),

        AuctionQuery::ClearingPrice => AuctionQueryResponse::ClearingPrice(state.clearing_price()),

        AuctionQuery::Phase => AuctionQueryResponse::Phase(state.phase()),

        AuctionQuery::EscrowHeld => AuctionQueryResponse::EscrowHeld(state.escrow_held()),

        AuctionQuery::Summary => AuctionQueryResponse::Summary(summarize(state)),
    }
}

/// Build the summary snapshot.
pub fn summarize(state: &EngineState) -> AuctionSummary {
    AuctionSummary {
        phase: state.phase(),
        total_supply: state.config.total_supply,
        deadline: state.config.deadline,
        bid_count: state.bid_count(),
        confirmed_count: state.confirmed_count(),
        pending_reveals: state.correlator.pending_count(),
        clearing_price: state.clearing_price(),
        total_allocated: state.total_allocated(),
        escrow_held: state.escrow_held(),
        proceeds_claimed: state.proceeds_claimed(),
    }
}
