//! Resolution engine: ranking and the clearing-price walk.
//!
//! Confirmed bids are kept in a price-ordered book as they confirm. When
//! resolution starts the book is frozen into a sorted view, and repeated
//! bounded-size calls walk it greedily, allocating supply best-price-first
//! until the cursor reaches the end. The outcome is independent of how the
//! walk is chunked across calls.

use std::cmp::Ordering;

use clearbid_types::{AuctionPhase, BidId, Price, Quantity};

use crate::state::EngineState;

/// Ranking key for the order book: descending price, ties broken by
/// ascending bid id (earlier submission wins). The order is total: no two
/// confirmed bids compare equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RankKey {
    pub price: Price,
    pub id: BidId,
}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .price
            .cmp(&self.price)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Progress of the resolution walk after one call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolutionProgress {
    /// Bids processed by this call.
    pub processed: usize,
    /// Next unranked position.
    pub cursor: usize,
    /// Size of the confirmed-bid set.
    pub total: usize,
    pub phase: AuctionPhase,
    /// Set once the walk completes.
    pub clearing_price: Option<Price>,
}

/// Freeze the ranking and move the auction out of the open phase. Called
/// exactly once, on the first resolution call after the deadline.
pub(crate) fn begin(state: &mut EngineState) {
    state.ranking = state.book.iter().map(|key| key.id).collect();
    state.phase = AuctionPhase::AwaitingResolution;
}

/// Advance the greedy allocation walk by at most `batch_size` bids.
///
/// Maintains the running remaining supply, latches the marginal price the
/// moment supply is exhausted, and fixes the clearing price when the
/// cursor reaches the end of the confirmed set:
/// the marginal bid's price if demand met supply, otherwise the price of
/// the lowest-priced confirmed bid, otherwise zero for an empty set.
pub(crate) fn advance(state: &mut EngineState, batch_size: usize) -> ResolutionProgress {
    if batch_size == 0 {
        return progress(state, 0);
    }

    if state.phase == AuctionPhase::AwaitingResolution {
        state.phase = AuctionPhase::Resolving;
    }

    let mut processed = 0;
    while processed < batch_size && state.resolution_cursor < state.ranking.len() {
        let bid_id = state.ranking[state.resolution_cursor];
        let terms = state.bids[bid_id as usize]
            .terms()
            .cloned()
            .expect("ranked bid is confirmed");

        let fill: Quantity = terms.quantity.min(state.resolution_remaining);
        state.resolution_remaining -= fill;
        state.last_price = Some(terms.price);
        if fill > 0 && state.resolution_remaining == 0 && state.marginal_price.is_none() {
            state.marginal_price = Some(terms.price);
        }

        state.resolution_cursor += 1;
        processed += 1;
    }

    if state.resolution_cursor == state.ranking.len() {
        state.total_allocated = state.config.total_supply - state.resolution_remaining;
        state.clearing_price = Some(state.marginal_price.or(state.last_price).unwrap_or(0));
        state.phase = AuctionPhase::Resolved;
    }

    progress(state, processed)
}

fn progress(state: &EngineState, processed: usize) -> ResolutionProgress {
    ResolutionProgress {
        processed,
        cursor: state.resolution_cursor,
        total: state.ranking.len(),
        phase: state.phase,
        clearing_price: state.clearing_price,
    }
}
