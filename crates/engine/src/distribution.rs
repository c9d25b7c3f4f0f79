//! Distribution engine: allocation finalization.
//!
//! After the clearing price is fixed, a second batched walk over the same
//! ranking re-derives each bid's greedy fill, writes it exactly once, and
//! records the refund owed (`required_payment − fill × clearing_price`).
//! Completion opens the distributing phase; the claim entry points in
//! `handlers` pay out against what is written here.

use clearbid_types::{Amount, AuctionPhase};

use crate::state::EngineState;

/// Progress of the finalization walk after one call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalizationProgress {
    /// Bids finalized by this call.
    pub processed: usize,
    /// Next unfinalized position.
    pub cursor: usize,
    /// Size of the confirmed-bid set.
    pub total: usize,
    pub phase: AuctionPhase,
}

/// Advance the finalization walk by at most `batch_size` bids.
///
/// The walk repeats the resolution recurrence over the frozen ranking, so
/// per-bid allocations agree with the aggregate `total_allocated` no
/// matter how either pass was chunked.
pub(crate) fn advance(state: &mut EngineState, batch_size: usize) -> FinalizationProgress {
    let clearing = state
        .clearing_price
        .expect("finalization requires a resolved auction") as Amount;

    let mut processed = 0;
    while processed < batch_size && state.allocation_cursor < state.ranking.len() {
        let bid_id = state.ranking[state.allocation_cursor];
        let terms = state.bids[bid_id as usize]
            .terms()
            .cloned()
            .expect("ranked bid is confirmed");

        let fill = terms.quantity.min(state.finalize_remaining);
        state.finalize_remaining -= fill;

        let settlement = fill as Amount * clearing;
        let refund = terms.required_payment - settlement;
        state
            .set_allocation(bid_id, fill, refund)
            .expect("allocation finalized exactly once");

        if fill > 0 {
            state.unclaimed_allocations += 1;
        }
        if refund > 0 {
            state.unclaimed_refunds += 1;
        }

        state.allocation_cursor += 1;
        processed += 1;
    }

    if state.allocation_cursor == state.ranking.len() && state.phase == AuctionPhase::Resolved {
        state.phase = AuctionPhase::Distributing;
        state.maybe_close();
    }

    FinalizationProgress {
        processed,
        cursor: state.allocation_cursor,
        total: state.ranking.len(),
        phase: state.phase,
    }
}
