//! Call handlers for the auction engine.
//!
//! Each entry point validates against the current auction and bid state,
//! applies its mutation, and only then reports any value movement as a
//! [`Transfer`] effect for the runtime to execute. A rejected call commits
//! nothing; a successful call never performs the transfer itself, so no
//! callee can observe half-updated cursors or claim twice.

use clearbid_types::{
    Address, Amount, AuctionPhase, BidId, BidStatus, CiphertextHandle, InputProof, RequestId,
    RevealRequest, Transfer,
};

use crate::distribution::{self, FinalizationProgress};
use crate::error::AuctionError;
use crate::resolution::{self, ResolutionProgress};
use crate::state::EngineState;

/// Context provided by the runtime for each call.
pub struct CallContext {
    /// Sender of the transaction.
    pub sender: Address,
    /// Current block height.
    pub block_height: u64,
    /// Current timestamp.
    pub timestamp: u64,
    /// Escrow currency attached to the call (for deposits).
    pub value: Amount,
}

/// Result type for handlers.
pub type HandlerResult<T> = Result<T, AuctionError>;

/// Outcome of a successful bid submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub bid_id: BidId,
    /// Forward to the confidential-computation service.
    pub reveal: RevealRequest,
}

/// Outcome of a reveal callback delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RevealOutcome {
    /// Plaintexts written; the bid may now be confirmed against
    /// `required_payment`.
    Applied {
        bid_id: BidId,
        required_payment: Amount,
    },
    /// Stale, unknown or redelivered request id. Not an error: the service
    /// is allowed to redeliver.
    Ignored,
}

/// Handle bid submission. Records the opaque bid and issues the reveal
/// request for its two handles.
pub fn handle_submit_bid(
    state: &mut EngineState,
    ctx: &CallContext,
    quantity_handle: CiphertextHandle,
    price_handle: CiphertextHandle,
    proof: InputProof,
) -> HandlerResult<SubmitOutcome> {
    if state.phase() != AuctionPhase::Open {
        return Err(AuctionError::InvalidState("auction is not open"));
    }
    if ctx.timestamp > state.config.deadline {
        return Err(AuctionError::InvalidState("submission window closed"));
    }
    if proof.is_empty() {
        return Err(AuctionError::InvalidState("missing input proof"));
    }

    let bid_id = state.create_bid(ctx.sender, quantity_handle, price_handle, ctx.timestamp)?;
    let reveal = state
        .correlator
        .issue(bid_id, vec![quantity_handle, price_handle])?;

    Ok(SubmitOutcome { bid_id, reveal })
}

/// Handle the asynchronous reveal callback from the
/// confidential-computation service. Sole mutation entry point for
/// plaintext bid values; idempotent per request id.
pub fn handle_reveal_callback(
    state: &mut EngineState,
    request_id: RequestId,
    plaintexts: &[u64],
) -> HandlerResult<RevealOutcome> {
    if plaintexts.len() != 2 {
        return Err(AuctionError::InvalidState("malformed reveal payload"));
    }

    // Unknown ids cover redelivery and reveals for cancelled bids; both
    // are dropped without touching the ledger.
    let Some(bid_id) = state.correlator.settle(request_id) else {
        return Ok(RevealOutcome::Ignored);
    };

    let required_payment = state.mark_revealed(bid_id, plaintexts[0], plaintexts[1])?;
    Ok(RevealOutcome::Applied {
        bid_id,
        required_payment,
    })
}

/// Handle bid confirmation. Retains exactly the required payment and
/// returns any surplus to the caller in the same call.
pub fn handle_confirm_bid(
    state: &mut EngineState,
    ctx: &CallContext,
    bid_id: BidId,
) -> HandlerResult<Option<Transfer>> {
    if state.phase() != AuctionPhase::Open || ctx.timestamp > state.config.deadline {
        return Err(AuctionError::InvalidState("confirmation window closed"));
    }

    let bid = state.bid(bid_id)?;
    if bid.bidder != ctx.sender {
        return Err(AuctionError::Unauthorized);
    }
    let required = match &bid.status {
        BidStatus::Revealed(terms) => terms.required_payment,
        BidStatus::AwaitingReveal => {
            return Err(AuctionError::InvalidState("bid not yet revealed"))
        }
        BidStatus::Confirmed(_) => {
            return Err(AuctionError::InvalidState("bid already confirmed"))
        }
        BidStatus::Cancelled => return Err(AuctionError::InvalidState("bid is cancelled")),
    };
    if ctx.value < required {
        return Err(AuctionError::InsufficientPayment {
            required,
            deposited: ctx.value,
        });
    }

    state.mark_confirmed(bid_id)?;

    let surplus = ctx.value - required;
    Ok((surplus > 0).then(|| Transfer::escrow_refund(ctx.sender, surplus)))
}

/// Handle bid cancellation. Available any time before confirmation.
pub fn handle_cancel_bid(
    state: &mut EngineState,
    ctx: &CallContext,
    bid_id: BidId,
) -> HandlerResult<()> {
    let bid = state.bid(bid_id)?;
    if bid.bidder != ctx.sender {
        return Err(AuctionError::Unauthorized);
    }
    state.mark_cancelled(bid_id)
}

/// Handle one resolution batch. Anyone may drive this once the deadline
/// has passed; repeating a call is always safe.
pub fn handle_resolve_auction(
    state: &mut EngineState,
    ctx: &CallContext,
    batch_size: u64,
) -> HandlerResult<ResolutionProgress> {
    match state.phase() {
        AuctionPhase::Open => {
            if ctx.timestamp <= state.config.deadline {
                return Err(AuctionError::InvalidState("deadline not passed"));
            }
            resolution::begin(state);
        }
        AuctionPhase::AwaitingResolution | AuctionPhase::Resolving => {}
        AuctionPhase::Resolved | AuctionPhase::Distributing | AuctionPhase::Closed => {
            return Err(AuctionError::InvalidState("auction already resolved"))
        }
    }

    Ok(resolution::advance(state, batch_size as usize))
}

/// Handle one finalization batch. Requires a resolved auction; calling
/// again after completion is a no-op.
pub fn handle_finalize_allocations(
    state: &mut EngineState,
    _ctx: &CallContext,
    batch_size: u64,
) -> HandlerResult<FinalizationProgress> {
    if state.phase() < AuctionPhase::Resolved {
        return Err(AuctionError::InvalidState("auction not resolved"));
    }
    Ok(distribution::advance(state, batch_size as usize))
}

/// Handle an allocation claim: deliver the won asset units.
pub fn handle_claim_allocation(
    state: &mut EngineState,
    ctx: &CallContext,
    bid_id: BidId,
) -> HandlerResult<Transfer> {
    let bid = state.bid(bid_id)?;
    if bid.bidder != ctx.sender {
        return Err(AuctionError::Unauthorized);
    }
    let Some(allocation) = bid.allocation else {
        return Err(AuctionError::InvalidState("allocation not finalized"));
    };
    if allocation == 0 {
        return Err(AuctionError::InvalidState("no allocation to claim"));
    }
    if bid.allocation_claimed {
        return Err(AuctionError::AlreadySettled);
    }

    state.set_allocation_claimed(bid_id)?;
    state.unclaimed_allocations -= 1;
    state.maybe_close();

    Ok(Transfer::asset_payout(ctx.sender, allocation))
}

/// Handle a refund claim: return unspent escrow for a finalized bid.
pub fn handle_claim_refund(
    state: &mut EngineState,
    ctx: &CallContext,
    bid_id: BidId,
) -> HandlerResult<Transfer> {
    if state.phase() < AuctionPhase::Resolved {
        return Err(AuctionError::InvalidState("auction not resolved"));
    }

    let bid = state.bid(bid_id)?;
    if bid.bidder != ctx.sender {
        return Err(AuctionError::Unauthorized);
    }
    let Some(refund) = bid.refund_due else {
        return Err(AuctionError::InvalidState("refund not finalized"));
    };
    if refund == 0 {
        return Err(AuctionError::InvalidState("no refund to claim"));
    }
    if bid.refund_claimed {
        return Err(AuctionError::AlreadySettled);
    }

    state.set_refund_claimed(bid_id)?;
    state.escrow_held -= refund;
    state.unclaimed_refunds -= 1;
    state.maybe_close();

    Ok(Transfer::escrow_refund(ctx.sender, refund))
}

/// Handle the owner's proceeds claim: `total_allocated × clearing_price`,
/// once, any time after resolution.
pub fn handle_claim_proceeds(
    state: &mut EngineState,
    ctx: &CallContext,
) -> HandlerResult<Transfer> {
    if ctx.sender != state.config.owner {
        return Err(AuctionError::Unauthorized);
    }
    if state.phase() < AuctionPhase::Resolved {
        return Err(AuctionError::InvalidState("auction not resolved"));
    }
    if state.proceeds_claimed {
        return Err(AuctionError::AlreadySettled);
    }

    let clearing = state
        .clearing_price
        .expect("resolved auction has a clearing price");
    let amount = state.total_allocated as Amount * clearing as Amount;

    state.proceeds_claimed = true;
    state.escrow_held -= amount;
    state.maybe_close();

    Ok(Transfer::proceeds(ctx.sender, amount))
}
