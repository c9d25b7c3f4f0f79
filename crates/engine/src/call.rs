//! Call message types for the auction engine.

use borsh::{BorshDeserialize, BorshSerialize};

use clearbid_types::{BidId, CiphertextHandle, InputProof};

/// State-changing calls accepted by the engine.
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize)]
pub enum AuctionCall {
    /// Submit an opaque bid; plaintext terms stay hidden until the reveal
    /// callback delivers them.
    SubmitBid {
        quantity_handle: CiphertextHandle,
        price_handle: CiphertextHandle,
        proof: InputProof,
    },

    /// Post exactly the revealed required payment (surplus is returned in
    /// the same call) and enter the bid into the ranking.
    ConfirmBid { bid_id: BidId },

    /// Withdraw a bid before confirmation.
    CancelBid { bid_id: BidId },

    /// Drive the resolution walk forward (permissionless, batched).
    ResolveAuction { batch_size: u64 },

    /// Drive the finalization walk forward (permissionless, batched).
    FinalizeAllocations { batch_size: u64 },

    /// Claim won asset units after finalization.
    ClaimAllocation { bid_id: BidId },

    /// Claim unspent escrow after finalization.
    ClaimRefund { bid_id: BidId },

    /// Claim sale proceeds (owner only).
    ClaimProceeds,
}
