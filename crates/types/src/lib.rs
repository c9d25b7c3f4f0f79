//! Core type definitions for the sealed-bid clearing auction.
//!
//! This crate provides the shared data structures used across the auction
//! system: identifiers and amounts, opaque ciphertext handles, the bid
//! lifecycle state machine, auction phases, and the effect types returned
//! by engine entry points.

use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

// =========================
// IDENTIFIERS & AMOUNTS
// =========================

/// Generic address type (32 bytes)
pub type Address = [u8; 32];

/// Stable bid identifier, assigned at submission. Defines tie-break order.
pub type BidId = u64;

/// Correlation id for an outstanding reveal request.
pub type RequestId = u64;

/// Asset units requested or allocated.
pub type Quantity = u64;

/// Escrow currency per asset unit.
pub type Price = u64;

/// Escrow currency total. `Quantity * Price` always fits.
pub type Amount = u128;

// =========================
// CONFIDENTIAL INPUTS
// =========================

/// Opaque handle to an encrypted value held by the confidential-computation
/// service. The engine never sees plaintext until the reveal callback.
#[serde_as]
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct CiphertextHandle(#[serde_as(as = "[_; 32]")] pub [u8; 32]);

impl CiphertextHandle {
    /// Derive a fresh handle from its owner and a service-side nonce.
    pub fn derive(owner: &Address, nonce: u64) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(b"CLEARBID_HANDLE_V1:");
        hasher.update(owner);
        hasher.update(nonce.to_le_bytes());
        Self(hasher.finalize().into())
    }
}

impl fmt::Debug for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CiphertextHandle({})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Opaque proof binding encrypted inputs to their submitter. Verified by
/// the confidential-computation service, carried through by the engine.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct InputProof(pub Vec<u8>);

impl InputProof {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// =========================
// BID LIFECYCLE
// =========================

/// Plaintext terms of a bid, known only after the reveal callback.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct BidTerms {
    /// Asset units requested.
    pub quantity: Quantity,
    /// Escrow currency offered per unit.
    pub price: Price,
    /// `quantity * price`, the deposit the bidder must post to confirm.
    pub required_payment: Amount,
}

impl BidTerms {
    pub fn new(quantity: Quantity, price: Price) -> Self {
        Self {
            quantity,
            price,
            required_payment: quantity as Amount * price as Amount,
        }
    }
}

/// Bid lifecycle as an explicit state machine. `Confirmed` carries the
/// revealed terms, so a confirmed-but-unrevealed bid is unrepresentable,
/// and no transition out of `Cancelled` exists.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum BidStatus {
    /// Submitted; plaintext not yet delivered by the reveal service.
    AwaitingReveal,
    /// Plaintext known; deposit not yet posted.
    Revealed(BidTerms),
    /// Deposit of exactly `required_payment` retained in escrow.
    Confirmed(BidTerms),
    /// Withdrawn before confirmation. Terminal.
    Cancelled,
}

/// A single bid record. Owned exclusively by the bid ledger.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Bid {
    pub id: BidId,
    pub bidder: Address,
    pub quantity_handle: CiphertextHandle,
    pub price_handle: CiphertextHandle,
    /// Timestamp of submission.
    pub submitted_at: u64,
    pub status: BidStatus,
    /// Final allocation, written exactly once during finalization.
    pub allocation: Option<Quantity>,
    /// Refund owed, written together with `allocation`.
    pub refund_due: Option<Amount>,
    pub allocation_claimed: bool,
    pub refund_claimed: bool,
}

impl Bid {
    /// Revealed terms, if the reveal callback has been applied.
    pub fn terms(&self) -> Option<&BidTerms> {
        match &self.status {
            BidStatus::Revealed(terms) | BidStatus::Confirmed(terms) => Some(terms),
            BidStatus::AwaitingReveal | BidStatus::Cancelled => None,
        }
    }

    pub fn is_revealed(&self) -> bool {
        matches!(
            self.status,
            BidStatus::Revealed(_) | BidStatus::Confirmed(_)
        )
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self.status, BidStatus::Confirmed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.status, BidStatus::Cancelled)
    }
}

// =========================
// AUCTION PHASES
// =========================

/// Auction lifecycle phase. Ordered: comparisons like
/// `phase >= AuctionPhase::Resolved` follow declaration order.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub enum AuctionPhase {
    /// Accepting submissions, reveals, confirmations and cancellations.
    Open,
    /// Deadline passed, resolution triggered, ranking frozen.
    AwaitingResolution,
    /// Greedy allocation walk in progress.
    Resolving,
    /// Clearing price fixed; finalization may proceed.
    Resolved,
    /// Per-bid allocations finalized; claims in flight.
    Distributing,
    /// Proceeds and all finalized claims settled. Terminal.
    Closed,
}

/// Descriptive metadata for the asset being sold.
#[derive(Clone, Debug, Default, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct AssetMetadata {
    pub name: String,
    pub symbol: String,
}

// =========================
// ENGINE EFFECTS
// =========================

/// What a value transfer settles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum TransferKind {
    /// Escrow currency returned to a bidder.
    EscrowRefund,
    /// Asset units delivered to a winning bidder.
    AssetPayout,
    /// Escrow currency paid out to the auction owner.
    Proceeds,
}

/// A value movement requested by an entry point. The runtime applies these
/// strictly after the state mutation has committed.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Transfer {
    pub to: Address,
    /// Escrow currency for refunds/proceeds, asset units for payouts.
    pub amount: Amount,
    pub kind: TransferKind,
}

impl Transfer {
    pub fn escrow_refund(to: Address, amount: Amount) -> Self {
        Self {
            to,
            amount,
            kind: TransferKind::EscrowRefund,
        }
    }

    pub fn asset_payout(to: Address, quantity: Quantity) -> Self {
        Self {
            to,
            amount: quantity as Amount,
            kind: TransferKind::AssetPayout,
        }
    }

    pub fn proceeds(to: Address, amount: Amount) -> Self {
        Self {
            to,
            amount,
            kind: TransferKind::Proceeds,
        }
    }
}

/// A reveal request issued at submission, forwarded to the
/// confidential-computation service by the runtime. The service echoes
/// `request_id` back in its callback.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct RevealRequest {
    pub request_id: RequestId,
    pub bid_id: BidId,
    pub handles: Vec<CiphertextHandle>,
}
