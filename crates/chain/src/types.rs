//! RPC-compatible types for the mock chain.
//!
//! JSON-friendly mirrors of the core auction types: addresses and handles
//! travel hex-encoded, everything else as plain numbers.

use serde::{Deserialize, Serialize};

use clearbid_types::{Address, Amount, Bid, BidId, BidStatus, CiphertextHandle, Price, Quantity};

/// Block info response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockInfo {
    pub height: u64,
    pub timestamp: u64,
}

/// Handle pair minted for one bid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedBidRpc {
    /// Hex-encoded quantity handle (32 bytes)
    pub quantity_handle: String,
    /// Hex-encoded price handle (32 bytes)
    pub price_handle: String,
}

/// Parameters for submitting a bid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitBidParams {
    pub sender: String,
    /// Hex-encoded quantity handle (32 bytes)
    pub quantity_handle: String,
    /// Hex-encoded price handle (32 bytes)
    pub price_handle: String,
    /// Hex-encoded input proof
    pub proof: String,
}

/// Response to a bid submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitBidResponse {
    pub bid_id: BidId,
    /// Correlation id of the reveal request now outstanding.
    pub request_id: u64,
}

/// Bid record for RPC responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidRpc {
    pub id: BidId,
    pub bidder: String,
    pub status: String,
    pub quantity: Option<Quantity>,
    pub price: Option<Price>,
    pub required_payment: Option<Amount>,
    pub allocation: Option<Quantity>,
    pub refund_due: Option<Amount>,
    pub allocation_claimed: bool,
    pub refund_claimed: bool,
    pub submitted_at: u64,
}

impl From<&Bid> for BidRpc {
    fn from(bid: &Bid) -> Self {
        let status = match bid.status {
            BidStatus::AwaitingReveal => "awaiting_reveal",
            BidStatus::Revealed(_) => "revealed",
            BidStatus::Confirmed(_) => "confirmed",
            BidStatus::Cancelled => "cancelled",
        }
        .to_string();
        let terms = bid.terms();

        Self {
            id: bid.id,
            bidder: hex::encode(bid.bidder),
            status,
            quantity: terms.map(|t| t.quantity),
            price: terms.map(|t| t.price),
            required_payment: terms.map(|t| t.required_payment),
            allocation: bid.allocation,
            refund_due: bid.refund_due,
            allocation_claimed: bid.allocation_claimed,
            refund_claimed: bid.refund_claimed,
            submitted_at: bid.submitted_at,
        }
    }
}

/// Progress of a batched walk, shared by resolve and finalize responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchProgressRpc {
    pub processed: usize,
    pub cursor: usize,
    pub total: usize,
    pub phase: String,
    pub clearing_price: Option<Price>,
}

/// Render an auction phase the way the RPC surface spells it.
pub fn phase_name(phase: clearbid_types::AuctionPhase) -> String {
    use clearbid_types::AuctionPhase::*;
    match phase {
        Open => "open",
        AwaitingResolution => "awaiting_resolution",
        Resolving => "resolving",
        Resolved => "resolved",
        Distributing => "distributing",
        Closed => "closed",
    }
    .to_string()
}

/// Parse a hex-encoded 32-byte address.
pub fn parse_address(input: &str) -> Result<Address, String> {
    let bytes = hex::decode(input).map_err(|e| format!("invalid hex address: {e}"))?;
    let array: Address = bytes
        .try_into()
        .map_err(|_| "address must be 32 bytes".to_string())?;
    Ok(array)
}

/// Parse a hex-encoded 32-byte ciphertext handle.
pub fn parse_handle(input: &str) -> Result<CiphertextHandle, String> {
    let bytes = hex::decode(input).map_err(|e| format!("invalid hex handle: {e}"))?;
    let array: [u8; 32] = bytes
        .try_into()
        .map_err(|_| "handle must be 32 bytes".to_string())?;
    Ok(CiphertextHandle(array))
}
