//! Decryption correlator.
//!
//! Tracks outstanding reveal requests and matches asynchronous callback
//! results back to the bid that requested them. The correlator assigns the
//! correlation id itself; the confidential-computation service echoes it
//! back when delivering plaintexts. It holds only back-references (bid
//! ids), never bid state.

use std::collections::{HashMap, HashSet};

use clearbid_types::{BidId, CiphertextHandle, RequestId, RevealRequest};

use crate::error::AuctionError;

/// Pending-request table keyed by correlation id.
#[derive(Debug, Default)]
pub struct RevealCorrelator {
    next_request_id: RequestId,
    /// Outstanding requests awaiting a callback.
    pending: HashMap<RequestId, BidId>,
    /// Reverse index, one outstanding request per bid at most.
    pending_by_bid: HashMap<BidId, RequestId>,
    /// Bids whose reveal has already been delivered.
    satisfied_bids: HashSet<BidId>,
}

impl RevealCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a reveal request for a bid. Fails if a request for that bid
    /// is already pending or already satisfied.
    pub fn issue(
        &mut self,
        bid_id: BidId,
        handles: Vec<CiphertextHandle>,
    ) -> Result<RevealRequest, AuctionError> {
        if self.pending_by_bid.contains_key(&bid_id) {
            return Err(AuctionError::InvalidState("reveal already pending for bid"));
        }
        if self.satisfied_bids.contains(&bid_id) {
            return Err(AuctionError::InvalidState("bid already revealed"));
        }

        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.pending.insert(request_id, bid_id);
        self.pending_by_bid.insert(bid_id, request_id);

        Ok(RevealRequest {
            request_id,
            bid_id,
            handles,
        })
    }

    /// Consume a pending request on callback delivery. Returns the bid the
    /// request correlates to, or `None` for unknown, redelivered, or
    /// released request ids; those deliveries are ignored, not errors.
    pub fn settle(&mut self, request_id: RequestId) -> Option<BidId> {
        let bid_id = self.pending.remove(&request_id)?;
        self.pending_by_bid.remove(&bid_id);
        self.satisfied_bids.insert(bid_id);
        Some(bid_id)
    }

    /// Forget the pending request for a cancelled bid. A callback arriving
    /// afterwards no longer correlates and is ignored.
    pub fn release(&mut self, bid_id: BidId) {
        if let Some(request_id) = self.pending_by_bid.remove(&bid_id) {
            self.pending.remove(&request_id);
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, request_id: RequestId) -> bool {
        self.pending.contains_key(&request_id)
    }
}
