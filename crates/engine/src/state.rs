//! Engine state: the auction aggregate root and the bid ledger.
//!
//! All bid records are owned here and mutated only through the transition
//! methods below; each method enforces the lifecycle guards, so illegal
//! transitions are rejected rather than silently applied.

use std::collections::{BTreeSet, HashMap};

use clearbid_types::{
    Address, Amount, AuctionPhase, Bid, BidId, BidStatus, BidTerms, CiphertextHandle, Price,
    Quantity,
};

use crate::error::AuctionError;
use crate::genesis::AuctionGenesisConfig;
use crate::resolution::RankKey;
use crate::reveal::RevealCorrelator;

/// Authoritative auction state. One instance per deployment.
#[derive(Debug)]
pub struct EngineState {
    /// Immutable parameters fixed at genesis.
    pub config: AuctionGenesisConfig,

    pub(crate) phase: AuctionPhase,
    pub(crate) clearing_price: Option<Price>,

    /// Bid arena; a bid's id is its index.
    pub(crate) bids: Vec<Bid>,
    pub(crate) bids_by_bidder: HashMap<Address, Vec<BidId>>,

    /// Outstanding reveal requests.
    pub correlator: RevealCorrelator,

    /// Confirmed bids ordered by descending price, ascending id. Populated
    /// at confirmation time; frozen into `ranking` when resolution starts.
    pub(crate) book: BTreeSet<RankKey>,
    pub(crate) ranking: Vec<BidId>,

    pub(crate) resolution_cursor: usize,
    pub(crate) resolution_remaining: Quantity,
    pub(crate) marginal_price: Option<Price>,
    pub(crate) last_price: Option<Price>,

    pub(crate) allocation_cursor: usize,
    pub(crate) finalize_remaining: Quantity,

    pub(crate) total_allocated: Quantity,
    pub(crate) proceeds_claimed: bool,

    /// Escrow currency currently retained: the sum of `required_payment`
    /// over confirmed bids minus refunds and proceeds already paid out.
    pub(crate) escrow_held: Amount,

    pub(crate) unclaimed_allocations: u64,
    pub(crate) unclaimed_refunds: u64,
}

impl EngineState {
    pub fn new(config: AuctionGenesisConfig) -> Self {
        let supply = config.total_supply;
        Self {
            config,
            phase: AuctionPhase::Open,
            clearing_price: None,
            bids: Vec::new(),
            bids_by_bidder: HashMap::new(),
            correlator: RevealCorrelator::new(),
            book: BTreeSet::new(),
            ranking: Vec::new(),
            resolution_cursor: 0,
            resolution_remaining: supply,
            marginal_price: None,
            last_price: None,
            allocation_cursor: 0,
            finalize_remaining: supply,
            total_allocated: 0,
            proceeds_claimed: false,
            escrow_held: 0,
            unclaimed_allocations: 0,
            unclaimed_refunds: 0,
        }
    }

    // =========================
    // READ ACCESS
    // =========================

    pub fn phase(&self) -> AuctionPhase {
        self.phase
    }

    pub fn clearing_price(&self) -> Option<Price> {
        self.clearing_price
    }

    pub fn total_allocated(&self) -> Quantity {
        self.total_allocated
    }

    pub fn escrow_held(&self) -> Amount {
        self.escrow_held
    }

    pub fn proceeds_claimed(&self) -> bool {
        self.proceeds_claimed
    }

    pub fn bid_count(&self) -> u64 {
        self.bids.len() as u64
    }

    /// Number of confirmed, ranked-or-rankable bids.
    pub fn confirmed_count(&self) -> usize {
        if self.phase >= AuctionPhase::AwaitingResolution {
            self.ranking.len()
        } else {
            self.book.len()
        }
    }

    pub fn next_bid_id(&self) -> BidId {
        self.bids.len() as BidId
    }

    pub fn bid(&self, bid_id: BidId) -> Result<&Bid, AuctionError> {
        self.bids
            .get(bid_id as usize)
            .ok_or(AuctionError::NotFound(bid_id))
    }

    pub fn bids_of(&self, bidder: &Address) -> Vec<BidId> {
        self.bids_by_bidder.get(bidder).cloned().unwrap_or_default()
    }

    pub(crate) fn bid_mut(&mut self, bid_id: BidId) -> Result<&mut Bid, AuctionError> {
        self.bids
            .get_mut(bid_id as usize)
            .ok_or(AuctionError::NotFound(bid_id))
    }

    // =========================
    // BID LEDGER TRANSITIONS
    // =========================

    /// Create a bid record. Only while the auction is open.
    pub fn create_bid(
        &mut self,
        bidder: Address,
        quantity_handle: CiphertextHandle,
        price_handle: CiphertextHandle,
        submitted_at: u64,
    ) -> Result<BidId, AuctionError> {
        if self.phase != AuctionPhase::Open {
            return Err(AuctionError::InvalidState("auction is not open"));
        }

        let bid_id = self.next_bid_id();
        self.bids.push(Bid {
            id: bid_id,
            bidder,
            quantity_handle,
            price_handle,
            submitted_at,
            status: BidStatus::AwaitingReveal,
            allocation: None,
            refund_due: None,
            allocation_claimed: false,
            refund_claimed: false,
        });
        self.bids_by_bidder.entry(bidder).or_default().push(bid_id);

        Ok(bid_id)
    }

    /// Write revealed plaintexts into a bid. Returns the derived required
    /// payment.
    pub fn mark_revealed(
        &mut self,
        bid_id: BidId,
        quantity: Quantity,
        price: Price,
    ) -> Result<Amount, AuctionError> {
        let bid = self.bid_mut(bid_id)?;
        match bid.status {
            BidStatus::AwaitingReveal => {
                let terms = BidTerms::new(quantity, price);
                let required = terms.required_payment;
                bid.status = BidStatus::Revealed(terms);
                Ok(required)
            }
            BidStatus::Revealed(_) | BidStatus::Confirmed(_) => {
                Err(AuctionError::InvalidState("bid already revealed"))
            }
            BidStatus::Cancelled => Err(AuctionError::InvalidState("bid is cancelled")),
        }
    }

    /// Confirm a revealed bid: retain its required payment in escrow and
    /// enter it into the ranking book.
    pub fn mark_confirmed(&mut self, bid_id: BidId) -> Result<(), AuctionError> {
        let bid = self.bid_mut(bid_id)?;
        let terms = match &bid.status {
            BidStatus::Revealed(terms) => terms.clone(),
            BidStatus::AwaitingReveal => {
                return Err(AuctionError::InvalidState("bid not yet revealed"))
            }
            BidStatus::Confirmed(_) => {
                return Err(AuctionError::InvalidState("bid already confirmed"))
            }
            BidStatus::Cancelled => return Err(AuctionError::InvalidState("bid is cancelled")),
        };

        let key = RankKey {
            price: terms.price,
            id: bid_id,
        };
        let required = terms.required_payment;
        bid.status = BidStatus::Confirmed(terms);

        self.escrow_held += required;
        self.book.insert(key);
        Ok(())
    }

    /// Cancel a bid. Only before confirmation; terminal.
    pub fn mark_cancelled(&mut self, bid_id: BidId) -> Result<(), AuctionError> {
        let bid = self.bid_mut(bid_id)?;
        match bid.status {
            BidStatus::AwaitingReveal | BidStatus::Revealed(_) => {
                bid.status = BidStatus::Cancelled;
                self.correlator.release(bid_id);
                Ok(())
            }
            BidStatus::Confirmed(_) => Err(AuctionError::InvalidState(
                "confirmed bid cannot be cancelled",
            )),
            BidStatus::Cancelled => Err(AuctionError::InvalidState("bid already cancelled")),
        }
    }

    /// Finalize a bid's allocation and refund. Written exactly once.
    pub(crate) fn set_allocation(
        &mut self,
        bid_id: BidId,
        allocation: Quantity,
        refund_due: Amount,
    ) -> Result<(), AuctionError> {
        let bid = self.bid_mut(bid_id)?;
        if bid.allocation.is_some() {
            return Err(AuctionError::InvalidState("allocation already set"));
        }
        bid.allocation = Some(allocation);
        bid.refund_due = Some(refund_due);
        Ok(())
    }

    /// Settle the allocation claim. At most once per bid.
    pub(crate) fn set_allocation_claimed(&mut self, bid_id: BidId) -> Result<(), AuctionError> {
        let bid = self.bid_mut(bid_id)?;
        if bid.allocation_claimed {
            return Err(AuctionError::AlreadySettled);
        }
        bid.allocation_claimed = true;
        Ok(())
    }

    /// Settle the refund claim. At most once per bid.
    pub(crate) fn set_refund_claimed(&mut self, bid_id: BidId) -> Result<(), AuctionError> {
        let bid = self.bid_mut(bid_id)?;
        if bid.refund_claimed {
            return Err(AuctionError::AlreadySettled);
        }
        bid.refund_claimed = true;
        Ok(())
    }

    /// Close the auction once proceeds and every finalized claim settled.
    pub(crate) fn maybe_close(&mut self) {
        if self.phase == AuctionPhase::Distributing
            && self.proceeds_claimed
            && self.unclaimed_allocations == 0
            && self.unclaimed_refunds == 0
        {
            self.phase = AuctionPhase::Closed;
        }
    }
}
