//! Deterministic runtime around the engine.
//!
//! Simulates the execution environment the engine assumes:
//! atomic calls in a single total order, a currency bank and an asset
//! ledger for custody, and the gateway standing in for the external
//! reveal service. Every value transfer requested by a handler is applied
//! here, strictly after the engine state change has committed.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, info};

use clearbid_engine::{
    handlers, queries, AuctionError, AuctionGenesisConfig, AuctionSummary, CallContext,
    EngineState, FinalizationProgress, ResolutionProgress, RevealOutcome, SubmitOutcome,
};
use clearbid_gateway::{GatewayError, MockGateway};
use clearbid_types::{
    Address, Amount, Bid, BidId, CiphertextHandle, InputProof, Quantity, Transfer, TransferKind,
};

/// Ledger address holding everything escrowed by the auction.
pub const AUCTION_ADDRESS: Address = [0xEE; 32];

/// Seconds per simulated block.
const BLOCK_TIME: u64 = 12;

/// Errors surfaced by the runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Auction(#[from] AuctionError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Payer balance below the attached value.
    #[error("insufficient funds: balance {balance}, needed {needed}")]
    InsufficientFunds { balance: Amount, needed: Amount },

    /// Submission referenced a handle the gateway never minted.
    #[error("unknown ciphertext handle")]
    UnknownHandle,
}

/// Currency balances. Transfers fail loudly, never partially.
#[derive(Debug, Default)]
pub struct Bank {
    balances: HashMap<Address, Amount>,
}

impl Bank {
    pub fn mint(&mut self, to: Address, amount: Amount) {
        *self.balances.entry(to).or_insert(0) += amount;
    }

    pub fn balance(&self, address: &Address) -> Amount {
        self.balances.get(address).copied().unwrap_or(0)
    }

    pub fn transfer(
        &mut self,
        from: &Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), RuntimeError> {
        let balance = self.balance(from);
        if balance < amount {
            return Err(RuntimeError::InsufficientFunds {
                balance,
                needed: amount,
            });
        }
        *self.balances.entry(*from).or_insert(0) -= amount;
        *self.balances.entry(to).or_insert(0) += amount;
        Ok(())
    }
}

/// Fungible-asset balances; the auction holds the full supply at genesis.
#[derive(Debug, Default)]
pub struct AssetLedger {
    balances: HashMap<Address, Quantity>,
}

impl AssetLedger {
    pub fn mint(&mut self, to: Address, amount: Quantity) {
        *self.balances.entry(to).or_insert(0) += amount;
    }

    pub fn balance(&self, address: &Address) -> Quantity {
        self.balances.get(address).copied().unwrap_or(0)
    }

    pub fn transfer(
        &mut self,
        from: &Address,
        to: Address,
        amount: Quantity,
    ) -> Result<(), RuntimeError> {
        let balance = self.balance(from);
        if balance < amount {
            return Err(RuntimeError::InsufficientFunds {
                balance: balance as Amount,
                needed: amount as Amount,
            });
        }
        *self.balances.entry(*from).or_insert(0) -= amount;
        *self.balances.entry(to).or_insert(0) += amount;
        Ok(())
    }
}

/// Shared chain state: engine, custody ledgers, gateway, simulated clock.
#[derive(Debug)]
pub struct ChainState {
    pub engine: EngineState,
    pub gateway: MockGateway,
    pub bank: Bank,
    pub assets: AssetLedger,
    pub block_height: u64,
    pub timestamp: u64,
}

impl ChainState {
    pub fn new(genesis: AuctionGenesisConfig, initial_timestamp: u64) -> Self {
        let supply = genesis.total_supply;
        let mut assets = AssetLedger::default();
        assets.mint(AUCTION_ADDRESS, supply);

        Self {
            engine: EngineState::new(genesis),
            gateway: MockGateway::new(),
            bank: Bank::default(),
            assets,
            block_height: 0,
            timestamp: initial_timestamp,
        }
    }

    pub fn advance_block(&mut self) {
        self.block_height += 1;
        self.timestamp += BLOCK_TIME;
    }

    pub fn set_timestamp(&mut self, timestamp: u64) {
        self.timestamp = timestamp;
    }

    fn ctx(&self, sender: Address, value: Amount) -> CallContext {
        CallContext {
            sender,
            block_height: self.block_height,
            timestamp: self.timestamp,
            value,
        }
    }

    fn apply(&mut self, transfer: &Transfer) -> Result<(), RuntimeError> {
        match transfer.kind {
            TransferKind::EscrowRefund | TransferKind::Proceeds => {
                self.bank
                    .transfer(&AUCTION_ADDRESS, transfer.to, transfer.amount)
            }
            TransferKind::AssetPayout => {
                self.assets
                    .transfer(&AUCTION_ADDRESS, transfer.to, transfer.amount as Quantity)
            }
        }
    }

    /// Submit an opaque bid and forward its reveal request to the gateway.
    pub fn submit_bid(
        &mut self,
        sender: Address,
        quantity_handle: CiphertextHandle,
        price_handle: CiphertextHandle,
        proof: InputProof,
    ) -> Result<SubmitOutcome, RuntimeError> {
        // The real service rejects unbound handles at submission; checked
        // up front so the engine never records a bid it can't reveal.
        if !self.gateway.knows(&quantity_handle) || !self.gateway.knows(&price_handle) {
            return Err(RuntimeError::UnknownHandle);
        }

        let ctx = self.ctx(sender, 0);
        let outcome = handlers::handle_submit_bid(
            &mut self.engine,
            &ctx,
            quantity_handle,
            price_handle,
            proof,
        )?;
        self.gateway.accept(&outcome.reveal)?;

        info!(
            bid_id = outcome.bid_id,
            bidder = hex::encode(sender),
            "bid submitted"
        );
        Ok(outcome)
    }

    /// Deliver all pending reveal callbacks. Returns how many were applied.
    pub fn flush_reveals(&mut self) -> usize {
        let ChainState {
            engine, gateway, ..
        } = self;

        let mut applied = 0;
        gateway.flush(|request_id, plaintexts| {
            match handlers::handle_reveal_callback(engine, request_id, plaintexts) {
                Ok(RevealOutcome::Applied { bid_id, .. }) => {
                    debug!(request_id, bid_id, "reveal applied");
                    applied += 1;
                }
                Ok(RevealOutcome::Ignored) => {
                    debug!(request_id, "reveal ignored");
                }
                Err(err) => {
                    debug!(request_id, %err, "reveal rejected");
                }
            }
        });
        applied
    }

    /// Confirm a bid with `value` attached. Moves the deposit into escrow
    /// and pays any surplus straight back.
    pub fn confirm_bid(
        &mut self,
        sender: Address,
        bid_id: BidId,
        value: Amount,
    ) -> Result<(), RuntimeError> {
        let balance = self.bank.balance(&sender);
        if balance < value {
            return Err(RuntimeError::InsufficientFunds {
                balance,
                needed: value,
            });
        }

        let ctx = self.ctx(sender, value);
        let surplus = handlers::handle_confirm_bid(&mut self.engine, &ctx, bid_id)?;

        self.bank.transfer(&sender, AUCTION_ADDRESS, value)?;
        if let Some(transfer) = surplus {
            self.apply(&transfer)?;
        }
        info!(bid_id, bidder = hex::encode(sender), "bid confirmed");
        Ok(())
    }

    pub fn cancel_bid(&mut self, sender: Address, bid_id: BidId) -> Result<(), RuntimeError> {
        let ctx = self.ctx(sender, 0);
        handlers::handle_cancel_bid(&mut self.engine, &ctx, bid_id)?;
        info!(bid_id, "bid cancelled");
        Ok(())
    }

    pub fn resolve(
        &mut self,
        sender: Address,
        batch_size: u64,
    ) -> Result<ResolutionProgress, RuntimeError> {
        let ctx = self.ctx(sender, 0);
        let progress = handlers::handle_resolve_auction(&mut self.engine, &ctx, batch_size)?;
        debug!(
            cursor = progress.cursor,
            total = progress.total,
            phase = ?progress.phase,
            "resolution advanced"
        );
        Ok(progress)
    }

    pub fn finalize(
        &mut self,
        sender: Address,
        batch_size: u64,
    ) -> Result<FinalizationProgress, RuntimeError> {
        let ctx = self.ctx(sender, 0);
        let progress = handlers::handle_finalize_allocations(&mut self.engine, &ctx, batch_size)?;
        debug!(
            cursor = progress.cursor,
            total = progress.total,
            phase = ?progress.phase,
            "finalization advanced"
        );
        Ok(progress)
    }

    pub fn claim_allocation(
        &mut self,
        sender: Address,
        bid_id: BidId,
    ) -> Result<Quantity, RuntimeError> {
        let ctx = self.ctx(sender, 0);
        let transfer = handlers::handle_claim_allocation(&mut self.engine, &ctx, bid_id)?;
        self.apply(&transfer)?;
        info!(bid_id, amount = transfer.amount, "allocation claimed");
        Ok(transfer.amount as Quantity)
    }

    pub fn claim_refund(
        &mut self,
        sender: Address,
        bid_id: BidId,
    ) -> Result<Amount, RuntimeError> {
        let ctx = self.ctx(sender, 0);
        let transfer = handlers::handle_claim_refund(&mut self.engine, &ctx, bid_id)?;
        self.apply(&transfer)?;
        info!(bid_id, amount = transfer.amount, "refund claimed");
        Ok(transfer.amount)
    }

    pub fn claim_proceeds(&mut self, sender: Address) -> Result<Amount, RuntimeError> {
        let ctx = self.ctx(sender, 0);
        let transfer = handlers::handle_claim_proceeds(&mut self.engine, &ctx)?;
        self.apply(&transfer)?;
        info!(amount = transfer.amount, "proceeds claimed");
        Ok(transfer.amount)
    }

    // Read side.

    pub fn bid(&self, bid_id: BidId) -> Option<Bid> {
        self.engine.bid(bid_id).ok().cloned()
    }

    pub fn bids_of(&self, bidder: &Address) -> Vec<BidId> {
        self.engine.bids_of(bidder)
    }

    pub fn summary(&self) -> AuctionSummary {
        queries::summarize(&self.engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genesis(total_supply: Quantity, deadline: u64) -> AuctionGenesisConfig {
        let mut config = AuctionGenesisConfig::default();
        config.owner = [0xAA; 32];
        config.total_supply = total_supply;
        config.deadline = deadline;
        config
    }

    #[test]
    fn test_auction_holds_supply_at_genesis() {
        let chain = ChainState::new(genesis(1_000_000, 1_000), 0);
        assert_eq!(chain.assets.balance(&AUCTION_ADDRESS), 1_000_000);
        assert_eq!(chain.bank.balance(&AUCTION_ADDRESS), 0);
    }

    #[test]
    fn test_submit_rejects_foreign_handles() {
        let mut chain = ChainState::new(genesis(1_000, 1_000), 0);
        let bidder = [1u8; 32];
        let foreign = CiphertextHandle::derive(&bidder, 99);
        let result = chain.submit_bid(bidder, foreign, foreign, InputProof(vec![1]));
        assert!(matches!(result, Err(RuntimeError::UnknownHandle)));
        assert_eq!(chain.engine.bid_count(), 0);
    }

    #[test]
    fn test_confirm_moves_deposit_and_returns_surplus() {
        let mut chain = ChainState::new(genesis(1_000_000, 1_000), 0);
        let bidder = [1u8; 32];
        chain.bank.mint(bidder, 2_000_000_000);

        let (qh, ph) = chain.gateway.encrypt_bid(&bidder, 100_000, 10_000);
        let outcome = chain
            .submit_bid(bidder, qh, ph, InputProof(vec![1]))
            .unwrap();
        assert_eq!(chain.flush_reveals(), 1);

        // Deposit more than required; the surplus comes straight back.
        chain
            .confirm_bid(bidder, outcome.bid_id, 1_000_000_000 + 500)
            .unwrap();
        assert_eq!(chain.bank.balance(&AUCTION_ADDRESS), 1_000_000_000);
        assert_eq!(chain.bank.balance(&bidder), 1_000_000_000 + 500);
    }

    #[test]
    fn test_confirm_without_funds_fails_loudly() {
        let mut chain = ChainState::new(genesis(1_000_000, 1_000), 0);
        let bidder = [1u8; 32];
        let (qh, ph) = chain.gateway.encrypt_bid(&bidder, 100, 10);
        let outcome = chain
            .submit_bid(bidder, qh, ph, InputProof(vec![1]))
            .unwrap();
        chain.flush_reveals();

        let result = chain.confirm_bid(bidder, outcome.bid_id, 1_000);
        assert!(matches!(result, Err(RuntimeError::InsufficientFunds { .. })));
        // Nothing moved, nothing confirmed.
        assert_eq!(chain.bank.balance(&AUCTION_ADDRESS), 0);
        assert!(!chain.bid(outcome.bid_id).unwrap().is_confirmed());
    }

    #[test]
    fn test_full_lifecycle_conserves_value() {
        let mut chain = ChainState::new(genesis(1_000, 1_000), 0);
        let owner = [0xAA; 32];
        let bidder = [1u8; 32];
        chain.bank.mint(bidder, 100_000);

        let (qh, ph) = chain.gateway.encrypt_bid(&bidder, 1_000, 10);
        let outcome = chain
            .submit_bid(bidder, qh, ph, InputProof(vec![1]))
            .unwrap();
        chain.flush_reveals();
        chain.confirm_bid(bidder, outcome.bid_id, 10_000).unwrap();

        chain.set_timestamp(1_001);
        chain.resolve([9u8; 32], 100).unwrap();
        chain.finalize([9u8; 32], 100).unwrap();

        assert_eq!(chain.claim_allocation(bidder, outcome.bid_id).unwrap(), 1_000);
        assert_eq!(chain.claim_proceeds(owner).unwrap(), 10_000);

        assert_eq!(chain.assets.balance(&bidder), 1_000);
        assert_eq!(chain.assets.balance(&AUCTION_ADDRESS), 0);
        assert_eq!(chain.bank.balance(&owner), 10_000);
        assert_eq!(chain.bank.balance(&AUCTION_ADDRESS), 0);
        assert_eq!(chain.bank.balance(&bidder), 90_000);
    }
}
