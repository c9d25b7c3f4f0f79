//! JSON-RPC server for the clearbid mock chain.
//!
//! Serves the deterministic runtime over HTTP so the CLI and external
//! tooling can drive a full auction lifecycle without a real chain:
//! admin methods control the simulated clock, gateway methods stand in
//! for the client-side encryption SDK and the asynchronous reveal
//! service, auction methods map one-to-one onto engine entry points.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use jsonrpsee::core::async_trait;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::Server;
use jsonrpsee::types::ErrorObjectOwned;
use parking_lot::RwLock;
use tracing::info;

use clearbid_chain::runtime::{ChainState, RuntimeError};
use clearbid_chain::types::{
    parse_address, parse_handle, phase_name, BatchProgressRpc, BidRpc, BlockInfo, EncryptedBidRpc,
    SubmitBidParams, SubmitBidResponse,
};
use clearbid_engine::{AuctionGenesisConfig, AuctionSummary};
use clearbid_types::{AssetMetadata, InputProof};

#[derive(Parser)]
#[command(name = "clearbid-chain")]
#[command(about = "Mock chain for the clearbid sealed-bid clearing auction")]
struct Cli {
    /// Listen address for the RPC server
    #[arg(long, default_value = "127.0.0.1:9944")]
    listen: SocketAddr,

    /// Auction owner address (hex, 32 bytes)
    #[arg(long)]
    owner: String,

    /// Fixed asset supply for sale
    #[arg(long, default_value = "1000000")]
    supply: u64,

    /// Length of the submission window in simulated seconds
    #[arg(long, default_value = "604800")]
    window: u64,

    /// Asset display name
    #[arg(long, default_value = "Clearbid Asset")]
    asset_name: String,

    /// Asset ticker symbol
    #[arg(long, default_value = "CBD")]
    asset_symbol: String,
}

/// RPC API definition for the mock chain.
#[rpc(server)]
pub trait ClearbidChainApi {
    // ============ Admin Methods ============

    /// Advance the chain by one block.
    #[method(name = "admin_advanceBlock")]
    async fn admin_advance_block(&self) -> Result<BlockInfo, ErrorObjectOwned>;

    /// Set the current timestamp (for testing time-dependent logic).
    #[method(name = "admin_setTimestamp")]
    async fn admin_set_timestamp(&self, timestamp: u64) -> Result<bool, ErrorObjectOwned>;

    /// Credit escrow currency to an address.
    #[method(name = "admin_faucet")]
    async fn admin_faucet(&self, address: String, amount: u128)
        -> Result<bool, ErrorObjectOwned>;

    // ============ Gateway Methods ============

    /// Mint ciphertext handles for a (quantity, price) pair, as the
    /// client-side encryption SDK would.
    #[method(name = "gateway_encryptBid")]
    async fn gateway_encrypt_bid(
        &self,
        sender: String,
        quantity: u64,
        price: u64,
    ) -> Result<EncryptedBidRpc, ErrorObjectOwned>;

    /// Deliver all pending reveal callbacks. Returns how many applied.
    #[method(name = "gateway_flush")]
    async fn gateway_flush(&self) -> Result<u64, ErrorObjectOwned>;

    // ============ Auction Methods ============

    /// Submit an opaque bid.
    #[method(name = "auction_submitBid")]
    async fn auction_submit_bid(
        &self,
        params: SubmitBidParams,
    ) -> Result<SubmitBidResponse, ErrorObjectOwned>;

    /// Confirm a revealed bid with `value` attached.
    #[method(name = "auction_confirmBid")]
    async fn auction_confirm_bid(
        &self,
        sender: String,
        bid_id: u64,
        value: u128,
    ) -> Result<bool, ErrorObjectOwned>;

    /// Cancel an unconfirmed bid.
    #[method(name = "auction_cancelBid")]
    async fn auction_cancel_bid(
        &self,
        sender: String,
        bid_id: u64,
    ) -> Result<bool, ErrorObjectOwned>;

    /// Drive resolution forward by one batch.
    #[method(name = "auction_resolve")]
    async fn auction_resolve(&self, batch_size: u64)
        -> Result<BatchProgressRpc, ErrorObjectOwned>;

    /// Drive finalization forward by one batch.
    #[method(name = "auction_finalize")]
    async fn auction_finalize(
        &self,
        batch_size: u64,
    ) -> Result<BatchProgressRpc, ErrorObjectOwned>;

    /// Claim won asset units.
    #[method(name = "auction_claimAllocation")]
    async fn auction_claim_allocation(
        &self,
        sender: String,
        bid_id: u64,
    ) -> Result<u64, ErrorObjectOwned>;

    /// Claim unspent escrow.
    #[method(name = "auction_claimRefund")]
    async fn auction_claim_refund(
        &self,
        sender: String,
        bid_id: u64,
    ) -> Result<u128, ErrorObjectOwned>;

    /// Claim sale proceeds (owner only).
    #[method(name = "auction_claimProceeds")]
    async fn auction_claim_proceeds(&self, sender: String) -> Result<u128, ErrorObjectOwned>;

    // ============ Query Methods ============

    /// Get a bid by id.
    #[method(name = "query_bid")]
    async fn query_bid(&self, bid_id: u64) -> Result<Option<BidRpc>, ErrorObjectOwned>;

    /// Get all bid ids for a bidder.
    #[method(name = "query_bidsOf")]
    async fn query_bids_of(&self, address: String) -> Result<Vec<u64>, ErrorObjectOwned>;

    /// Get the auction summary.
    #[method(name = "query_summary")]
    async fn query_summary(&self) -> Result<AuctionSummary, ErrorObjectOwned>;

    /// Get an address's escrow currency balance.
    #[method(name = "query_balance")]
    async fn query_balance(&self, address: String) -> Result<u128, ErrorObjectOwned>;

    /// Get an address's asset balance.
    #[method(name = "query_assetBalance")]
    async fn query_asset_balance(&self, address: String) -> Result<u64, ErrorObjectOwned>;
}

struct ChainServer {
    state: Arc<RwLock<ChainState>>,
}

fn call_error(err: RuntimeError) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(-32000, err.to_string(), None::<()>)
}

fn param_error(message: String) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(-32602, message, None::<()>)
}

#[async_trait]
impl ClearbidChainApiServer for ChainServer {
    async fn admin_advance_block(&self) -> Result<BlockInfo, ErrorObjectOwned> {
        let mut state = self.state.write();
        state.advance_block();
        Ok(BlockInfo {
            height: state.block_height,
            timestamp: state.timestamp,
        })
    }

    async fn admin_set_timestamp(&self, timestamp: u64) -> Result<bool, ErrorObjectOwned> {
        self.state.write().set_timestamp(timestamp);
        Ok(true)
    }

    async fn admin_faucet(
        &self,
        address: String,
        amount: u128,
    ) -> Result<bool, ErrorObjectOwned> {
        let address = parse_address(&address).map_err(param_error)?;
        self.state.write().bank.mint(address, amount);
        Ok(true)
    }

    async fn gateway_encrypt_bid(
        &self,
        sender: String,
        quantity: u64,
        price: u64,
    ) -> Result<EncryptedBidRpc, ErrorObjectOwned> {
        let sender = parse_address(&sender).map_err(param_error)?;
        let mut state = self.state.write();
        let (quantity_handle, price_handle) = state.gateway.encrypt_bid(&sender, quantity, price);
        Ok(EncryptedBidRpc {
            quantity_handle: quantity_handle.to_string(),
            price_handle: price_handle.to_string(),
        })
    }

    async fn gateway_flush(&self) -> Result<u64, ErrorObjectOwned> {
        Ok(self.state.write().flush_reveals() as u64)
    }

    async fn auction_submit_bid(
        &self,
        params: SubmitBidParams,
    ) -> Result<SubmitBidResponse, ErrorObjectOwned> {
        let sender = parse_address(&params.sender).map_err(param_error)?;
        let quantity_handle = parse_handle(&params.quantity_handle).map_err(param_error)?;
        let price_handle = parse_handle(&params.price_handle).map_err(param_error)?;
        let proof = hex::decode(&params.proof)
            .map_err(|e| param_error(format!("invalid hex proof: {e}")))?;

        let outcome = self
            .state
            .write()
            .submit_bid(sender, quantity_handle, price_handle, InputProof(proof))
            .map_err(call_error)?;
        Ok(SubmitBidResponse {
            bid_id: outcome.bid_id,
            request_id: outcome.reveal.request_id,
        })
    }

    async fn auction_confirm_bid(
        &self,
        sender: String,
        bid_id: u64,
        value: u128,
    ) -> Result<bool, ErrorObjectOwned> {
        let sender = parse_address(&sender).map_err(param_error)?;
        self.state
            .write()
            .confirm_bid(sender, bid_id, value)
            .map_err(call_error)?;
        Ok(true)
    }

    async fn auction_cancel_bid(
        &self,
        sender: String,
        bid_id: u64,
    ) -> Result<bool, ErrorObjectOwned> {
        let sender = parse_address(&sender).map_err(param_error)?;
        self.state
            .write()
            .cancel_bid(sender, bid_id)
            .map_err(call_error)?;
        Ok(true)
    }

    async fn auction_resolve(
        &self,
        batch_size: u64,
    ) -> Result<BatchProgressRpc, ErrorObjectOwned> {
        let mut state = self.state.write();
        let caller = [0u8; 32];
        let progress = state.resolve(caller, batch_size).map_err(call_error)?;
        Ok(BatchProgressRpc {
            processed: progress.processed,
            cursor: progress.cursor,
            total: progress.total,
            phase: phase_name(progress.phase),
            clearing_price: progress.clearing_price,
        })
    }

    async fn auction_finalize(
        &self,
        batch_size: u64,
    ) -> Result<BatchProgressRpc, ErrorObjectOwned> {
        let mut state = self.state.write();
        let caller = [0u8; 32];
        let progress = state.finalize(caller, batch_size).map_err(call_error)?;
        let clearing_price = state.summary().clearing_price;
        Ok(BatchProgressRpc {
            processed: progress.processed,
            cursor: progress.cursor,
            total: progress.total,
            phase: phase_name(progress.phase),
            clearing_price,
        })
    }

    async fn auction_claim_allocation(
        &self,
        sender: String,
        bid_id: u64,
    ) -> Result<u64, ErrorObjectOwned> {
        let sender = parse_address(&sender).map_err(param_error)?;
        self.state
            .write()
            .claim_allocation(sender, bid_id)
            .map_err(call_error)
    }

    async fn auction_claim_refund(
        &self,
        sender: String,
        bid_id: u64,
    ) -> Result<u128, ErrorObjectOwned> {
        let sender = parse_address(&sender).map_err(param_error)?;
        self.state
            .write()
            .claim_refund(sender, bid_id)
            .map_err(call_error)
    }

    async fn auction_claim_proceeds(&self, sender: String) -> Result<u128, ErrorObjectOwned> {
        let sender = parse_address(&sender).map_err(param_error)?;
        self.state
            .write()
            .claim_proceeds(sender)
            .map_err(call_error)
    }

    async fn query_bid(&self, bid_id: u64) -> Result<Option<BidRpc>, ErrorObjectOwned> {
        Ok(self.state.read().bid(bid_id).map(|bid| BidRpc::from(&bid)))
    }

    async fn query_bids_of(&self, address: String) -> Result<Vec<u64>, ErrorObjectOwned> {
        let address = parse_address(&address).map_err(param_error)?;
        Ok(self.state.read().bids_of(&address))
    }

    async fn query_summary(&self) -> Result<AuctionSummary, ErrorObjectOwned> {
        Ok(self.state.read().summary())
    }

    async fn query_balance(&self, address: String) -> Result<u128, ErrorObjectOwned> {
        let address = parse_address(&address).map_err(param_error)?;
        Ok(self.state.read().bank.balance(&address))
    }

    async fn query_asset_balance(&self, address: String) -> Result<u64, ErrorObjectOwned> {
        let address = parse_address(&address).map_err(param_error)?;
        Ok(self.state.read().assets.balance(&address))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let owner = parse_address(&cli.owner).map_err(|e| anyhow::anyhow!(e))?;

    let genesis = AuctionGenesisConfig::new(
        owner,
        cli.supply,
        cli.window,
        AssetMetadata {
            name: cli.asset_name,
            symbol: cli.asset_symbol,
        },
    );
    genesis.validate()?;

    let state = Arc::new(RwLock::new(ChainState::new(genesis, 0)));

    let server = Server::builder().build(cli.listen).await?;
    let addr = server.local_addr()?;
    info!(%addr, supply = cli.supply, window = cli.window, "clearbid mock chain listening");

    let handle = server.start(ChainServer { state }.into_rpc());

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    handle.stop()?;
    Ok(())
}
