//! CLI for interacting with the clearbid auction.
//!
//! This binary provides commands for:
//! - Submitting sealed bids (encrypting through the mock gateway)
//! - Confirming and cancelling bids
//! - Driving resolution and finalization batches
//! - Claiming allocations, refunds and proceeds
//! - Querying auction status, bids and balances

use anyhow::Result;
use clap::{Parser, Subcommand};
use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "clearbid")]
#[command(about = "CLI for the clearbid sealed-bid clearing auction")]
struct Cli {
    /// Mock chain RPC endpoint
    #[arg(long, default_value = "http://127.0.0.1:9944")]
    rpc: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a sealed bid (encrypts quantity and price via the gateway)
    Bid {
        /// Sender address (hex, 32 bytes)
        #[arg(long)]
        sender: String,

        /// Asset units requested (will be encrypted)
        #[arg(long)]
        quantity: u64,

        /// Escrow currency offered per unit (will be encrypted)
        #[arg(long)]
        price: u64,
    },

    /// Confirm a revealed bid by attaching the deposit
    Confirm {
        /// Sender address (hex)
        #[arg(long)]
        sender: String,

        /// Bid id
        #[arg(long)]
        bid_id: u64,

        /// Escrow currency to attach
        #[arg(long)]
        value: u128,
    },

    /// Cancel an unconfirmed bid
    Cancel {
        /// Sender address (hex)
        #[arg(long)]
        sender: String,

        /// Bid id
        #[arg(long)]
        bid_id: u64,
    },

    /// Drive resolution forward by one batch
    Resolve {
        /// Maximum bids to process in this call
        #[arg(long, default_value = "100")]
        batch_size: u64,
    },

    /// Drive allocation finalization forward by one batch
    Finalize {
        /// Maximum bids to process in this call
        #[arg(long, default_value = "100")]
        batch_size: u64,
    },

    /// Claim won asset units
    ClaimAllocation {
        #[arg(long)]
        sender: String,

        #[arg(long)]
        bid_id: u64,
    },

    /// Claim unspent escrow
    ClaimRefund {
        #[arg(long)]
        sender: String,

        #[arg(long)]
        bid_id: u64,
    },

    /// Claim sale proceeds (owner only)
    ClaimProceeds {
        #[arg(long)]
        sender: String,
    },

    /// Deliver all pending reveal callbacks
    Flush,

    /// Show the auction summary
    Status,

    /// Show a bid
    GetBid {
        #[arg(long)]
        bid_id: u64,
    },

    /// List a bidder's bid ids
    BidsOf {
        #[arg(long)]
        address: String,
    },

    /// Show escrow-currency and asset balances for an address
    Balances {
        #[arg(long)]
        address: String,
    },

    /// Credit escrow currency to an address (test faucet)
    Faucet {
        #[arg(long)]
        address: String,

        #[arg(long)]
        amount: u128,
    },

    /// Set the simulated timestamp
    SetTime {
        #[arg(long)]
        timestamp: u64,
    },
}

async fn submit_bid(client: &HttpClient, sender: String, quantity: u64, price: u64) -> Result<()> {
    let handles: Value = client
        .request(
            "gateway_encryptBid",
            rpc_params![sender.clone(), quantity, price],
        )
        .await?;

    let params = json!({
        "sender": sender,
        "quantity_handle": handles["quantity_handle"],
        "price_handle": handles["price_handle"],
        // Binding proof; the mock gateway accepts any non-empty value.
        "proof": "00",
    });
    let response: Value = client
        .request("auction_submitBid", rpc_params![params])
        .await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn print_request(client: &HttpClient, method: &str, params: Vec<Value>) -> Result<()> {
    let mut builder = jsonrpsee::core::params::ArrayParams::new();
    for param in params {
        builder.insert(param)?;
    }
    let response: Value = client.request(method, builder).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let client = HttpClientBuilder::default().build(&cli.rpc)?;

    match cli.command {
        Commands::Bid {
            sender,
            quantity,
            price,
        } => submit_bid(&client, sender, quantity, price).await?,

        Commands::Confirm {
            sender,
            bid_id,
            value,
        } => {
            print_request(
                &client,
                "auction_confirmBid",
                vec![json!(sender), json!(bid_id), json!(value)],
            )
            .await?
        }

        Commands::Cancel { sender, bid_id } => {
            print_request(
                &client,
                "auction_cancelBid",
                vec![json!(sender), json!(bid_id)],
            )
            .await?
        }

        Commands::Resolve { batch_size } => {
            print_request(&client, "auction_resolve", vec![json!(batch_size)]).await?
        }

        Commands::Finalize { batch_size } => {
            print_request(&client, "auction_finalize", vec![json!(batch_size)]).await?
        }

        Commands::ClaimAllocation { sender, bid_id } => {
            print_request(
                &client,
                "auction_claimAllocation",
                vec![json!(sender), json!(bid_id)],
            )
            .await?
        }

        Commands::ClaimRefund { sender, bid_id } => {
            print_request(
                &client,
                "auction_claimRefund",
                vec![json!(sender), json!(bid_id)],
            )
            .await?
        }

        Commands::ClaimProceeds { sender } => {
            print_request(&client, "auction_claimProceeds", vec![json!(sender)]).await?
        }

        Commands::Flush => print_request(&client, "gateway_flush", vec![]).await?,

        Commands::Status => print_request(&client, "query_summary", vec![]).await?,

        Commands::GetBid { bid_id } => {
            print_request(&client, "query_bid", vec![json!(bid_id)]).await?
        }

        Commands::BidsOf { address } => {
            print_request(&client, "query_bidsOf", vec![json!(address)]).await?
        }

        Commands::Balances { address } => {
            let balance: Value = client
                .request("query_balance", rpc_params![address.clone()])
                .await?;
            let assets: Value = client
                .request("query_assetBalance", rpc_params![address])
                .await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "currency": balance,
                    "asset": assets,
                }))?
            );
        }

        Commands::Faucet { address, amount } => {
            print_request(
                &client,
                "admin_faucet",
                vec![json!(address), json!(amount)],
            )
            .await?
        }

        Commands::SetTime { timestamp } => {
            print_request(&client, "admin_setTimestamp", vec![json!(timestamp)]).await?
        }
    }

    Ok(())
}
