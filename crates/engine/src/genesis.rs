//! Genesis configuration for the auction engine.
//!
//! One auction per deployment: supply, deadline and ownership are fixed
//! here and never change afterwards.

use serde::{Deserialize, Serialize};

use clearbid_types::{Address, AssetMetadata, Quantity};

/// Immutable auction parameters, fixed at genesis.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuctionGenesisConfig {
    /// Auction owner; the only identity allowed to claim proceeds.
    pub owner: Address,

    /// Fixed supply of the asset being sold.
    pub total_supply: Quantity,

    /// Submission/confirmation window closes at this timestamp; resolution
    /// may be triggered strictly after it.
    pub deadline: u64,

    /// Descriptive metadata for the asset.
    pub asset: AssetMetadata,
}

impl AuctionGenesisConfig {
    pub fn new(owner: Address, total_supply: Quantity, deadline: u64, asset: AssetMetadata) -> Self {
        Self {
            owner,
            total_supply,
            deadline,
            asset,
        }
    }

    /// Validate the genesis configuration.
    pub fn validate(&self) -> Result<(), GenesisValidationError> {
        if self.total_supply == 0 {
            return Err(GenesisValidationError::ZeroSupply);
        }
        if self.deadline == 0 {
            return Err(GenesisValidationError::ZeroDeadline);
        }
        Ok(())
    }
}

impl Default for AuctionGenesisConfig {
    fn default() -> Self {
        Self {
            owner: [0u8; 32],
            total_supply: 1_000_000,
            deadline: 7 * 24 * 60 * 60,
            asset: AssetMetadata::default(),
        }
    }
}

/// Errors that can occur during genesis validation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenesisValidationError {
    #[error("total supply cannot be zero")]
    ZeroSupply,

    #[error("deadline cannot be zero")]
    ZeroDeadline,
}
