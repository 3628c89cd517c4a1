//! Supported Stacks networks and the request guard applied to every endpoint.
//!
//! A process serves exactly one chain, picked at startup. Every Rosetta
//! request names a `network_identifier`; [`Network::check`] rejects requests
//! that do not match the configured chain before any endpoint logic runs.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::error::ApiError;
use crate::types::NetworkIdentifier;

/// The `blockchain` constant every request must carry.
pub const BLOCKCHAIN: &str = "stacks";

/// The chains this gateway can be configured against.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum Network {
    #[serde(rename = "mainnet")]
    Mainnet,
    #[serde(rename = "testnet")]
    Testnet,
}

impl Display for Network {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }

    /// Transaction version byte on the wire.
    pub fn transaction_version(&self) -> u8 {
        match self {
            Network::Mainnet => 0x00,
            Network::Testnet => 0x80,
        }
    }

    /// Chain id committed to in the transaction header.
    pub fn chain_id(&self) -> u32 {
        match self {
            Network::Mainnet => 0x0000_0001,
            Network::Testnet => 0x8000_0000,
        }
    }

    /// c32 address version byte for single-sig standard addresses.
    pub fn address_version(&self) -> u8 {
        match self {
            Network::Mainnet => 22,
            Network::Testnet => 26,
        }
    }

    /// The `network_identifier` this process answers for.
    pub fn identifier(&self) -> NetworkIdentifier {
        NetworkIdentifier {
            blockchain: BLOCKCHAIN.to_string(),
            network: self.as_str().to_string(),
            sub_network_identifier: None,
        }
    }

    /// Validates a request's `network_identifier` against this chain.
    pub fn check(&self, identifier: Option<&NetworkIdentifier>) -> Result<(), ApiError> {
        let identifier = identifier.ok_or(ApiError::EmptyNetworkIdentifier)?;
        if identifier.blockchain.is_empty() {
            return Err(ApiError::EmptyBlockchain);
        }
        if identifier.network.is_empty() {
            return Err(ApiError::EmptyNetwork);
        }
        if identifier.blockchain != BLOCKCHAIN {
            return Err(ApiError::InvalidBlockchain);
        }
        if identifier.network != self.as_str() {
            return Err(ApiError::InvalidNetwork);
        }
        Ok(())
    }
}
