use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
    config::COIN_VALUE,
    crypto::Hash,
    time::TimestampSeconds,
};

// Key hash selecting the 150 gwei oracle lane
const GAS_LANE_150_GWEI: Hash = Hash::new([
    0x47, 0x4e, 0x34, 0xa0, 0x77, 0xdf, 0x58, 0x80, 0x7d, 0xbe, 0x9c, 0x96, 0xd3, 0xc0, 0x09, 0xb2,
    0x3b, 0x3c, 0x6d, 0x0c, 0xce, 0x43, 0x3e, 0x59, 0xbb, 0xf5, 0xb3, 0x4f, 0x82, 0x3b, 0xc5, 0x6c,
]);

/// Networks the lottery knows how to be configured for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Network {
    /// Local development chain with mocked oracle services
    #[default]
    Devnet,
    /// Public test network with live oracle services
    Testnet,
}

/// Deployment parameters attached to a network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkPreset {
    pub name: &'static str,
    pub entrance_fee: u64,
    pub gas_lane: Hash,
    pub callback_gas_limit: u32,
    pub interval: TimestampSeconds,
    // Blocks the oracle waits for, one block per second locally
    pub block_confirmations: u64,
}

impl Network {
    pub fn chain_id(&self) -> u64 {
        match self {
            Self::Devnet => 31337,
            Self::Testnet => 11155111,
        }
    }

    // Development networks deploy their own coordinator mock
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Devnet)
    }

    pub fn preset(&self) -> NetworkPreset {
        match self {
            Self::Devnet => NetworkPreset {
                name: "hardhat",
                entrance_fee: COIN_VALUE / 10,
                gas_lane: GAS_LANE_150_GWEI,
                callback_gas_limit: 500_000,
                interval: 30,
                block_confirmations: 1,
            },
            Self::Testnet => NetworkPreset {
                name: "sepolia",
                entrance_fee: COIN_VALUE / 100,
                gas_lane: GAS_LANE_150_GWEI,
                callback_gas_limit: 500_000,
                interval: 30,
                block_confirmations: 6,
            },
        }
    }
}
