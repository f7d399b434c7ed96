use serde::{Deserialize, Serialize};

use crate::{
    crypto::{Address, Hash},
    time::TimestampSeconds,
    vrf::SubscriptionId,
};

/// Immutable parameters fixed when a lottery is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotteryConfig {
    /// Randomness provider, also the only accepted fulfillment caller
    pub vrf_coordinator: Address,
    /// Minimum value per entry, in atomic units
    pub entrance_fee: u64,
    pub gas_lane: Hash,
    pub subscription_id: SubscriptionId,
    pub callback_gas_limit: u32,
    /// Minimum round duration in seconds
    pub interval: TimestampSeconds,
}
