// Randomness provider interfaces
// A consumer issues a request through `RandomnessProvider`, the provider
// later answers through `VrfConsumer::raw_fulfill_random_words`

mod error;

use serde::{Deserialize, Serialize};

use crate::{
    crypto::{Address, Hash, U256},
    ledger::Ledger,
};

pub use error::*;

pub type RequestId = u64;
pub type SubscriptionId = u64;

/// A request for random words, as sent by a consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RandomnessRequest {
    /// Routing key ("gas lane") selecting the oracle queue
    pub key_hash: Hash,
    /// Prepaid subscription funding the request
    pub subscription_id: SubscriptionId,
    pub request_confirmations: u16,
    /// Gas budget granted to the fulfillment callback
    pub callback_gas_limit: u32,
    pub num_words: u32,
    /// Requesting contract, the only one allowed to receive the words
    pub consumer: Address,
}

pub trait RandomnessProvider {
    /// Address the provider calls back from.
    fn address(&self) -> &Address;

    /// Register a request and return its identifier. The words are
    /// delivered later, asynchronously, to `request.consumer`.
    fn request_random_words(
        &mut self,
        request: RandomnessRequest,
    ) -> Result<RequestId, CoordinatorError>;
}

pub trait VrfConsumer {
    type Error: std::error::Error + 'static;

    fn address(&self) -> &Address;

    /// Callback entry point. `caller` is the address delivering the words
    /// and must be checked against the expected provider.
    fn raw_fulfill_random_words(
        &mut self,
        caller: &Address,
        request_id: RequestId,
        random_words: &[U256],
        ledger: &mut dyn Ledger,
    ) -> Result<(), Self::Error>;
}
