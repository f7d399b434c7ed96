// Local VRF coordinator
//
// Subscription-based randomness coordinator for development networks.
// Requests are registered synchronously and answered later by whoever
// drives `fulfill_random_words`, which derives the words deterministically
// from the request id unless explicit words are supplied.

use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use lottery_common::{
    config::{MAX_CONSUMERS, MAX_NUM_WORDS, MAX_REQUEST_CONFIRMATIONS},
    crypto::{keccak256, Address, Hash, U256},
    ledger::Ledger,
    vrf::{
        CoordinatorError, FulfillError, RandomnessProvider, RandomnessRequest, RequestId,
        SubscriptionId, VrfConsumer,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub owner: Address,
    /// LINK balance in atomic units
    pub balance: u64,
    pub consumers: Vec<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequest {
    pub key_hash: Hash,
    pub subscription_id: SubscriptionId,
    pub request_confirmations: u16,
    pub callback_gas_limit: u32,
    pub num_words: u32,
    pub consumer: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all_fields = "camelCase")]
pub enum CoordinatorEvent {
    SubscriptionCreated {
        subscription_id: SubscriptionId,
        owner: Address,
    },
    SubscriptionFunded {
        subscription_id: SubscriptionId,
        old_balance: u64,
        new_balance: u64,
    },
    SubscriptionCanceled {
        subscription_id: SubscriptionId,
        to: Address,
        amount: u64,
    },
    ConsumerAdded {
        subscription_id: SubscriptionId,
        consumer: Address,
    },
    ConsumerRemoved {
        subscription_id: SubscriptionId,
        consumer: Address,
    },
    RandomWordsRequested {
        key_hash: Hash,
        request_id: RequestId,
        subscription_id: SubscriptionId,
        minimum_request_confirmations: u16,
        callback_gas_limit: u32,
        num_words: u32,
        sender: Address,
    },
    RandomWordsFulfilled {
        request_id: RequestId,
        payment: u64,
        success: bool,
    },
}

/// Result of a successful fulfillment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulfillmentReceipt {
    pub request_id: RequestId,
    pub random_words: Vec<U256>,
    /// LINK charged to the subscription
    pub payment: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VrfCoordinatorMock {
    address: Address,
    base_fee: u64,
    gas_price_link: u64,
    current_subscription_id: SubscriptionId,
    last_request_id: RequestId,
    subscriptions: IndexMap<SubscriptionId, Subscription>,
    requests: IndexMap<RequestId, PendingRequest>,
    #[serde(skip)]
    events: Vec<CoordinatorEvent>,
}

// 32-byte big-endian word holding a u64
fn encode_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Words a request receives when no explicit words are given:
/// `keccak256(requestId ‖ index)` with both encoded as 32-byte words.
pub fn derive_random_words(request_id: RequestId, num_words: u32) -> Vec<U256> {
    (0..num_words as u64)
        .map(|index| {
            let mut preimage = [0u8; 64];
            preimage[..32].copy_from_slice(&encode_word(request_id));
            preimage[32..].copy_from_slice(&encode_word(index));
            U256::from_big_endian(keccak256(&preimage).as_bytes())
        })
        .collect()
}

impl VrfCoordinatorMock {
    pub fn new(address: Address, base_fee: u64, gas_price_link: u64) -> Self {
        Self {
            address,
            base_fee,
            gas_price_link,
            current_subscription_id: 0,
            last_request_id: 0,
            subscriptions: IndexMap::new(),
            requests: IndexMap::new(),
            events: Vec::new(),
        }
    }

    pub fn base_fee(&self) -> u64 {
        self.base_fee
    }

    pub fn gas_price_link(&self) -> u64 {
        self.gas_price_link
    }

    pub fn create_subscription(&mut self, owner: Address) -> SubscriptionId {
        self.current_subscription_id += 1;
        let subscription_id = self.current_subscription_id;
        self.subscriptions.insert(
            subscription_id,
            Subscription {
                owner,
                balance: 0,
                consumers: Vec::new(),
            },
        );

        if log::log_enabled!(log::Level::Info) {
            info!("Created subscription {} for {}", subscription_id, owner);
        }
        self.events.push(CoordinatorEvent::SubscriptionCreated {
            subscription_id,
            owner,
        });
        subscription_id
    }

    pub fn fund_subscription(
        &mut self,
        subscription_id: SubscriptionId,
        amount: u64,
    ) -> Result<(), CoordinatorError> {
        let subscription = self.subscription_mut(subscription_id)?;
        let old_balance = subscription.balance;
        let new_balance = old_balance
            .checked_add(amount)
            .ok_or(CoordinatorError::Overflow)?;
        subscription.balance = new_balance;

        self.events.push(CoordinatorEvent::SubscriptionFunded {
            subscription_id,
            old_balance,
            new_balance,
        });
        Ok(())
    }

    pub fn add_consumer(
        &mut self,
        caller: &Address,
        subscription_id: SubscriptionId,
        consumer: Address,
    ) -> Result<(), CoordinatorError> {
        let subscription = self.owned_subscription_mut(caller, subscription_id)?;
        if subscription.consumers.contains(&consumer) {
            return Ok(());
        }
        if subscription.consumers.len() >= MAX_CONSUMERS {
            return Err(CoordinatorError::TooManyConsumers(subscription_id));
        }
        subscription.consumers.push(consumer);

        if log::log_enabled!(log::Level::Debug) {
            debug!("Consumer {} added to subscription {}", consumer, subscription_id);
        }
        self.events.push(CoordinatorEvent::ConsumerAdded {
            subscription_id,
            consumer,
        });
        Ok(())
    }

    pub fn remove_consumer(
        &mut self,
        caller: &Address,
        subscription_id: SubscriptionId,
        consumer: &Address,
    ) -> Result<(), CoordinatorError> {
        let subscription = self.owned_subscription_mut(caller, subscription_id)?;
        let position = subscription
            .consumers
            .iter()
            .position(|c| c == consumer)
            .ok_or(CoordinatorError::InvalidConsumer {
                subscription_id,
                consumer: *consumer,
            })?;
        subscription.consumers.remove(position);

        self.events.push(CoordinatorEvent::ConsumerRemoved {
            subscription_id,
            consumer: *consumer,
        });
        Ok(())
    }

    /// Delete a subscription and return the balance refunded to `to`.
    pub fn cancel_subscription(
        &mut self,
        caller: &Address,
        subscription_id: SubscriptionId,
        to: Address,
    ) -> Result<u64, CoordinatorError> {
        self.owned_subscription_mut(caller, subscription_id)?;
        let amount = self
            .subscriptions
            .shift_remove(&subscription_id)
            .map(|s| s.balance)
            .unwrap_or(0);

        self.events.push(CoordinatorEvent::SubscriptionCanceled {
            subscription_id,
            to,
            amount,
        });
        Ok(amount)
    }

    pub fn get_subscription(
        &self,
        subscription_id: SubscriptionId,
    ) -> Result<&Subscription, CoordinatorError> {
        self.subscriptions
            .get(&subscription_id)
            .ok_or(CoordinatorError::InvalidSubscription(subscription_id))
    }

    pub fn consumer_is_added(&self, subscription_id: SubscriptionId, consumer: &Address) -> bool {
        self.subscriptions
            .get(&subscription_id)
            .is_some_and(|s| s.consumers.contains(consumer))
    }

    /// Ids of the requests waiting for fulfillment, oldest first.
    pub fn pending_requests(&self) -> Vec<RequestId> {
        self.requests.keys().copied().collect()
    }

    pub fn pending_request(&self, request_id: RequestId) -> Option<&PendingRequest> {
        self.requests.get(&request_id)
    }

    /// LINK charged for a fulfillment: base fee plus the callback gas budget
    /// priced at the LINK gas price.
    pub fn calculate_payment(&self, callback_gas_limit: u32) -> Result<u64, CoordinatorError> {
        self.gas_price_link
            .checked_mul(callback_gas_limit as u64)
            .and_then(|gas| gas.checked_add(self.base_fee))
            .ok_or(CoordinatorError::Overflow)
    }

    /// Answer `request_id` with words derived from the request id.
    pub fn fulfill_random_words<C: VrfConsumer + ?Sized>(
        &mut self,
        request_id: RequestId,
        consumer: &mut C,
        ledger: &mut dyn Ledger,
    ) -> Result<FulfillmentReceipt, FulfillError<C::Error>> {
        self.fulfill_internal(request_id, consumer, None, ledger)
    }

    /// Answer `request_id` with caller supplied words. Their count must match
    /// the request, an empty list falls back to derived words.
    pub fn fulfill_random_words_with_override<C: VrfConsumer + ?Sized>(
        &mut self,
        request_id: RequestId,
        consumer: &mut C,
        random_words: Vec<U256>,
        ledger: &mut dyn Ledger,
    ) -> Result<FulfillmentReceipt, FulfillError<C::Error>> {
        let words = if random_words.is_empty() {
            None
        } else {
            Some(random_words)
        };
        self.fulfill_internal(request_id, consumer, words, ledger)
    }

    // Nothing is consumed or charged unless the consumer callback succeeds
    fn fulfill_internal<C: VrfConsumer + ?Sized>(
        &mut self,
        request_id: RequestId,
        consumer: &mut C,
        random_words: Option<Vec<U256>>,
        ledger: &mut dyn Ledger,
    ) -> Result<FulfillmentReceipt, FulfillError<C::Error>> {
        let request = self
            .requests
            .get(&request_id)
            .cloned()
            .ok_or(CoordinatorError::NonexistentRequest(request_id))?;

        if *consumer.address() != request.consumer {
            return Err(CoordinatorError::InvalidConsumer {
                subscription_id: request.subscription_id,
                consumer: *consumer.address(),
            }
            .into());
        }

        let random_words = match random_words {
            Some(words) if words.len() != request.num_words as usize => {
                return Err(CoordinatorError::InvalidRandomWords {
                    expected: request.num_words,
                    got: words.len(),
                }
                .into())
            }
            Some(words) => words,
            None => derive_random_words(request_id, request.num_words),
        };

        let payment = self.calculate_payment(request.callback_gas_limit)?;
        let balance = self.get_subscription(request.subscription_id)?.balance;
        if balance < payment {
            return Err(CoordinatorError::InsufficientBalance {
                subscription_id: request.subscription_id,
                need: payment,
                have: balance,
            }
            .into());
        }

        let caller = self.address;
        if let Err(source) =
            consumer.raw_fulfill_random_words(&caller, request_id, &random_words, ledger)
        {
            // nothing charged, the request can be answered again
            self.events.push(CoordinatorEvent::RandomWordsFulfilled {
                request_id,
                payment: 0,
                success: false,
            });
            return Err(FulfillError::Callback { request_id, source });
        }

        self.requests.shift_remove(&request_id);
        self.subscription_mut(request.subscription_id)?.balance = balance - payment;

        if log::log_enabled!(log::Level::Info) {
            info!(
                "Fulfilled request {} for {}, charged {}",
                request_id, request.consumer, payment
            );
        }
        self.events.push(CoordinatorEvent::RandomWordsFulfilled {
            request_id,
            payment,
            success: true,
        });

        Ok(FulfillmentReceipt {
            request_id,
            random_words,
            payment,
        })
    }

    pub fn events(&self) -> &[CoordinatorEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<CoordinatorEvent> {
        std::mem::take(&mut self.events)
    }

    fn subscription_mut(
        &mut self,
        subscription_id: SubscriptionId,
    ) -> Result<&mut Subscription, CoordinatorError> {
        self.subscriptions
            .get_mut(&subscription_id)
            .ok_or(CoordinatorError::InvalidSubscription(subscription_id))
    }

    fn owned_subscription_mut(
        &mut self,
        caller: &Address,
        subscription_id: SubscriptionId,
    ) -> Result<&mut Subscription, CoordinatorError> {
        let subscription = self.subscription_mut(subscription_id)?;
        if subscription.owner != *caller {
            return Err(CoordinatorError::MustBeSubOwner {
                owner: subscription.owner,
            });
        }
        Ok(subscription)
    }
}

impl RandomnessProvider for VrfCoordinatorMock {
    fn address(&self) -> &Address {
        &self.address
    }

    fn request_random_words(
        &mut self,
        request: RandomnessRequest,
    ) -> Result<RequestId, CoordinatorError> {
        if !self.subscriptions.contains_key(&request.subscription_id) {
            return Err(CoordinatorError::InvalidSubscription(
                request.subscription_id,
            ));
        }
        if !self.consumer_is_added(request.subscription_id, &request.consumer) {
            return Err(CoordinatorError::InvalidConsumer {
                subscription_id: request.subscription_id,
                consumer: request.consumer,
            });
        }
        if request.request_confirmations > MAX_REQUEST_CONFIRMATIONS {
            return Err(CoordinatorError::InvalidRequestConfirmations {
                have: request.request_confirmations,
                max: MAX_REQUEST_CONFIRMATIONS,
            });
        }
        if request.num_words > MAX_NUM_WORDS {
            return Err(CoordinatorError::NumWordsTooBig {
                have: request.num_words,
                max: MAX_NUM_WORDS,
            });
        }

        self.last_request_id += 1;
        let request_id = self.last_request_id;

        if log::log_enabled!(log::Level::Debug) {
            debug!(
                "Request {} registered for {} on subscription {}",
                request_id, request.consumer, request.subscription_id
            );
        }
        self.events.push(CoordinatorEvent::RandomWordsRequested {
            key_hash: request.key_hash.clone(),
            request_id,
            subscription_id: request.subscription_id,
            minimum_request_confirmations: request.request_confirmations,
            callback_gas_limit: request.callback_gas_limit,
            num_words: request.num_words,
            sender: request.consumer,
        });
        self.requests.insert(
            request_id,
            PendingRequest {
                key_hash: request.key_hash,
                subscription_id: request.subscription_id,
                request_confirmations: request.request_confirmations,
                callback_gas_limit: request.callback_gas_limit,
                num_words: request.num_words,
                consumer: request.consumer,
            },
        );
        Ok(request_id)
    }
}
