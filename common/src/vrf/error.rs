use thiserror::Error;

use crate::crypto::Address;

use super::{RequestId, SubscriptionId};

/// Errors raised by a randomness coordinator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("Invalid subscription {0}")]
    InvalidSubscription(SubscriptionId),

    #[error("Consumer {consumer} is not registered on subscription {subscription_id}")]
    InvalidConsumer {
        subscription_id: SubscriptionId,
        consumer: Address,
    },

    #[error("Only the subscription owner {owner} can do this")]
    MustBeSubOwner { owner: Address },

    #[error("Too many consumers on subscription {0}")]
    TooManyConsumers(SubscriptionId),

    #[error("Too many words requested: {have}, maximum is {max}")]
    NumWordsTooBig { have: u32, max: u32 },

    #[error("Invalid request confirmations: {have}, maximum is {max}")]
    InvalidRequestConfirmations { have: u16, max: u16 },

    // Provider-level rejection of an unknown or already served request id
    #[error("Nonexistent request {0}")]
    NonexistentRequest(RequestId),

    #[error("Invalid random words: expected {expected}, got {got}")]
    InvalidRandomWords { expected: u32, got: usize },

    #[error("Insufficient balance on subscription {subscription_id}: need {need}, have {have}")]
    InsufficientBalance {
        subscription_id: SubscriptionId,
        need: u64,
        have: u64,
    },

    #[error("Subscription balance overflow")]
    Overflow,
}

/// Failure while delivering random words to a consumer.
#[derive(Debug, Error)]
pub enum FulfillError<E> {
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    // The consumer rejected the callback, the request stays pending
    #[error("Consumer callback for request {request_id} failed: {source}")]
    Callback {
        request_id: RequestId,
        #[source]
        source: E,
    },
}
