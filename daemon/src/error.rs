//! Error types for the lottery node.

use std::io::Error as IoError;
use thiserror::Error;

use lottery_common::{
    ledger::LedgerError,
    lottery::LotteryError,
    network::Network,
    vrf::{CoordinatorError, FulfillError, RequestId},
};

/// Error type for node operations.
#[derive(Error, Debug)]
pub enum NodeError {
    /// Rejected by the lottery state machine.
    #[error(transparent)]
    Lottery(#[from] LotteryError),

    /// Rejected by the VRF coordinator.
    #[error("Coordinator error: {0}")]
    Coordinator(#[from] CoordinatorError),

    /// Rejected by the ledger.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// The lottery refused a fulfillment, the request is still pending.
    #[error("Fulfillment of request {request_id} rejected: {source}")]
    Callback {
        request_id: RequestId,
        #[source]
        source: LotteryError,
    },

    /// Local deployment only runs against a development network.
    #[error("Network {0} has no local coordinator, use a development network")]
    UnsupportedNetwork(Network),

    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl NodeError {
    /// Whether the node must halt instead of retrying.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Lottery(e) | Self::Callback { source: e, .. } => e.is_fatal(),
            _ => false,
        }
    }
}

impl From<FulfillError<LotteryError>> for NodeError {
    fn from(err: FulfillError<LotteryError>) -> Self {
        match err {
            FulfillError::Coordinator(e) => Self::Coordinator(e),
            FulfillError::Callback { request_id, source } => Self::Callback { request_id, source },
        }
    }
}

/// Result type alias for node operations.
pub type NodeResult<T> = Result<T, NodeError>;
