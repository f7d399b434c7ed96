use thiserror::Error;

use crate::{
    crypto::Address,
    ledger::LedgerError,
    vrf::{CoordinatorError, RequestId},
};

use super::LotteryPhase;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LotteryError {
    #[error("Not enough value entered: sent {sent}, entrance fee is {required}")]
    InsufficientPayment { sent: u64, required: u64 },

    #[error("Lottery is not open")]
    NotOpen,

    #[error("Upkeep not needed: balance {balance}, players {players}, state {state}")]
    UpkeepNotNeeded {
        balance: u64,
        players: usize,
        state: LotteryPhase,
    },

    #[error("Transfer of {amount} to winner {winner} failed: {source}")]
    TransferFailed {
        winner: Address,
        amount: u64,
        #[source]
        source: LedgerError,
    },

    #[error("Player index {index} out of range, {count} players entered")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("Unrecognized randomness request {0}")]
    UnrecognizedRequest(RequestId),

    #[error("Only coordinator {expected} can fulfill, called by {caller}")]
    OnlyCoordinatorCanFulfill { caller: Address, expected: Address },

    #[error("No random words delivered for request {0}")]
    EmptyRandomWords(RequestId),

    #[error("Randomness request rejected: {0}")]
    Provider(#[from] CoordinatorError),

    #[error("Lottery balance overflow")]
    Overflow,

    // Broken internal consistency, never a user error
    #[error("Invariant violation: {0}")]
    InvariantViolation(&'static str),
}

impl LotteryError {
    /// Fatal errors mean the state machine can no longer be trusted and
    /// must be surfaced to an operator instead of being retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }
}

pub type LotteryResult<T> = Result<T, LotteryError>;
