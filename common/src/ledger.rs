//! Interface to the external ledger holding balances and time.
//!
//! The ledger is trusted: it sequences every call against the lottery and
//! guarantees that a failed [`Ledger::transfer`] leaves every balance
//! untouched.

use thiserror::Error;

use crate::{crypto::Address, time::TimestampSeconds};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient balance for {account}: need {need}, have {have}")]
    InsufficientBalance {
        account: Address,
        need: u64,
        have: u64,
    },

    #[error("Balance overflow for {0}")]
    Overflow(Address),

    #[error("Recipient {0} rejected the transfer")]
    Rejected(Address),
}

pub trait Ledger {
    /// Current time as seen by the ledger.
    fn current_time(&self) -> TimestampSeconds;

    fn balance_of(&self, account: &Address) -> u64;

    /// Move `amount` from `from` to `to`, all or nothing.
    fn transfer(&mut self, from: &Address, to: &Address, amount: u64) -> Result<(), LedgerError>;
}
