use std::{collections::HashSet, sync::Arc};

use indexmap::IndexMap;
use log::{debug, trace};

use lottery_common::{
    crypto::Address,
    ledger::{Ledger, LedgerError},
    time::TimestampSeconds,
};

use crate::clock::Clock;

/// In-process ledger backing a local deployment.
pub struct MemoryLedger {
    clock: Arc<dyn Clock>,
    balances: IndexMap<Address, u64>,
    // Accounts refusing incoming transfers
    rejecting: HashSet<Address>,
}

impl MemoryLedger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_balances(clock, IndexMap::new())
    }

    pub fn with_balances(clock: Arc<dyn Clock>, balances: IndexMap<Address, u64>) -> Self {
        Self {
            clock,
            balances,
            rejecting: HashSet::new(),
        }
    }

    /// Mint `amount` to `account`.
    pub fn credit(&mut self, account: &Address, amount: u64) -> Result<(), LedgerError> {
        let balance = self.balances.entry(*account).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(*account))?;

        if log::log_enabled!(log::Level::Trace) {
            trace!("Credited {} to {}", amount, account);
        }
        Ok(())
    }

    pub fn reject_transfers_to(&mut self, account: Address) {
        self.rejecting.insert(account);
    }

    pub fn accept_transfers_to(&mut self, account: &Address) {
        self.rejecting.remove(account);
    }

    pub fn balances(&self) -> &IndexMap<Address, u64> {
        &self.balances
    }

    pub fn total_supply(&self) -> u128 {
        self.balances.values().map(|v| *v as u128).sum()
    }
}

impl Ledger for MemoryLedger {
    fn current_time(&self) -> TimestampSeconds {
        self.clock.now()
    }

    fn balance_of(&self, account: &Address) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: u64) -> Result<(), LedgerError> {
        if self.rejecting.contains(to) {
            return Err(LedgerError::Rejected(*to));
        }

        let have = self.balance_of(from);
        if have < amount {
            return Err(LedgerError::InsufficientBalance {
                account: *from,
                need: amount,
                have,
            });
        }

        if from != to {
            let receiver = self.balance_of(to);
            let receiver = receiver
                .checked_add(amount)
                .ok_or(LedgerError::Overflow(*to))?;
            self.balances.insert(*from, have - amount);
            self.balances.insert(*to, receiver);
        }

        if log::log_enabled!(log::Level::Debug) {
            debug!("Transferred {} from {} to {}", amount, from, to);
        }
        Ok(())
    }
}
