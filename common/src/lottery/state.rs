use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{crypto::Address, time::TimestampSeconds, vrf::RequestId};

use super::{LotteryError, LotteryResult};

/// Phase of the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LotteryPhase {
    /// Accepting entries
    #[default]
    Open,
    /// Waiting for the randomness callback, entries rejected
    Calculating,
}

impl LotteryPhase {
    /// Numeric id as exposed to external indexers
    pub fn id(&self) -> u8 {
        match self {
            Self::Open => 0,
            Self::Calculating => 1,
        }
    }
}

/// Mutable state of a lottery, owned by a single `Lottery`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotteryState {
    pub phase: LotteryPhase,
    /// Entry order, one slot per entry, duplicates allowed
    pub players: Vec<Address>,
    /// Sum of the values entered since the last settlement
    pub balance: u64,
    /// Construction time, then time of the last settlement
    pub last_timestamp: TimestampSeconds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_request: Option<RequestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_winner: Option<Address>,
}

impl LotteryState {
    pub fn new(now: TimestampSeconds) -> Self {
        Self {
            phase: LotteryPhase::Open,
            players: Vec::new(),
            balance: 0,
            last_timestamp: now,
            pending_request: None,
            recent_winner: None,
        }
    }

    /// Check the invariants tying the fields together.
    pub fn verify(&self) -> LotteryResult<()> {
        match (self.phase, self.pending_request) {
            (LotteryPhase::Open, Some(_)) => {
                return Err(LotteryError::InvariantViolation(
                    "pending randomness request while open",
                ))
            }
            (LotteryPhase::Calculating, None) => {
                return Err(LotteryError::InvariantViolation(
                    "calculating without a pending randomness request",
                ))
            }
            _ => {}
        }

        if self.phase == LotteryPhase::Calculating && (self.players.is_empty() || self.balance == 0)
        {
            return Err(LotteryError::InvariantViolation(
                "settlement requested without players or funds",
            ));
        }

        if self.players.is_empty() && self.balance != 0 {
            return Err(LotteryError::InvariantViolation(
                "funds held without any player",
            ));
        }

        Ok(())
    }
}

/// The four terms of the upkeep predicate, kept apart for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpkeepStatus {
    pub is_open: bool,
    pub time_passed: bool,
    pub has_players: bool,
    pub has_balance: bool,
}

impl UpkeepStatus {
    pub fn is_needed(&self) -> bool {
        self.is_open && self.time_passed && self.has_players && self.has_balance
    }
}
