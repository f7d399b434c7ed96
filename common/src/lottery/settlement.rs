// Winner selection and payout

use log::debug;

use crate::{
    crypto::{Address, U256},
    ledger::Ledger,
};

use super::{LotteryError, LotteryResult};

/// Outcome of a settled round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub winner_index: usize,
    pub winner: Address,
    pub payout: u64,
}

/// Index of the winning entry: `random_word mod player_count`.
///
/// The reduction carries a modulo bias of at most `player_count / 2^256`,
/// negligible for any realistic number of entries.
pub fn winner_index(random_word: &U256, player_count: usize) -> LotteryResult<usize> {
    if player_count == 0 {
        return Err(LotteryError::InvariantViolation(
            "winner selection without players",
        ));
    }

    let index = *random_word % U256::from(player_count as u64);
    // index < player_count, so it fits
    Ok(index.low_u64() as usize)
}

/// Pick the winner among `players` and move the whole `pot` to them.
/// Nothing is transferred when an error is returned.
pub fn settle(
    lottery: &Address,
    players: &[Address],
    pot: u64,
    random_word: &U256,
    ledger: &mut dyn Ledger,
) -> LotteryResult<Settlement> {
    let winner_index = winner_index(random_word, players.len())?;
    let winner = players
        .get(winner_index)
        .copied()
        .ok_or(LotteryError::InvariantViolation("winner index out of range"))?;

    debug!(
        "Settling {} entries: index {} wins {}",
        players.len(),
        winner_index,
        pot
    );

    ledger
        .transfer(lottery, &winner, pot)
        .map_err(|source| LotteryError::TransferFailed {
            winner,
            amount: pot,
            source,
        })?;

    Ok(Settlement {
        winner_index,
        winner,
        payout: pot,
    })
}
