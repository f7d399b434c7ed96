//! Lottery state machine.
//!
//! A round accepts paid entries while `OPEN`. Once the interval elapsed and
//! at least one funded entry exists, upkeep requests a random word from the
//! coordinator and moves the lottery to `CALCULATING`. The coordinator then
//! delivers the word, which selects the winner, pays out the whole balance
//! and reopens the lottery for a new round.
//!
//! Every operation is all-or-nothing: when an error is returned no field has
//! been modified and no event has been recorded.

mod config;
mod error;
mod event;
mod settlement;
mod state;

use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use crate::{
    config::{NUM_WORDS, REQUEST_CONFIRMATIONS},
    crypto::{Address, U256},
    ledger::Ledger,
    time::{elapsed_seconds, TimestampSeconds},
    vrf::{RandomnessProvider, RandomnessRequest, RequestId, VrfConsumer},
};

pub use config::LotteryConfig;
pub use error::{LotteryError, LotteryResult};
pub use event::LotteryEvent;
pub use settlement::{settle, winner_index, Settlement};
pub use state::{LotteryPhase, LotteryState, UpkeepStatus};

/// Serializable image of a lottery, used to persist and restore it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotterySnapshot {
    pub address: Address,
    pub config: LotteryConfig,
    pub state: LotteryState,
}

#[derive(Debug)]
pub struct Lottery {
    address: Address,
    config: LotteryConfig,
    state: LotteryState,
    // Emitted but not yet drained
    events: Vec<LotteryEvent>,
}

impl Lottery {
    /// Create an open lottery with no entries, starting its first round at `now`.
    pub fn new(address: Address, config: LotteryConfig, now: TimestampSeconds) -> Self {
        Self {
            address,
            config,
            state: LotteryState::new(now),
            events: Vec::new(),
        }
    }

    /// Rebuild a lottery from a snapshot, refusing inconsistent state.
    pub fn restore(snapshot: LotterySnapshot) -> LotteryResult<Self> {
        snapshot.state.verify()?;
        Ok(Self {
            address: snapshot.address,
            config: snapshot.config,
            state: snapshot.state,
            events: Vec::new(),
        })
    }

    pub fn snapshot(&self) -> LotterySnapshot {
        LotterySnapshot {
            address: self.address,
            config: self.config.clone(),
            state: self.state.clone(),
        }
    }

    /// Check that an entry carrying `value` would be accepted, without
    /// recording it. Lets the caller collect the payment before `enter`.
    pub fn validate_entry(&self, value: u64) -> LotteryResult<()> {
        if value < self.config.entrance_fee {
            return Err(LotteryError::InsufficientPayment {
                sent: value,
                required: self.config.entrance_fee,
            });
        }

        if self.state.phase != LotteryPhase::Open {
            return Err(LotteryError::NotOpen);
        }

        self.state
            .balance
            .checked_add(value)
            .ok_or(LotteryError::Overflow)?;

        Ok(())
    }

    /// Record a paid entry for `player`. The value must already have been
    /// credited to the lottery account.
    pub fn enter(&mut self, player: Address, value: u64) -> LotteryResult<()> {
        self.validate_entry(value)?;

        // validated above
        self.state.balance += value;
        self.state.players.push(player);

        debug!(
            "{} entered with {} ({} players)",
            player,
            value,
            self.state.players.len()
        );
        self.events.push(LotteryEvent::LotteryEnter { player });
        Ok(())
    }

    pub fn upkeep_status(&self, now: TimestampSeconds) -> UpkeepStatus {
        UpkeepStatus {
            is_open: self.state.phase == LotteryPhase::Open,
            time_passed: elapsed_seconds(self.state.last_timestamp, now) >= self.config.interval,
            has_players: !self.state.players.is_empty(),
            has_balance: self.state.balance > 0,
        }
    }

    /// Whether a settlement should be requested now. The payload is ignored
    /// on input and returned empty.
    pub fn check_upkeep(&self, _check_data: &[u8], ledger: &dyn Ledger) -> (bool, Vec<u8>) {
        let status = self.upkeep_status(ledger.current_time());
        if log::log_enabled!(log::Level::Trace) {
            trace!("check upkeep at {}: {:?}", ledger.current_time(), status);
        }
        (status.is_needed(), Vec::new())
    }

    /// Close the round and request one random word from `provider`.
    /// Anyone may call this, it only succeeds when upkeep is needed.
    pub fn perform_upkeep(
        &mut self,
        _perform_data: &[u8],
        ledger: &dyn Ledger,
        provider: &mut dyn RandomnessProvider,
    ) -> LotteryResult<RequestId> {
        if !self.upkeep_status(ledger.current_time()).is_needed() {
            return Err(LotteryError::UpkeepNotNeeded {
                balance: self.state.balance,
                players: self.state.players.len(),
                state: self.state.phase,
            });
        }

        let request = RandomnessRequest {
            key_hash: self.config.gas_lane.clone(),
            subscription_id: self.config.subscription_id,
            request_confirmations: REQUEST_CONFIRMATIONS,
            callback_gas_limit: self.config.callback_gas_limit,
            num_words: NUM_WORDS,
            consumer: self.address,
        };
        let request_id = provider.request_random_words(request)?;

        self.state.phase = LotteryPhase::Calculating;
        self.state.pending_request = Some(request_id);

        info!(
            "Requested lottery winner for {} players, request id {}",
            self.state.players.len(),
            request_id
        );
        self.events
            .push(LotteryEvent::RequestedLotteryWinner { request_id });
        Ok(request_id)
    }

    // Caller already authenticated
    fn fulfill_random_words(
        &mut self,
        request_id: RequestId,
        random_words: &[U256],
        ledger: &mut dyn Ledger,
    ) -> LotteryResult<Settlement> {
        if self.state.pending_request != Some(request_id) {
            return Err(LotteryError::UnrecognizedRequest(request_id));
        }

        if self.state.phase != LotteryPhase::Calculating {
            return Err(LotteryError::InvariantViolation(
                "pending randomness request while open",
            ));
        }

        let random_word = random_words
            .first()
            .ok_or(LotteryError::EmptyRandomWords(request_id))?;

        let now = ledger.current_time();
        let settlement = settle(
            &self.address,
            &self.state.players,
            self.state.balance,
            random_word,
            ledger,
        )?;

        self.state.players.clear();
        self.state.balance = 0;
        self.state.phase = LotteryPhase::Open;
        self.state.pending_request = None;
        self.state.recent_winner = Some(settlement.winner);
        // never moves backwards
        self.state.last_timestamp = self.state.last_timestamp.max(now);

        info!(
            "Winner picked for request {}: {} receives {}",
            request_id, settlement.winner, settlement.payout
        );
        self.events.push(LotteryEvent::WinnerPicked {
            winner: settlement.winner,
        });
        Ok(settlement)
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn config(&self) -> &LotteryConfig {
        &self.config
    }

    pub fn entrance_fee(&self) -> u64 {
        self.config.entrance_fee
    }

    pub fn interval(&self) -> TimestampSeconds {
        self.config.interval
    }

    pub fn phase(&self) -> LotteryPhase {
        self.state.phase
    }

    pub fn player(&self, index: usize) -> LotteryResult<&Address> {
        self.state
            .players
            .get(index)
            .ok_or(LotteryError::IndexOutOfRange {
                index,
                count: self.state.players.len(),
            })
    }

    pub fn players(&self) -> &[Address] {
        &self.state.players
    }

    pub fn number_of_players(&self) -> usize {
        self.state.players.len()
    }

    pub fn recent_winner(&self) -> Option<&Address> {
        self.state.recent_winner.as_ref()
    }

    pub fn latest_timestamp(&self) -> TimestampSeconds {
        self.state.last_timestamp
    }

    pub fn balance(&self) -> u64 {
        self.state.balance
    }

    pub fn pending_request(&self) -> Option<RequestId> {
        self.state.pending_request
    }

    pub fn num_words(&self) -> u32 {
        NUM_WORDS
    }

    pub fn request_confirmations(&self) -> u16 {
        REQUEST_CONFIRMATIONS
    }

    pub fn events(&self) -> &[LotteryEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<LotteryEvent> {
        std::mem::take(&mut self.events)
    }
}

impl VrfConsumer for Lottery {
    type Error = LotteryError;

    fn address(&self) -> &Address {
        &self.address
    }

    fn raw_fulfill_random_words(
        &mut self,
        caller: &Address,
        request_id: RequestId,
        random_words: &[U256],
        ledger: &mut dyn Ledger,
    ) -> Result<(), LotteryError> {
        if *caller != self.config.vrf_coordinator {
            return Err(LotteryError::OnlyCoordinatorCanFulfill {
                caller: *caller,
                expected: self.config.vrf_coordinator,
            });
        }

        self.fulfill_random_words(request_id, random_words, ledger)
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use crate::{
        config::COIN_VALUE,
        crypto::Hash,
        ledger::LedgerError,
        vrf::CoordinatorError,
    };

    use super::*;

    const FEE: u64 = COIN_VALUE / 10;
    const INTERVAL: TimestampSeconds = 30;
    const START: TimestampSeconds = 1_000;

    struct TestLedger {
        now: TimestampSeconds,
        balances: HashMap<Address, u64>,
        rejecting: HashSet<Address>,
    }

    impl TestLedger {
        fn new() -> Self {
            Self {
                now: START,
                balances: HashMap::new(),
                rejecting: HashSet::new(),
            }
        }

        fn credit(&mut self, account: &Address, amount: u64) {
            *self.balances.entry(*account).or_insert(0) += amount;
        }
    }

    impl Ledger for TestLedger {
        fn current_time(&self) -> TimestampSeconds {
            self.now
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
            self.balances.insert(*from, have - amount);
            self.credit(to, amount);
            Ok(())
        }
    }

    struct TestProvider {
        address: Address,
        requests: Vec<RandomnessRequest>,
        failure: Option<CoordinatorError>,
    }

    impl TestProvider {
        fn new() -> Self {
            Self {
                address: coordinator(),
                requests: Vec::new(),
                failure: None,
            }
        }
    }

    impl RandomnessProvider for TestProvider {
        fn address(&self) -> &Address {
            &self.address
        }

        fn request_random_words(
            &mut self,
            request: RandomnessRequest,
        ) -> Result<RequestId, CoordinatorError> {
            if let Some(err) = &self.failure {
                return Err(err.clone());
            }
            self.requests.push(request);
            Ok(self.requests.len() as RequestId)
        }
    }

    fn coordinator() -> Address {
        Address::derive(b"coordinator")
    }

    fn player(n: u8) -> Address {
        Address::derive(&[b'p', n])
    }

    fn gas_lane() -> Hash {
        Hash::new([0x47; 32])
    }

    fn setup() -> (Lottery, TestLedger, TestProvider) {
        let config = LotteryConfig {
            vrf_coordinator: coordinator(),
            entrance_fee: FEE,
            gas_lane: gas_lane(),
            subscription_id: 1,
            callback_gas_limit: 500_000,
            interval: INTERVAL,
        };
        let ledger = TestLedger::new();
        let lottery = Lottery::new(Address::derive(b"lottery"), config, ledger.current_time());
        (lottery, ledger, TestProvider::new())
    }

    // Pay then record, as a node does
    fn pay_and_enter(lottery: &mut Lottery, ledger: &mut TestLedger, who: Address, value: u64) {
        ledger.credit(lottery.address(), value);
        lottery.enter(who, value).unwrap();
    }

    fn ready_for_upkeep(lottery: &mut Lottery, ledger: &mut TestLedger) {
        pay_and_enter(lottery, ledger, player(1), FEE);
        ledger.now += INTERVAL + 1;
    }

    #[test]
    fn test_new_lottery_is_open() {
        let (lottery, _, _) = setup();
        assert_eq!(lottery.phase(), LotteryPhase::Open);
        assert_eq!(lottery.entrance_fee(), FEE);
        assert_eq!(lottery.interval(), INTERVAL);
        assert_eq!(lottery.number_of_players(), 0);
        assert_eq!(lottery.balance(), 0);
        assert_eq!(lottery.latest_timestamp(), START);
        assert_eq!(lottery.recent_winner(), None);
        assert_eq!(lottery.pending_request(), None);
        assert_eq!(lottery.num_words(), 1);
        assert_eq!(lottery.request_confirmations(), 3);
    }

    #[test]
    fn test_enter_insufficient_payment() {
        let (mut lottery, _, _) = setup();
        for value in [0, FEE - 1] {
            assert_eq!(
                lottery.enter(player(1), value),
                Err(LotteryError::InsufficientPayment {
                    sent: value,
                    required: FEE
                })
            );
        }
        assert_eq!(lottery.number_of_players(), 0);
        assert!(lottery.events().is_empty());
    }

    #[test]
    fn test_enter_records_player_and_event() {
        let (mut lottery, mut ledger, _) = setup();
        pay_and_enter(&mut lottery, &mut ledger, player(1), FEE);
        pay_and_enter(&mut lottery, &mut ledger, player(2), FEE * 3);

        assert_eq!(lottery.player(0).unwrap(), &player(1));
        assert_eq!(lottery.player(1).unwrap(), &player(2));
        assert_eq!(lottery.balance(), FEE * 4);
        assert_eq!(
            lottery.drain_events(),
            vec![
                LotteryEvent::LotteryEnter { player: player(1) },
                LotteryEvent::LotteryEnter { player: player(2) },
            ]
        );
        assert!(lottery.events().is_empty());
    }

    #[test]
    fn test_duplicate_entries_are_separate_slots() {
        let (mut lottery, mut ledger, _) = setup();
        pay_and_enter(&mut lottery, &mut ledger, player(1), FEE);
        pay_and_enter(&mut lottery, &mut ledger, player(1), FEE);
        assert_eq!(lottery.number_of_players(), 2);
        assert_eq!(lottery.player(0).unwrap(), lottery.player(1).unwrap());
    }

    #[test]
    fn test_player_index_out_of_range() {
        let (lottery, _, _) = setup();
        assert_eq!(
            lottery.player(0),
            Err(LotteryError::IndexOutOfRange { index: 0, count: 0 })
        );
    }

    #[test]
    fn test_enter_while_calculating() {
        let (mut lottery, mut ledger, mut provider) = setup();
        ready_for_upkeep(&mut lottery, &mut ledger);
        lottery.perform_upkeep(&[], &ledger, &mut provider).unwrap();

        assert_eq!(lottery.enter(player(2), FEE), Err(LotteryError::NotOpen));
        assert_eq!(lottery.number_of_players(), 1);
    }

    #[test]
    fn test_underpaid_entry_while_calculating_reports_payment() {
        let (mut lottery, mut ledger, mut provider) = setup();
        ready_for_upkeep(&mut lottery, &mut ledger);
        lottery.perform_upkeep(&[], &ledger, &mut provider).unwrap();

        // fee is checked before the phase
        assert_eq!(
            lottery.enter(player(2), FEE - 1),
            Err(LotteryError::InsufficientPayment {
                sent: FEE - 1,
                required: FEE
            })
        );
        assert_eq!(lottery.enter(player(2), FEE), Err(LotteryError::NotOpen));
        assert_eq!(lottery.number_of_players(), 1);
    }

    #[test]
    fn test_check_upkeep_without_players() {
        let (lottery, mut ledger, _) = setup();
        ledger.now += INTERVAL + 1;
        assert_eq!(lottery.check_upkeep(&[], &ledger), (false, Vec::new()));
    }

    #[test]
    fn test_check_upkeep_before_interval() {
        let (mut lottery, mut ledger, _) = setup();
        pay_and_enter(&mut lottery, &mut ledger, player(1), FEE);
        ledger.now += INTERVAL - 1;
        assert!(!lottery.check_upkeep(&[], &ledger).0);
        ledger.now += 1;
        assert!(lottery.check_upkeep(&[], &ledger).0);
    }

    #[test]
    fn test_check_upkeep_while_calculating() {
        let (mut lottery, mut ledger, mut provider) = setup();
        ready_for_upkeep(&mut lottery, &mut ledger);
        lottery.perform_upkeep(&[], &ledger, &mut provider).unwrap();
        assert!(!lottery.check_upkeep(&[], &ledger).0);
    }

    #[test]
    fn test_check_upkeep_ignores_payload() {
        let (mut lottery, mut ledger, _) = setup();
        ready_for_upkeep(&mut lottery, &mut ledger);
        assert_eq!(lottery.check_upkeep(b"anything", &ledger), (true, Vec::new()));
    }

    #[test]
    fn test_perform_upkeep_not_needed() {
        let (mut lottery, mut ledger, mut provider) = setup();
        pay_and_enter(&mut lottery, &mut ledger, player(1), FEE);

        let err = lottery
            .perform_upkeep(&[], &ledger, &mut provider)
            .unwrap_err();
        assert_eq!(
            err,
            LotteryError::UpkeepNotNeeded {
                balance: FEE,
                players: 1,
                state: LotteryPhase::Open,
            }
        );
        assert_eq!(lottery.phase(), LotteryPhase::Open);
        assert!(provider.requests.is_empty());
    }

    #[test]
    fn test_perform_upkeep_requests_randomness() {
        let (mut lottery, mut ledger, mut provider) = setup();
        ready_for_upkeep(&mut lottery, &mut ledger);
        lottery.drain_events();

        let request_id = lottery.perform_upkeep(&[], &ledger, &mut provider).unwrap();
        assert_eq!(request_id, 1);
        assert_eq!(lottery.phase(), LotteryPhase::Calculating);
        assert_eq!(lottery.pending_request(), Some(1));
        assert_eq!(
            provider.requests,
            vec![RandomnessRequest {
                key_hash: gas_lane(),
                subscription_id: 1,
                request_confirmations: 3,
                callback_gas_limit: 500_000,
                num_words: 1,
                consumer: *lottery.address(),
            }]
        );
        assert_eq!(
            lottery.drain_events(),
            vec![LotteryEvent::RequestedLotteryWinner { request_id: 1 }]
        );
    }

    #[test]
    fn test_perform_upkeep_twice() {
        let (mut lottery, mut ledger, mut provider) = setup();
        ready_for_upkeep(&mut lottery, &mut ledger);
        lottery.perform_upkeep(&[], &ledger, &mut provider).unwrap();

        let err = lottery
            .perform_upkeep(&[], &ledger, &mut provider)
            .unwrap_err();
        assert!(matches!(
            err,
            LotteryError::UpkeepNotNeeded {
                state: LotteryPhase::Calculating,
                ..
            }
        ));
        assert_eq!(provider.requests.len(), 1);
    }

    #[test]
    fn test_perform_upkeep_provider_failure() {
        let (mut lottery, mut ledger, mut provider) = setup();
        ready_for_upkeep(&mut lottery, &mut ledger);
        provider.failure = Some(CoordinatorError::InvalidSubscription(1));

        assert_eq!(
            lottery.perform_upkeep(&[], &ledger, &mut provider),
            Err(LotteryError::Provider(CoordinatorError::InvalidSubscription(1)))
        );
        assert_eq!(lottery.phase(), LotteryPhase::Open);
        assert_eq!(lottery.pending_request(), None);
    }

    #[test]
    fn test_fulfill_from_wrong_caller() {
        let (mut lottery, mut ledger, mut provider) = setup();
        ready_for_upkeep(&mut lottery, &mut ledger);
        lottery.perform_upkeep(&[], &ledger, &mut provider).unwrap();

        let intruder = player(9);
        let err = lottery
            .raw_fulfill_random_words(&intruder, 1, &[U256::from(7u64)], &mut ledger)
            .unwrap_err();
        assert_eq!(
            err,
            LotteryError::OnlyCoordinatorCanFulfill {
                caller: intruder,
                expected: coordinator(),
            }
        );
        assert_eq!(lottery.phase(), LotteryPhase::Calculating);
    }

    #[test]
    fn test_fulfill_unknown_request() {
        let (mut lottery, mut ledger, mut provider) = setup();
        ready_for_upkeep(&mut lottery, &mut ledger);

        // nothing pending yet
        assert_eq!(
            lottery.raw_fulfill_random_words(&coordinator(), 0, &[U256::one()], &mut ledger),
            Err(LotteryError::UnrecognizedRequest(0))
        );

        lottery.perform_upkeep(&[], &ledger, &mut provider).unwrap();
        assert_eq!(
            lottery.raw_fulfill_random_words(&coordinator(), 2, &[U256::one()], &mut ledger),
            Err(LotteryError::UnrecognizedRequest(2))
        );
        assert_eq!(lottery.pending_request(), Some(1));
        assert_eq!(lottery.number_of_players(), 1);
    }

    #[test]
    fn test_fulfill_without_words() {
        let (mut lottery, mut ledger, mut provider) = setup();
        ready_for_upkeep(&mut lottery, &mut ledger);
        lottery.perform_upkeep(&[], &ledger, &mut provider).unwrap();

        assert_eq!(
            lottery.raw_fulfill_random_words(&coordinator(), 1, &[], &mut ledger),
            Err(LotteryError::EmptyRandomWords(1))
        );
        assert_eq!(lottery.phase(), LotteryPhase::Calculating);
    }

    #[test]
    fn test_single_player_round() {
        let (mut lottery, mut ledger, mut provider) = setup();
        let alice = player(1);
        ledger.credit(&alice, COIN_VALUE);
        ledger.transfer(&alice, lottery.address(), FEE).unwrap();
        lottery.enter(alice, FEE).unwrap();

        ledger.now += 31;
        assert!(lottery.check_upkeep(&[], &ledger).0);
        let request_id = lottery.perform_upkeep(&[], &ledger, &mut provider).unwrap();
        assert_eq!(request_id, 1);

        lottery
            .raw_fulfill_random_words(&coordinator(), 1, &[U256::from(7u64)], &mut ledger)
            .unwrap();

        assert_eq!(lottery.recent_winner(), Some(&alice));
        assert_eq!(lottery.phase(), LotteryPhase::Open);
        assert_eq!(lottery.number_of_players(), 0);
        assert_eq!(lottery.balance(), 0);
        assert_eq!(lottery.pending_request(), None);
        assert_eq!(lottery.latest_timestamp(), START + 31);
        assert_eq!(ledger.balance_of(&alice), COIN_VALUE);
        assert_eq!(ledger.balance_of(lottery.address()), 0);
        assert_eq!(
            lottery.drain_events().last(),
            Some(&LotteryEvent::WinnerPicked { winner: alice })
        );
    }

    #[test]
    fn test_four_player_round_pays_indexed_winner() {
        let (mut lottery, mut ledger, mut provider) = setup();
        for n in 0..4 {
            pay_and_enter(&mut lottery, &mut ledger, player(n), FEE);
        }
        ledger.now += INTERVAL + 1;
        lottery.perform_upkeep(&[], &ledger, &mut provider).unwrap();

        // 1_000_003 mod 4 = 3
        lottery
            .raw_fulfill_random_words(&coordinator(), 1, &[U256::from(1_000_003u64)], &mut ledger)
            .unwrap();
        assert_eq!(lottery.recent_winner(), Some(&player(3)));
        assert_eq!(ledger.balance_of(&player(3)), FEE * 4);
    }

    #[test]
    fn test_only_first_word_is_used() {
        let (mut lottery, mut ledger, mut provider) = setup();
        for n in 0..2 {
            pay_and_enter(&mut lottery, &mut ledger, player(n), FEE);
        }
        ledger.now += INTERVAL;
        lottery.perform_upkeep(&[], &ledger, &mut provider).unwrap();
        lottery
            .raw_fulfill_random_words(
                &coordinator(),
                1,
                &[U256::from(2u64), U256::from(1u64)],
                &mut ledger,
            )
            .unwrap();
        assert_eq!(lottery.recent_winner(), Some(&player(0)));
    }

    #[test]
    fn test_failed_payout_keeps_round() {
        let (mut lottery, mut ledger, mut provider) = setup();
        ready_for_upkeep(&mut lottery, &mut ledger);
        lottery.perform_upkeep(&[], &ledger, &mut provider).unwrap();
        lottery.drain_events();
        ledger.rejecting.insert(player(1));

        let err = lottery
            .raw_fulfill_random_words(&coordinator(), 1, &[U256::zero()], &mut ledger)
            .unwrap_err();
        assert!(matches!(err, LotteryError::TransferFailed { .. }));
        assert_eq!(lottery.phase(), LotteryPhase::Calculating);
        assert_eq!(lottery.pending_request(), Some(1));
        assert_eq!(lottery.balance(), FEE);
        assert_eq!(lottery.recent_winner(), None);
        assert!(lottery.events().is_empty());

        // a later delivery succeeds once the winner accepts funds
        ledger.rejecting.clear();
        lottery
            .raw_fulfill_random_words(&coordinator(), 1, &[U256::zero()], &mut ledger)
            .unwrap();
        assert_eq!(lottery.recent_winner(), Some(&player(1)));
    }

    #[test]
    fn test_late_fulfillment_keeps_timestamp_monotonic() {
        let (mut lottery, mut ledger, mut provider) = setup();
        ready_for_upkeep(&mut lottery, &mut ledger);
        lottery.perform_upkeep(&[], &ledger, &mut provider).unwrap();

        // ledger clock behind the recorded timestamp
        ledger.now = START - 10;
        lottery
            .raw_fulfill_random_words(&coordinator(), 1, &[U256::zero()], &mut ledger)
            .unwrap();
        assert_eq!(lottery.latest_timestamp(), START);
    }

    #[test]
    fn test_second_round_after_settlement() {
        let (mut lottery, mut ledger, mut provider) = setup();
        ready_for_upkeep(&mut lottery, &mut ledger);
        lottery.perform_upkeep(&[], &ledger, &mut provider).unwrap();
        lottery
            .raw_fulfill_random_words(&coordinator(), 1, &[U256::zero()], &mut ledger)
            .unwrap();

        pay_and_enter(&mut lottery, &mut ledger, player(2), FEE);
        assert!(!lottery.check_upkeep(&[], &ledger).0);
        ledger.now += INTERVAL;
        assert_eq!(lottery.perform_upkeep(&[], &ledger, &mut provider), Ok(2));
    }

    #[test]
    fn test_snapshot_restore() {
        let (mut lottery, mut ledger, mut provider) = setup();
        ready_for_upkeep(&mut lottery, &mut ledger);
        lottery.perform_upkeep(&[], &ledger, &mut provider).unwrap();

        let snapshot = lottery.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let restored = Lottery::restore(serde_json::from_str(&json).unwrap()).unwrap();
        assert_eq!(restored.snapshot(), snapshot);
        assert_eq!(restored.pending_request(), Some(1));
        assert!(restored.events().is_empty());
    }

    #[test]
    fn test_restore_rejects_inconsistent_state() {
        let (lottery, _, _) = setup();
        let mut snapshot = lottery.snapshot();
        snapshot.state.phase = LotteryPhase::Calculating;
        let err = Lottery::restore(snapshot).unwrap_err();
        assert!(err.is_fatal());
    }
}
