// Lottery node
//
// Owns one local deployment: the ledger, the VRF coordinator mock and the
// lottery consuming it. Every operation goes through the node so that
// payments and state changes happen together or not at all.

use std::sync::Arc;

use indexmap::IndexMap;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use lottery_common::{
    config::{DEFAULT_BASE_FEE, DEFAULT_GAS_PRICE_LINK, DEFAULT_SUBSCRIPTION_FUND_AMOUNT},
    crypto::{Address, U256},
    ledger::Ledger,
    lottery::{
        Lottery, LotteryConfig, LotteryError, LotteryEvent, LotterySnapshot, UpkeepStatus,
    },
    network::Network,
    time::TimestampSeconds,
    vrf::{RandomnessProvider, RequestId},
};

use crate::{
    clock::Clock,
    error::{NodeError, NodeResult},
    ledger::MemoryLedger,
    vrf::{CoordinatorEvent, FulfillmentReceipt, VrfCoordinatorMock},
};

/// Parameters of a local deployment. Unset values come from the network preset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentSettings {
    pub network: Network,
    pub deployer: Address,
    pub entrance_fee: Option<u64>,
    pub interval: Option<TimestampSeconds>,
    pub callback_gas_limit: Option<u32>,
    pub base_fee: u64,
    pub gas_price_link: u64,
    pub subscription_fund_amount: u64,
}

impl DeploymentSettings {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            deployer: Address::derive(b"deployer"),
            entrance_fee: None,
            interval: None,
            callback_gas_limit: None,
            base_fee: DEFAULT_BASE_FEE,
            gas_price_link: DEFAULT_GAS_PRICE_LINK,
            subscription_fund_amount: DEFAULT_SUBSCRIPTION_FUND_AMOUNT,
        }
    }

    /// Lottery parameters for this deployment once the coordinator and
    /// subscription are known.
    pub fn lottery_config(
        &self,
        vrf_coordinator: Address,
        subscription_id: u64,
    ) -> LotteryConfig {
        let preset = self.network.preset();
        LotteryConfig {
            vrf_coordinator,
            entrance_fee: self.entrance_fee.unwrap_or(preset.entrance_fee),
            gas_lane: preset.gas_lane,
            subscription_id,
            callback_gas_limit: self.callback_gas_limit.unwrap_or(preset.callback_gas_limit),
            interval: self.interval.unwrap_or(preset.interval),
        }
    }
}

/// Everything needed to bring a node back after a restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    pub network: Network,
    pub deployer: Address,
    pub balances: IndexMap<Address, u64>,
    pub coordinator: VrfCoordinatorMock,
    pub lottery: LotterySnapshot,
    pub saved_at: TimestampSeconds,
}

/// Node shared between the workers.
pub type SharedNode = Arc<Mutex<LotteryNode>>;

pub struct LotteryNode {
    network: Network,
    deployer: Address,
    clock: Arc<dyn Clock>,
    ledger: MemoryLedger,
    coordinator: VrfCoordinatorMock,
    lottery: Lottery,
}

impl LotteryNode {
    /// Deploy the coordinator mock, create and fund a subscription, then
    /// deploy the lottery and register it as a consumer.
    pub fn deploy(settings: &DeploymentSettings, clock: Arc<dyn Clock>) -> NodeResult<Self> {
        let network = settings.network;
        if !network.is_development() {
            return Err(NodeError::UnsupportedNetwork(network));
        }

        let deployer = settings.deployer;
        let preset = network.preset();
        if log::log_enabled!(log::Level::Info) {
            info!(
                "Deploying on {} (chain id {}) from {}",
                preset.name,
                network.chain_id(),
                deployer
            );
        }

        let mut coordinator = VrfCoordinatorMock::new(
            Address::contract(&deployer, 0),
            settings.base_fee,
            settings.gas_price_link,
        );
        let subscription_id = coordinator.create_subscription(deployer);
        coordinator.fund_subscription(subscription_id, settings.subscription_fund_amount)?;

        let ledger = MemoryLedger::new(clock.clone());
        let config = settings.lottery_config(*coordinator.address(), subscription_id);
        let lottery = Lottery::new(
            Address::contract(&deployer, 1),
            config,
            ledger.current_time(),
        );
        coordinator.add_consumer(&deployer, subscription_id, *lottery.address())?;

        if log::log_enabled!(log::Level::Info) {
            info!(
                "Coordinator at {}, lottery at {}, subscription {}",
                coordinator.address(),
                lottery.address(),
                subscription_id
            );
        }

        Ok(Self {
            network,
            deployer,
            clock,
            ledger,
            coordinator,
            lottery,
        })
    }

    /// Rebuild a node from a snapshot, checking that its parts agree.
    pub fn restore(snapshot: NodeSnapshot, clock: Arc<dyn Clock>) -> NodeResult<Self> {
        if !snapshot.network.is_development() {
            return Err(NodeError::UnsupportedNetwork(snapshot.network));
        }

        let lottery = Lottery::restore(snapshot.lottery)?;
        let coordinator = snapshot.coordinator;

        if lottery.config().vrf_coordinator != *coordinator.address() {
            return Err(LotteryError::InvariantViolation(
                "lottery bound to another coordinator",
            )
            .into());
        }

        if let Some(request_id) = lottery.pending_request() {
            if coordinator.pending_request(request_id).is_none() {
                return Err(LotteryError::InvariantViolation(
                    "pending request unknown to the coordinator",
                )
                .into());
            }
        }

        let ledger = MemoryLedger::with_balances(clock.clone(), snapshot.balances);
        if ledger.balance_of(lottery.address()) < lottery.balance() {
            return Err(LotteryError::InvariantViolation(
                "lottery account does not hold the pot",
            )
            .into());
        }

        if log::log_enabled!(log::Level::Info) {
            info!(
                "Restored lottery {} saved at {}: {} players, phase {}",
                lottery.address(),
                snapshot.saved_at,
                lottery.number_of_players(),
                lottery.phase()
            );
        }

        Ok(Self {
            network: snapshot.network,
            deployer: snapshot.deployer,
            clock,
            ledger,
            coordinator,
            lottery,
        })
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            network: self.network,
            deployer: self.deployer,
            balances: self.ledger.balances().clone(),
            coordinator: self.coordinator.clone(),
            lottery: self.lottery.snapshot(),
            saved_at: self.clock.now(),
        }
    }

    /// Mint funds to an account of the local ledger.
    pub fn fund_account(&mut self, account: &Address, amount: u64) -> NodeResult<()> {
        self.ledger.credit(account, amount)?;
        Ok(())
    }

    /// Add `amount` to the subscription paying for the lottery's requests.
    pub fn fund_subscription(&mut self, amount: u64) -> NodeResult<()> {
        let subscription_id = self.lottery.config().subscription_id;
        self.coordinator.fund_subscription(subscription_id, amount)?;
        Ok(())
    }

    /// Pay `value` from `player` to the lottery and record the entry.
    pub fn enter(&mut self, player: Address, value: u64) -> NodeResult<()> {
        self.lottery.validate_entry(value)?;

        let lottery = *self.lottery.address();
        self.ledger.transfer(&player, &lottery, value)?;

        if let Err(e) = self.lottery.enter(player, value) {
            // validated above, refund to keep the ledger consistent
            warn!("Entry of {} failed after payment: {}", player, e);
            self.ledger.transfer(&lottery, &player, value)?;
            return Err(e.into());
        }
        Ok(())
    }

    pub fn upkeep_status(&self) -> UpkeepStatus {
        self.lottery.upkeep_status(self.ledger.current_time())
    }

    pub fn check_upkeep(&self) -> bool {
        self.lottery.check_upkeep(&[], &self.ledger).0
    }

    pub fn perform_upkeep(&mut self) -> NodeResult<RequestId> {
        let request_id = self
            .lottery
            .perform_upkeep(&[], &self.ledger, &mut self.coordinator)?;
        Ok(request_id)
    }

    pub fn pending_requests(&self) -> Vec<RequestId> {
        self.coordinator.pending_requests()
    }

    /// Answer a pending request with derived random words.
    pub fn fulfill(&mut self, request_id: RequestId) -> NodeResult<FulfillmentReceipt> {
        let receipt = self.coordinator.fulfill_random_words(
            request_id,
            &mut self.lottery,
            &mut self.ledger,
        )?;
        Ok(receipt)
    }

    /// Answer a pending request with the given words.
    pub fn fulfill_with_words(
        &mut self,
        request_id: RequestId,
        random_words: Vec<U256>,
    ) -> NodeResult<FulfillmentReceipt> {
        let receipt = self.coordinator.fulfill_random_words_with_override(
            request_id,
            &mut self.lottery,
            random_words,
            &mut self.ledger,
        )?;
        Ok(receipt)
    }

    pub fn drain_events(&mut self) -> Vec<LotteryEvent> {
        self.lottery.drain_events()
    }

    pub fn drain_coordinator_events(&mut self) -> Vec<CoordinatorEvent> {
        self.coordinator.drain_events()
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn deployer(&self) -> &Address {
        &self.deployer
    }

    pub fn now(&self) -> TimestampSeconds {
        self.clock.now()
    }

    pub fn lottery(&self) -> &Lottery {
        &self.lottery
    }

    pub fn ledger(&self) -> &MemoryLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut MemoryLedger {
        &mut self.ledger
    }

    pub fn coordinator(&self) -> &VrfCoordinatorMock {
        &self.coordinator
    }

    pub fn coordinator_mut(&mut self) -> &mut VrfCoordinatorMock {
        &mut self.coordinator
    }
}
