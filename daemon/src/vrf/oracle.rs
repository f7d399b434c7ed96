// Oracle worker
//
// Plays the off-chain VRF node: watches the coordinator for pending
// requests and fulfills each one once it has waited `fulfillment_delay`
// seconds. Rejected fulfillments stay pending and are retried on the
// next tick. When the subscription runs dry it is topped up before
// retrying.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use indexmap::IndexMap;
use log::{debug, error, info, warn};
use tokio::{
    sync::{Mutex, Notify},
    task::JoinHandle,
    time::interval,
};

use lottery_common::{
    time::{elapsed_seconds, TimestampSeconds},
    vrf::{CoordinatorError, RequestId},
};

use crate::{
    error::{NodeError, NodeResult},
    node::{LotteryNode, SharedNode},
};

use super::FulfillmentReceipt;

pub struct OracleWorker {
    node: SharedNode,
    poll_interval: Duration,
    fulfillment_delay: TimestampSeconds,
    // Added to the subscription when a payment does not fit, 0 disables
    subscription_top_up: u64,
    // When each pending request was first observed
    first_seen: Mutex<IndexMap<RequestId, TimestampSeconds>>,
    running: AtomicBool,
    shutdown: Notify,
}

impl OracleWorker {
    pub fn new(
        node: SharedNode,
        poll_interval: Duration,
        fulfillment_delay: TimestampSeconds,
    ) -> Self {
        Self {
            node,
            poll_interval,
            fulfillment_delay,
            subscription_top_up: 0,
            first_seen: Mutex::new(IndexMap::new()),
            running: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    pub fn with_subscription_top_up(mut self, amount: u64) -> Self {
        self.subscription_top_up = amount;
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_waiters();
    }

    /// Fulfill every pending request that waited long enough.
    /// Only a fatal error aborts the pass.
    pub async fn poll_once(&self) -> NodeResult<Vec<FulfillmentReceipt>> {
        let mut node = self.node.lock().await;
        let mut first_seen = self.first_seen.lock().await;
        let now = node.now();
        let pending = node.pending_requests();
        first_seen.retain(|id, _| pending.contains(id));

        let mut receipts = Vec::new();
        for request_id in pending {
            let seen = *first_seen.entry(request_id).or_insert(now);
            if elapsed_seconds(seen, now) < self.fulfillment_delay {
                continue;
            }

            match self.fulfill(&mut node, request_id) {
                Ok(receipt) => {
                    first_seen.shift_remove(&request_id);
                    receipts.push(receipt);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    if log::log_enabled!(log::Level::Warn) {
                        warn!("Request {} not fulfilled, will retry: {}", request_id, e);
                    }
                }
            }
        }

        for event in node.drain_events() {
            if log::log_enabled!(log::Level::Info) {
                info!("{}", event);
            }
        }
        for event in node.drain_coordinator_events() {
            debug!("{:?}", event);
        }
        Ok(receipts)
    }

    // Fulfill once, topping up the subscription if it cannot pay
    fn fulfill(
        &self,
        node: &mut LotteryNode,
        request_id: RequestId,
    ) -> NodeResult<FulfillmentReceipt> {
        match node.fulfill(request_id) {
            Err(NodeError::Coordinator(CoordinatorError::InsufficientBalance {
                subscription_id,
                need,
                have,
            })) if self.subscription_top_up > 0 => {
                if log::log_enabled!(log::Level::Info) {
                    info!(
                        "Subscription {} has {} but needs {}, topping up by {}",
                        subscription_id, have, need, self.subscription_top_up
                    );
                }
                node.fund_subscription(self.subscription_top_up)?;
                node.fulfill(request_id)
            }
            result => result,
        }
    }

    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        tokio::spawn(async move { self.run().await })
    }

    async fn run(self: Arc<Self>) {
        if log::log_enabled!(log::Level::Info) {
            info!(
                "Oracle started, polling every {:?} with a {}s fulfillment delay",
                self.poll_interval, self.fulfillment_delay
            );
        }

        let mut timer = interval(self.poll_interval);
        while self.is_running() {
            tokio::select! {
                _ = timer.tick() => {
                    match self.poll_once().await {
                        Ok(receipts) => {
                            for receipt in receipts {
                                debug!(
                                    "Request {} fulfilled, payment {}",
                                    receipt.request_id, receipt.payment
                                );
                            }
                        }
                        Err(e) => {
                            error!("Oracle halted: {}", e);
                            self.stop();
                        }
                    }
                }
                _ = self.shutdown.notified() => {}
            }
        }

        if log::log_enabled!(log::Level::Info) {
            info!("Oracle stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use lottery_common::{config::COIN_VALUE, crypto::Address, network::Network};

    use crate::{
        clock::ManualClock,
        node::{DeploymentSettings, LotteryNode},
    };

    use super::*;

    // A node with one entry and a pending request
    async fn setup() -> (SharedNode, Arc<ManualClock>, Address) {
        setup_with(DeploymentSettings::new(Network::Devnet)).await
    }

    async fn setup_with(settings: DeploymentSettings) -> (SharedNode, Arc<ManualClock>, Address) {
        let clock = Arc::new(ManualClock::new(0));
        let mut node = LotteryNode::deploy(&settings, clock.clone()).unwrap();
        let player = Address::derive(b"player");
        node.fund_account(&player, COIN_VALUE).unwrap();
        node.enter(player, COIN_VALUE / 10).unwrap();
        clock.advance(30);
        node.perform_upkeep().unwrap();
        (Arc::new(Mutex::new(node)), clock, player)
    }

    #[tokio::test]
    async fn test_fulfills_after_delay() {
        let (node, clock, player) = setup().await;
        let oracle = OracleWorker::new(node.clone(), Duration::from_millis(10), 3);

        assert!(oracle.poll_once().await.unwrap().is_empty());
        clock.advance(2);
        assert!(oracle.poll_once().await.unwrap().is_empty());
        clock.advance(1);
        let receipts = oracle.poll_once().await.unwrap();
        assert_eq!(receipts.len(), 1);
        assert_eq!(receipts[0].request_id, 1);

        let node = node.lock().await;
        assert_eq!(node.lottery().recent_winner(), Some(&player));
        assert!(node.pending_requests().is_empty());
    }

    #[tokio::test]
    async fn test_retries_rejected_fulfillment() {
        let (node, _, player) = setup().await;
        let oracle = OracleWorker::new(node.clone(), Duration::from_millis(10), 0);

        node.lock().await.ledger_mut().reject_transfers_to(player);
        assert!(oracle.poll_once().await.unwrap().is_empty());
        assert_eq!(node.lock().await.pending_requests(), vec![1]);

        node.lock().await.ledger_mut().accept_transfers_to(&player);
        assert_eq!(oracle.poll_once().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_tops_up_empty_subscription() {
        let mut settings = DeploymentSettings::new(Network::Devnet);
        settings.subscription_fund_amount = 0;
        let (node, _, player) = setup_with(settings).await;

        let oracle = OracleWorker::new(node.clone(), Duration::from_millis(10), 0);
        assert!(oracle.poll_once().await.unwrap().is_empty());
        assert_eq!(node.lock().await.pending_requests(), vec![1]);

        let oracle = oracle.with_subscription_top_up(COIN_VALUE);
        let receipts = oracle.poll_once().await.unwrap();
        assert_eq!(receipts.len(), 1);

        let node = node.lock().await;
        let id = node.lottery().config().subscription_id;
        assert_eq!(
            node.coordinator().get_subscription(id).unwrap().balance,
            COIN_VALUE - receipts[0].payment
        );
        assert_eq!(node.lottery().recent_winner(), Some(&player));
    }

    #[tokio::test]
    async fn test_poll_once_drains_events() {
        let (node, _, _) = setup().await;
        let oracle = OracleWorker::new(node.clone(), Duration::from_millis(10), 0);
        oracle.poll_once().await.unwrap();

        let node = node.lock().await;
        assert!(node.coordinator().events().is_empty());
        assert!(node.lottery().events().is_empty());
    }

    #[tokio::test]
    async fn test_run_and_stop() {
        let (node, _, player) = setup().await;
        let oracle = Arc::new(OracleWorker::new(node.clone(), Duration::from_millis(5), 0));
        let handle = oracle.clone().start();

        for _ in 0..100 {
            if node.lock().await.lottery().recent_winner().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        oracle.stop();
        handle.await.unwrap();
        assert_eq!(node.lock().await.lottery().recent_winner(), Some(&player));
    }
}
