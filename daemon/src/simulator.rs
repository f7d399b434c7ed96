// Player simulator
//
// Generates traffic on a local deployment: a fixed set of funded players
// buy one ticket each tick, picked at random.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use log::{debug, info, warn};
use rand::Rng;
use tokio::{sync::Notify, task::JoinHandle, time::interval};

use lottery_common::{
    crypto::Address, ledger::Ledger, lottery::LotteryPhase, utils::format_coin,
};

use crate::{error::NodeResult, node::SharedNode};

pub struct PlayerSimulator {
    node: SharedNode,
    players: Vec<Address>,
    entry_interval: Duration,
    running: AtomicBool,
    shutdown: Notify,
}

impl PlayerSimulator {
    pub fn new(node: SharedNode, player_count: usize, entry_interval: Duration) -> Self {
        let players = (0..player_count)
            .map(|i| Address::derive(format!("simulated-player-{i}").as_bytes()))
            .collect();

        Self {
            node,
            players,
            entry_interval,
            running: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    pub fn players(&self) -> &[Address] {
        &self.players
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_waiters();
    }

    /// Bring every simulated player up to a balance of `amount`.
    /// Returns the total minted.
    pub async fn fund_players(&self, amount: u64) -> NodeResult<u64> {
        let mut node = self.node.lock().await;
        let mut minted = 0u64;
        for player in &self.players {
            let missing = amount.saturating_sub(node.ledger().balance_of(player));
            if missing > 0 {
                node.fund_account(player, missing)?;
                minted = minted.saturating_add(missing);
            }
        }

        if log::log_enabled!(log::Level::Info) {
            info!(
                "Funded {} simulated players up to {} each, minted {}",
                self.players.len(),
                format_coin(amount),
                format_coin(minted)
            );
        }
        Ok(minted)
    }

    /// Enter one random player at the entrance fee. Returns the player, or
    /// `None` when the lottery is not accepting entries.
    pub async fn poll_once(&self) -> NodeResult<Option<Address>> {
        if self.players.is_empty() {
            return Ok(None);
        }
        let index = rand::thread_rng().gen_range(0..self.players.len());
        let player = self.players[index];

        let mut node = self.node.lock().await;
        if node.lottery().phase() != LotteryPhase::Open {
            return Ok(None);
        }

        let fee = node.lottery().entrance_fee();
        node.enter(player, fee)?;
        for event in node.drain_events() {
            debug!("{}", event);
        }
        Ok(Some(player))
    }

    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        tokio::spawn(async move { self.run().await })
    }

    async fn run(self: Arc<Self>) {
        if log::log_enabled!(log::Level::Info) {
            info!(
                "Simulating {} players, one entry every {:?}",
                self.players.len(),
                self.entry_interval
            );
        }

        let mut timer = interval(self.entry_interval);
        while self.is_running() {
            tokio::select! {
                _ = timer.tick() => {
                    // an underfunded player only skips its turn
                    if let Err(e) = self.poll_once().await {
                        if log::log_enabled!(log::Level::Warn) {
                            warn!("Simulated entry failed: {}", e);
                        }
                    }
                }
                _ = self.shutdown.notified() => {}
            }
        }
    }
}
