// Upkeep keeper
//
// Polls the lottery and closes the round as soon as upkeep is needed.
// Any party may perform upkeep, this worker is just the local one.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use log::{debug, error, info, trace, warn};
use tokio::{sync::Notify, task::JoinHandle, time::interval};

use lottery_common::vrf::RequestId;

use crate::{error::NodeResult, node::SharedNode};

pub struct Keeper {
    node: SharedNode,
    poll_interval: Duration,
    running: AtomicBool,
    shutdown: Notify,
}

impl Keeper {
    pub fn new(node: SharedNode, poll_interval: Duration) -> Self {
        Self {
            node,
            poll_interval,
            running: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_waiters();
    }

    /// Check upkeep once and perform it when needed.
    pub async fn poll_once(&self) -> NodeResult<Option<RequestId>> {
        let mut node = self.node.lock().await;
        let result = if node.check_upkeep() {
            node.perform_upkeep().map(Some)
        } else {
            if log::log_enabled!(log::Level::Trace) {
                trace!("Upkeep not needed: {:?}", node.upkeep_status());
            }
            Ok(None)
        };

        for event in node.drain_events() {
            if log::log_enabled!(log::Level::Info) {
                info!("{}", event);
            }
        }
        for event in node.drain_coordinator_events() {
            debug!("{:?}", event);
        }
        result
    }

    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        tokio::spawn(async move { self.run().await })
    }

    async fn run(self: Arc<Self>) {
        if log::log_enabled!(log::Level::Info) {
            info!("Keeper started, polling every {:?}", self.poll_interval);
        }

        let mut timer = interval(self.poll_interval);
        while self.is_running() {
            tokio::select! {
                _ = timer.tick() => {
                    match self.poll_once().await {
                        Ok(Some(request_id)) => debug!("Upkeep performed, request {}", request_id),
                        Ok(None) => {}
                        Err(e) if e.is_fatal() => {
                            error!("Keeper halted: {}", e);
                            self.stop();
                        }
                        Err(e) => {
                            if log::log_enabled!(log::Level::Warn) {
                                warn!("Upkeep failed: {}", e);
                            }
                        }
                    }
                }
                _ = self.shutdown.notified() => {}
            }
        }

        if log::log_enabled!(log::Level::Info) {
            info!("Keeper stopped");
        }
    }
}
