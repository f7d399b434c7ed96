// Lottery daemon library
// Exposes the node and its workers for the binary and the integration tests

pub mod clock;
pub mod config;
pub mod error;
pub mod keeper;
pub mod ledger;
pub mod logger;
pub mod node;
pub mod simulator;
pub mod storage;
pub mod vrf;
