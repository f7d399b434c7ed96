use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Result;
use clap::Parser;
use log::{error, info, warn};
use tokio::{sync::Mutex, task::JoinHandle, time::interval};

use lottery_common::{utils::format_coin, vrf::RandomnessProvider};
use lottery_daemon::{
    clock::{Clock, SystemClock},
    config::{CliConfig, ConfigValidator, ValidatedConfig},
    keeper::Keeper,
    logger::{default_logs_datetime_format, init_logger, LoggerConfig},
    node::{LotteryNode, SharedNode},
    simulator::PlayerSimulator,
    storage::SnapshotStorage,
    vrf::OracleWorker,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli_config = CliConfig::parse();

    // Handle config template generation
    if let Some(path) = cli_config.config_file.as_ref() {
        if cli_config.generate_config_template {
            if Path::new(path).exists() {
                eprintln!("Config file already exists at {path}");
                eprintln!("Use a different path or remove the existing file");
                return Ok(());
            }

            ValidatedConfig::generate_template(path)?;
            println!("Configuration template generated at {path}");
            println!("Edit the file and run the node with --config-file {path}");
            return Ok(());
        }
    }

    // Load and validate configuration
    let config = if let Some(config_path) = &cli_config.config_file {
        println!("Loading configuration from: {config_path}");
        ValidatedConfig::from_file(
            config_path,
            cli_config.strict_validation,
            !cli_config.no_auto_fix,
        )?
    } else {
        let mut config = cli_config.to_validated_config();
        let validator = ConfigValidator::new(config.strict_validation, config.auto_fix_config);
        let messages = validator.validate(&mut config)?;

        if !messages.is_empty() {
            println!(
                "Configuration validation completed with {} message(s)",
                messages.len()
            );
        }

        config
    };

    init_logger(LoggerConfig {
        level: config.log_level,
        dir_path: &config.logs_path,
        filename_log: &config.filename_log,
        disable_file_logging: config.disable_file_logging,
        disable_colors: config.disable_log_color,
        datetime_format: default_logs_datetime_format(),
    })?;

    if log::log_enabled!(log::Level::Info) {
        info!("Lottery node v{} starting...", env!("CARGO_PKG_VERSION"));
        info!("Network: {}", config.network);
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let storage = if config.disable_storage {
        None
    } else {
        Some(SnapshotStorage::new(PathBuf::from(&config.storage_path), config.network).await?)
    };

    let snapshot = match &storage {
        Some(storage) => storage.load().await?,
        None => None,
    };
    let deployed = snapshot.is_none();
    let node = match snapshot {
        Some(snapshot) => LotteryNode::restore(snapshot, clock)?,
        None => {
            let node = LotteryNode::deploy(&config.to_deployment_settings(), clock)?;
            if log::log_enabled!(log::Level::Info) {
                info!(
                    "Deployed lottery {} with coordinator {}, entrance fee {}, interval {}s",
                    node.lottery().address(),
                    node.coordinator().address(),
                    format_coin(node.lottery().entrance_fee()),
                    node.lottery().interval()
                );
            }
            node
        }
    };
    let node: SharedNode = Arc::new(Mutex::new(node));

    let keeper = Arc::new(Keeper::new(node.clone(), config.keeper_poll_interval()));
    let oracle = Arc::new(
        OracleWorker::new(
            node.clone(),
            config.oracle_poll_interval(),
            config.fulfillment_delay(),
        )
        .with_subscription_top_up(config.subscription_top_up_amount),
    );

    let mut handles: Vec<JoinHandle<()>> = vec![keeper.clone().start(), oracle.clone().start()];

    let simulator = if config.simulated_players > 0 {
        let simulator = Arc::new(PlayerSimulator::new(
            node.clone(),
            config.simulated_players,
            config.simulated_entry_interval(),
        ));
        // restored players keep the balances of the snapshot
        if deployed {
            simulator.fund_players(config.simulated_player_funds).await?;
        }
        handles.push(simulator.clone().start());
        Some(simulator)
    } else {
        None
    };

    let mut save_timer = interval(config.save_interval());
    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    error!("Failed to listen for shutdown signal: {}", e);
                }
                info!("Shutdown requested");
                break;
            }
            _ = save_timer.tick() => {
                if let Some(storage) = &storage {
                    let snapshot = node.lock().await.snapshot();
                    if let Err(e) = storage.save(&snapshot).await {
                        if log::log_enabled!(log::Level::Warn) {
                            warn!("Failed to save snapshot: {}", e);
                        }
                    }
                }

                if !keeper.is_running() || !oracle.is_running() {
                    error!("A worker halted, shutting down");
                    break;
                }
            }
        }
    }

    keeper.stop();
    oracle.stop();
    if let Some(simulator) = &simulator {
        simulator.stop();
    }
    for handle in handles {
        if let Err(e) = handle.await {
            error!("Worker task failed: {}", e);
        }
    }

    if let Some(storage) = &storage {
        let snapshot = node.lock().await.snapshot();
        storage.save(&snapshot).await?;
        if log::log_enabled!(log::Level::Info) {
            info!("Snapshot saved to {}", storage.path().display());
        }
    }

    Ok(())
}
