// Luna Miner - Free and Open Source Software Statement
//
// File: src/main.rs
// Version: 3.0.1-engine
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// Run modes: --auto (mine until Ctrl+C), --single (one block), --sync (status only)

use clap::Parser;
use log::{error, info, warn};
use luna_miner::{
    Engine, Result,
    core::config::{Args, EngineConfig, SETTINGS_FILE_NAME},
    engine::{CycleOutcome, StatusReport},
    utils::{format::FormatUtils, logging::init_logging},
};
use std::time::Duration;

const LOG_TARGET: &str = "luna::miner::main";

/// How often auto mode prints a status summary
const STATUS_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = EngineConfig::load(&args.data_dir.join(SETTINGS_FILE_NAME)).await?;
    args.apply_to(&mut config)?;
    if args.single || args.sync {
        // One-shot runs never enter the auto loop, whatever the saved settings say
        config.auto_mining = false;
    }

    let log_path = init_logging(&config.data_dir, &args.log_level)?;
    info!(target: LOG_TARGET, "🌙 Luna Miner v{}", env!("CARGO_PKG_VERSION"));
    info!(target: LOG_TARGET, "📝 Logging to {}", log_path.display());
    info!(target: LOG_TARGET, "🔗 Node: {}", config.node_url);
    info!(target: LOG_TARGET, "💰 Miner address: {}", config.miner_address);
    info!(target: LOG_TARGET,
        "🧵 Threads: {} | GPU: {} | Mode: {} | Min difficulty: {}",
        config.threads,
        if config.gpu_enabled { "requested" } else { "off" },
        config.performance_mode,
        config.difficulty_hint
    );

    if let Err(e) = config.validate() {
        error!(target: LOG_TARGET, "❌ {}", e);
        return Err(e.into());
    }

    let engine = Engine::launch(config.clone()).await?;

    let result = if args.single {
        run_single(&engine).await
    } else if args.sync {
        run_sync(&engine).await
    } else if config.auto_mining {
        run_auto(&engine).await
    } else {
        info!(target: LOG_TARGET, "Nothing to do: pass --auto, --single or --sync (see --help)");
        run_sync(&engine).await
    };

    engine.shutdown().await?;
    result
}

async fn run_single(engine: &Engine) -> Result<()> {
    info!(target: LOG_TARGET, "⛏️ Mining a single block (Ctrl+C to abort)");
    let outcome = tokio::select! {
        outcome = engine.single_block() => outcome?,
        _ = tokio::signal::ctrl_c() => {
            warn!(target: LOG_TARGET, "Interrupted; stopping");
            engine.stop().await?;
            return Ok(());
        }
    };

    match outcome {
        CycleOutcome::Accepted {
            height,
            block_id,
            reward,
            transport,
        } => info!(target: LOG_TARGET,
            "✅ Block #{} accepted (id {}, reward {:.4}, {} transport)",
            height, block_id, reward, transport.as_str()
        ),
        CycleOutcome::Rejected { height, reason } => {
            warn!(target: LOG_TARGET, "❌ Block #{} rejected: {}", height, reason)
        }
        CycleOutcome::Failed { reason } => error!(target: LOG_TARGET, "❌ Mining failed: {}", reason),
        CycleOutcome::Cancelled { reason } => warn!(target: LOG_TARGET, "Mining cancelled: {}", reason),
    }
    print_status(&engine.status());
    Ok(())
}

async fn run_sync(engine: &Engine) -> Result<()> {
    match engine.sync().await {
        Ok(status) => info!(target: LOG_TARGET,
            "🌐 Network height {} | difficulty {} | mempool {} | peers {}",
            status.network_height, status.difficulty, status.mempool_size, status.peer_count
        ),
        Err(e) => error!(target: LOG_TARGET, "❌ Sync failed: {}", e),
    }
    print_status(&engine.status());
    Ok(())
}

async fn run_auto(engine: &Engine) -> Result<()> {
    engine.start().await?;
    info!(target: LOG_TARGET, "Press Ctrl+C to stop");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut report = tokio::time::interval(STATUS_INTERVAL);
    report.tick().await;

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = report.tick() => print_status(&engine.status()),
        }
    }

    info!(target: LOG_TARGET, "🛑 Stopping...");
    engine.stop().await?;
    print_status(&engine.status());
    Ok(())
}

fn print_status(report: &StatusReport) {
    let stats = &report.stats;
    info!(target: LOG_TARGET, "📊 ===== MINING STATUS =====");
    info!(target: LOG_TARGET,
        "State: {} | Auto-mining: {} | Method: {}",
        report.state,
        if report.auto_mining { "on" } else { "off" },
        report.search_method
    );
    info!(target: LOG_TARGET,
        "Network height: {} | Difficulty: {} | Mempool: {} | Connection: {}",
        stats.network_height,
        stats.difficulty,
        stats.mempool_size,
        stats.connection_status.as_str()
    );
    info!(target: LOG_TARGET,
        "Hash rate: {} | Success rate: {} | Attempts: {} | Avg block time: {:.2}s",
        FormatUtils::format_hashrate(stats.hash_rate),
        FormatUtils::format_percent(stats.success_rate),
        report.total_attempts,
        report.average_mining_time
    );
    info!(target: LOG_TARGET,
        "Blocks mined: {} | Total rewards: {:.4} | Failed: {} | Uptime: {}",
        stats.blocks_mined,
        stats.total_rewards,
        stats.failed_attempts,
        FormatUtils::format_uptime(Duration::from_secs_f64(stats.uptime))
    );
}

// Changelog:
// - v3.0.1-engine (2025-07-09): --single and --sync ignore a saved auto_mining flag.
// - v3.0.0-engine (2025-07-02): Replaced the pool mining entry points with the engine run modes.
//   - Settings load from <data-dir>/settings.json; CLI flags override them.
//   - log4rs replaces tracing_subscriber.
// - v2.0.0-feature-based: Feature-based CPU/GPU/hybrid entry points.
