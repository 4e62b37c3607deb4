mod config;
mod console;

use std::path::PathBuf;

use config::ServerConfig;
use console::ConsoleAction;
use oxiblock_config::load_blocks;
use tokio::io::AsyncBufReadExt;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "oxiblock.toml".to_string());
    let config = match ServerConfig::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            std::process::exit(1);
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!("Oxiblock v{} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Blocks directory: {} (table capacity {})",
        config.blocks.directory, config.blocks.table_capacity
    );
    info!("Visual ids start at {}", config.visual.native_state_count);

    let mut manager = match config.block_manager() {
        Ok(m) => m,
        Err(e) => {
            error!("Invalid visual configuration: {e}");
            std::process::exit(1);
        }
    };

    let blocks_dir = PathBuf::from(&config.blocks.directory);
    if let Err(e) = load_blocks(&mut manager, &blocks_dir) {
        error!("Failed to load blocks: {e}");
        std::process::exit(1);
    }

    for block in manager.registry().all_blocks() {
        info!(
            "Block {}: {} states, material {}",
            block.id(),
            block.state_count(),
            block.settings().visual_material
        );
    }

    // Console REPL: read lines from stdin
    let (console_tx, mut console_rx) = tokio::sync::mpsc::channel::<String>(32);
    tokio::spawn(async move {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.send(line).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            Some(line) = console_rx.recv() => {
                match console::handle_command(&mut manager, &blocks_dir, &line) {
                    ConsoleAction::Continue(reply) => info!("{reply}"),
                    ConsoleAction::Stop => break,
                }
            }
        }
    }

    info!("Oxiblock shut down.");
}
