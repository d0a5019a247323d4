mod bootstrap;

use anyhow::Result;
use rollcall_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use rollcall_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        "rollcall-server started"
    );

    tokio::select! {
        result = app.slack_runner.start() => {
            result?;
            tracing::info!(
                event_name = "system.server.socket_loop_ended",
                correlation_id = "shutdown",
                "socket mode loop ended"
            );
        }
        result = wait_for_shutdown() => {
            result?;
            tracing::info!(
                event_name = "system.server.stopping",
                correlation_id = "shutdown",
                "rollcall-server stopping"
            );
        }
    }

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
