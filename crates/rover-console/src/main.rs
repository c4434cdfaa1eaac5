// crates/rover-console/src/main.rs

mod app;
mod presets;
mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::Parser;
use rover_link::{Dispatcher, LinkConfig, Notification, NotificationRx, TcpConnector};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::app::{format_notification, App, Command, HELP};
use crate::presets::TomlPresetStore;
use crate::types::ConsoleConfig;

#[derive(Parser)]
#[clap(name = "rover-console")]
#[clap(about = "Terminal controller for the grid rover")]
struct Cli {
    /// Config file (TOML)
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Device to connect to at startup (host:port of the serial bridge)
    #[clap(short, long)]
    remote: Option<String>,

    /// Presets file
    #[clap(short, long)]
    presets: Option<PathBuf>,

    /// Print notifications as JSON lines
    #[clap(long)]
    json: bool,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries notifications.
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => ConsoleConfig::load(path)?,
        None => ConsoleConfig {
            link: LinkConfig::from_env().map_err(|e| anyhow!("{}", e))?,
            ..ConsoleConfig::default()
        },
    };
    if cli.remote.is_some() {
        config.remote = cli.remote.clone();
    }
    if let Some(path) = &cli.presets {
        config.presets_path = path.clone();
    }
    config.json_output |= cli.json;

    run(config).await
}

async fn run(config: ConsoleConfig) -> Result<()> {
    let presets = TomlPresetStore::open(&config.presets_path)?;
    let (dispatcher, dispatch_handle) = Dispatcher::spawn(
        Arc::new(TcpConnector::new()),
        config.link.clone(),
        config.drive.clone(),
    );

    let notifications = dispatcher.subscribe().await;
    let printer_handle = tokio::spawn(print_notifications(notifications, config.json_output));

    let mut app = App::new(dispatcher.clone(), presets, config.remote.clone());
    if config.remote.is_some() {
        app.handle(Command::Connect(None)).await?;
    }

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Ok(Some(cmd)) => {
                if let Err(e) = app.handle(cmd).await {
                    println!("error: {:#}", e);
                }
            }
            Ok(None) => {}
            Err(e) => println!("error: {:#}", e),
        }

        if app.should_quit {
            break;
        }
    }

    info!("Shutting down");
    dispatcher.request_disconnect();
    // Let the printer flush the final state change.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    dispatch_handle.abort();
    printer_handle.abort();
    Ok(())
}

#[derive(Serialize)]
struct JsonLine<'a> {
    time: String,
    event: &'a Notification,
}

async fn print_notifications(mut rx: NotificationRx, json_output: bool) {
    while let Some(notification) = rx.recv().await {
        let now = chrono::Local::now();
        if json_output {
            let line = JsonLine {
                time: now.to_rfc3339(),
                event: &notification,
            };
            match serde_json::to_string(&line) {
                Ok(text) => println!("{}", text),
                Err(e) => error!("Could not serialize {:?}: {}", notification, e),
            }
        } else {
            println!("{}", format_notification(now, &notification));
        }
    }
    error!("Notification stream closed");
}
