use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tether_core::config::Config;
use tether_core::core_channel::LoopbackChannelService;
use tether_core::core_device::{DeviceEvent, DeviceManager};
use tether_core::core_identity::DeviceId;
use tether_core::logging::init_logging_with_config;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "tether")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML configuration file (default: environment)
    #[arg(short, long)]
    config: Option<String>,

    /// Override the configuration root directory
    #[arg(long)]
    data_dir: Option<String>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Parser, Debug)]
enum Command {
    /// Print the local identity and the known device set
    Status,
    /// Run the manager and log device transitions until interrupted
    Run,
    /// Broadcast an identify request, or direct it at a locator
    Identify {
        /// Target locator, e.g. loopback://local
        target: Option<String>,
    },
    /// Remove a device and its persisted record
    Forget {
        /// Id of the device to forget
        id: String,
    },
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            let path = shellexpand::tilde(path).into_owned();
            Config::from_file(&path).with_context(|| format!("loading config from {}", path))?
        }
        None => Config::from_env().context("loading config from environment")?,
    };

    if let Some(data_dir) = &args.data_dir {
        config.data_dir = PathBuf::from(shellexpand::tilde(data_dir).into_owned());
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.json_format = true;
    }
    config.validate()?;

    Ok(config)
}

async fn build_manager(config: Arc<Config>) -> Result<DeviceManager> {
    let manager = DeviceManager::new(config).await?;
    manager
        .register_service(Arc::new(LoopbackChannelService::new()))
        .await?;
    Ok(manager)
}


#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Arc::new(load_config(&args)?);
    init_logging_with_config(&config.logging)?;

    match &args.command {
        Command::Status => {
            let manager = build_manager(config).await?;
            println!("local device: {}", manager.device_id());
            for device in manager.get_devices() {
                println!("{}", serde_json::to_string_pretty(&device)?);
            }
        }
        Command::Run => {
            let manager = build_manager(config).await?;
            let mut events = manager.subscribe();
            manager.start().await;
            info!(local_id = %manager.device_id(), "Running; press Ctrl-C to stop");

            loop {
                tokio::select! {
                    event = events.recv() => match event {
                        Ok(DeviceEvent::Added(device)) => {
                            info!(id = %device.id, name = ?device.name, "Device added");
                        }
                        Ok(DeviceEvent::Removed(device)) => {
                            info!(id = %device.id, "Device removed");
                        }
                        Err(_) => break,
                    },
                    _ = tokio::signal::ctrl_c() => break,
                }
            }

            manager.stop().await;
        }
        Command::Identify { target } => {
            let manager = build_manager(config).await?;
            manager.start().await;
            manager.identify(target.as_deref()).await?;
            manager.stop().await;
        }
        Command::Forget { id } => {
            let manager = build_manager(config).await?;
            let id = DeviceId::new(id.clone())?;
            manager.forget(&id)?;
            println!("forgot {}", id);
        }
    }

    Ok(())
}
