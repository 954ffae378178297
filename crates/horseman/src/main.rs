use anyhow::Result;
use clap::{Parser, Subcommand};
use horseman_core::export::DirectoryDownload;
use horseman_core::RiderAsset;
use horseman_hw::{Camera, FacingMode};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod backend;
mod config;
mod controls;
mod engine;
mod session;
mod share;
mod still;

use backend::HardwareBackend;
use config::Config;
use controls::Control;
use engine::{TrackedFrame, TrackingReceiver};
use session::Session;
use share::CommandShare;

const HELP: &str =
    "commands: start, capture, photo, flip, hide [on|off], scale N, x N, y N, resize W H, quit";

#[derive(Parser)]
#[command(name = "horseman", about = "Headless horseman webcam filter")]
struct Cli {
    /// Configuration file (TOML); falls back to HORSEMAN_CONFIG
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the live camera session, reading commands from stdin
    Run {
        /// Start with the environment-facing camera
        #[arg(long)]
        back: bool,
        /// Do not open the camera until `start` is entered
        #[arg(long)]
        no_start: bool,
    },
    /// Composite a single photo without a camera
    Still(still::StillArgs),
    /// List V4L2 capture devices
    Devices,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Run {
        back: false,
        no_start: false,
    }) {
        Commands::Run { back, no_start } => {
            let mut config = config;
            if back {
                config.facing = FacingMode::Back;
            }
            run(config, !no_start).await?;
        }
        Commands::Still(args) => {
            let out = still::run(&args, &config)?;
            println!("{}", out.display());
        }
        Commands::Devices => {
            let devices = Camera::list_devices();
            if devices.is_empty() {
                println!("no capture devices found");
            }
            for d in devices {
                println!("{}\t{}\t{}\t{}", d.path, d.name, d.driver, d.bus);
            }
        }
    }

    Ok(())
}

async fn run(config: Config, autostart: bool) -> Result<()> {
    tracing::info!(
        front = %config.front_device,
        back = %config.back_device,
        facing = config.facing.as_str(),
        "horseman starting"
    );

    let rider = RiderAsset::load_in_background(config.rider_path.clone());
    let download = DirectoryDownload::new(config.download_dir.clone());
    tracing::debug!(dir = %download.dir().display(), "photos download here");
    let share = config.share_command.as_deref().and_then(CommandShare::parse);

    let mut session = Session::new(HardwareBackend::new(config.clone()), rider, Box::new(download))
        .with_facing(config.facing)
        .with_display(config.display_size())
        .with_render_options(config.render_options())
        .with_capture_options(config.capture_options());
    if let Some(share) = share {
        tracing::info!(program = share.program(), "native sharing enabled");
        session = session.with_share(Box::new(share));
    }

    if autostart {
        if let Err(e) = session.start() {
            tracing::error!(error = %e, "camera start failed");
        }
    }

    let mut results = session.subscribe();
    let mut generation = session.generation();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{HELP}");

    loop {
        tokio::select! {
            tracked = next_result(&mut results) => match tracked {
                Some(tracked) => session.on_frame(tracked),
                None => {
                    tracing::warn!("tracking stopped; enter `start` to retry");
                    results = None;
                }
            },
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match line.parse::<Control>() {
                    Ok(Control::Quit) => break,
                    Ok(control) => {
                        if let Some(message) = session.apply(control) {
                            println!("{message}");
                        }
                    }
                    Err(e) => {
                        tracing::warn!(input = line, error = %e, "ignored command");
                        println!("{HELP}");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }

        if session.generation() != generation {
            generation = session.generation();
            results = session.subscribe();
        }
    }

    session.stop();
    tracing::info!("horseman shutting down");
    Ok(())
}

/// Wait for the next published frame. Pends forever without a pipeline;
/// `None` once the pipeline has exited.
async fn next_result(results: &mut Option<TrackingReceiver>) -> Option<Arc<TrackedFrame>> {
    let Some(rx) = results.as_mut() else {
        return std::future::pending().await;
    };
    loop {
        rx.changed().await.ok()?;
        if let Some(tracked) = rx.borrow_and_update().clone() {
            return Some(tracked);
        }
    }
}
