/// Vireo - playback engine command line
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vireo_cli::{load_video, select, simulate, AppConfig, SimulationOptions};
use vireo_core::{BackendKind, DeviceConditions, NetworkKind, PlaybackMode};

#[derive(Parser)]
#[command(name = "vireo")]
#[command(about = "Vireo playback engine tools", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "VIREO_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which stream would be played for a video
    Select {
        /// Video description (JSON)
        video: PathBuf,
        /// Use this quality profile instead of matching device conditions
        #[arg(short, long)]
        profile: Option<String>,
        /// Network the device is on
        #[arg(long, value_enum, default_value_t = Network::Unknown)]
        network: Network,
        /// Device is in low-power mode
        #[arg(long)]
        low_power: bool,
    },
    /// Play videos through the simulated backends, printing events as JSON lines
    Simulate {
        /// Video descriptions (JSON); the first is opened, the rest queued
        #[arg(required = true)]
        videos: Vec<PathBuf>,
        /// Playback mode (queue, shuffle, loop_one, related)
        #[arg(short, long)]
        mode: Option<PlaybackMode>,
        /// Simulated milliseconds per step
        #[arg(long, default_value_t = 500)]
        step_ms: u64,
        /// Stop after this many simulated seconds
        #[arg(long, default_value_t = 600)]
        limit_secs: u64,
        /// Switch backend after this many simulated seconds
        #[arg(long, requires = "switch_to")]
        switch_at: Option<u64>,
        /// Backend to switch to (platform, library)
        #[arg(long, requires = "switch_at")]
        switch_to: Option<BackendKind>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Network {
    Wifi,
    Cellular,
    Wired,
    Unknown,
}

impl From<Network> for NetworkKind {
    fn from(network: Network) -> Self {
        match network {
            Network::Wifi => Self::Wifi,
            Network::Cellular => Self::Cellular,
            Network::Wired => Self::Wired,
            Network::Unknown => Self::Unknown,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    // Initialize tracing; events go to stdout, logs to stderr
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match cli.command {
        Commands::Select {
            video,
            profile,
            network,
            low_power,
        } => {
            let video = load_video(&video)?;
            let conditions = DeviceConditions::new(network.into(), low_power);
            let report = select(&config.player, &video, profile.as_deref(), conditions)?;
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &report)?;
            writeln!(stdout)?;
        }
        Commands::Simulate {
            videos,
            mode,
            step_ms,
            limit_secs,
            switch_at,
            switch_to,
        } => {
            let videos = videos
                .iter()
                .map(|path| load_video(path))
                .collect::<Result<Vec<_>>>()?;
            let options = SimulationOptions {
                mode,
                step: Duration::from_millis(step_ms.max(1)),
                limit: Duration::from_secs(limit_secs),
                switch: switch_at
                    .zip(switch_to)
                    .map(|(at, backend)| (Duration::from_secs(at), backend)),
            };

            let mut stdout = io::stdout().lock();
            let summary = simulate(config.player, videos, &options, &mut stdout).await?;
            tracing::info!(
                items = summary.items_started,
                events = summary.events,
                elapsed_ms = summary.elapsed_ms,
                state = %summary.final_state,
                "Simulation finished"
            );
        }
    }

    Ok(())
}
