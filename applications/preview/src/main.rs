/// Cadence Preview - play journal clips on a remote playback device
use cadence_core::ClipRequest;
use cadence_playback::{ClipPlayer, PauseReason, PlayerSnapshot};
use cadence_preview::{
    config::PreviewConfig,
    runner::{self, ClipOutcome, Phase},
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Time for the remote pause to go out before the runtime shuts down
const PAUSE_SETTLE: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(name = "cadence-preview")]
#[command(about = "Preview journal clips on a remote playback device", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./cadence.toml when present)
    #[arg(short, long, global = true, env = "CADENCE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the devices visible to the linked account
    Devices,
    /// Play a clip and report its progress until it ends
    Play {
        /// Track URI
        #[arg(short, long)]
        track: String,
        /// Clip start in seconds
        #[arg(short, long)]
        start: f64,
        /// Clip end in seconds
        #[arg(short, long)]
        end: f64,
        /// Journal entry the clip belongs to (random when omitted)
        #[arg(long)]
        entry: Option<String>,
        /// Use the in-process simulated device instead of the remote API
        #[arg(long)]
        simulate: bool,
    },
    /// Fetch a playback credential and describe it
    Token,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "cadence_preview=info,cadence_playback=info,cadence_remote=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = PreviewConfig::load(cli.config.as_deref())?;
    config.validate()?;

    match cli.command {
        Commands::Devices => list_devices(&config).await?,
        Commands::Play {
            track,
            start,
            end,
            entry,
            simulate,
        } => {
            let entry = entry.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            play(&config, ClipRequest::new(entry, track, start, end), simulate).await?;
        }
        Commands::Token => describe_token(&config).await?,
    }

    Ok(())
}

async fn list_devices(config: &PreviewConfig) -> anyhow::Result<()> {
    let tokens = runner::live_tokens(config)?;
    let remote = runner::live_remote(config, tokens)?;

    let devices = remote.list_devices().await?;
    if devices.is_empty() {
        println!("No devices available");
        return Ok(());
    }

    println!("Devices:");
    for device in devices {
        let marker = if device.is_active { "*" } else { " " };
        println!(
            " {} {} - {} ({})",
            marker, device.id, device.name, device.device_type
        );
    }
    Ok(())
}

async fn play(config: &PreviewConfig, clip: ClipRequest, simulate: bool) -> anyhow::Result<()> {
    let backend = if simulate {
        tracing::info!("Using the simulated device");
        runner::simulated_backend(config).0
    } else {
        runner::live_backend(config)?
    };
    let player = ClipPlayer::new(config.policy(), backend);

    tracing::info!(
        entry = %clip.entry_id,
        track = %clip.track_uri,
        start = clip.clip_start_seconds,
        end = clip.clip_end_seconds,
        "Previewing clip"
    );

    let started = Instant::now();
    let mut reporter = Reporter::default();
    let outcome = tokio::select! {
        outcome = runner::run_clip(&player, clip, |snapshot| reporter.observe(snapshot, started)) => outcome?,
        _ = tokio::signal::ctrl_c() => {
            player.pause_clip(PauseReason::User);
            println!("Interrupted");
            tokio::time::sleep(PAUSE_SETTLE).await;
            player.cleanup();
            return Ok(());
        }
    };

    match outcome {
        ClipOutcome::Finished(snapshot) => {
            println!("Clip finished at {:.1}s", snapshot.position_ms as f64 / 1000.0);
        }
        ClipOutcome::Abandoned(snapshot) => {
            println!("Clip did not start ({})", Phase::of(&snapshot));
        }
    }

    tokio::time::sleep(PAUSE_SETTLE).await;
    player.cleanup();
    Ok(())
}

async fn describe_token(config: &PreviewConfig) -> anyhow::Result<()> {
    let tokens = runner::live_tokens(config)?;
    let credential = tokens.access_credential().await?;

    let remaining = credential
        .expires_at
        .saturating_duration_since(Instant::now());
    println!("Access token: {}...", preview_of(&credential.access_token));
    println!("Premium:      {}", credential.is_premium);
    println!("Expires in:   {}s", remaining.as_secs());
    Ok(())
}

fn preview_of(token: &str) -> String {
    token.chars().take(8).collect()
}

/// Prints phase changes and whole-second progress
#[derive(Default)]
struct Reporter {
    phase: Option<Phase>,
    second: Option<u64>,
}

impl Reporter {
    fn observe(&mut self, snapshot: &PlayerSnapshot, started: Instant) {
        let phase = Phase::of(snapshot);
        let elapsed = started.elapsed().as_millis();

        if self.phase != Some(phase) {
            self.phase = Some(phase);
            match &snapshot.device_id {
                Some(device_id) => println!("[{elapsed:>6} ms] {phase} (device {device_id})"),
                None => println!("[{elapsed:>6} ms] {phase}"),
            }
        }

        if snapshot.is_playing {
            let second = snapshot.position_ms / 1000;
            if self.second != Some(second) {
                self.second = Some(second);
                println!("[{elapsed:>6} ms]   at {second}s");
            }
        }
    }
}
