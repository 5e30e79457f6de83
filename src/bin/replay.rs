//! spaces-bridge-replay binary
//!
//! Replays a recorded host session (JSON lines) through a headless bridge
//! and prints every outbound host call.
//!
//! ## Configuration (env / TOML via `config` crate)
//!
//! | Key                               | Default | Description                      |
//! |-----------------------------------|---------|----------------------------------|
//! | `SPACES_CONFIG`                   | none    | Optional TOML settings file      |
//! | `SPACES_FRAME_RATE_HZ`            | `60`    | Simulated render frame rate      |
//! | `SPACES_TAIL_MS`                  | `500`   | Simulated time after last line   |
//! | `SPACES_LOAD_TIMEOUT_MS`          | none    | Texture request timeout          |
//! | `SPACES_BRIDGE__SEND_RATE_HZ`     | `20`    | Local transform send cap         |
//! | `SPACES_BRIDGE__POSITION_LERP_SPEED` | `10` | Remote position smoothing        |
//! | `SPACES_BRIDGE__ROTATION_LERP_SPEED` | `10` | Remote rotation smoothing        |

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use spaces_bridge::{
    replay::{self, Replayer},
    settings::Settings,
};
use tokio::io::AsyncWriteExt;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "spaces-bridge-replay", about = "Replay a recorded Spaces host session", version)]
struct Args {
    /// Recording to replay (JSON lines)
    recording: PathBuf,

    /// Settings file (TOML)
    #[arg(long, env = "SPACES_CONFIG")]
    config: Option<PathBuf>,

    /// Simulated frame rate (Hz); overrides the settings file
    #[arg(long)]
    frame_rate_hz: Option<f32>,

    /// Local transform send cap (Hz); overrides the settings file
    #[arg(long)]
    send_rate_hz: Option<f32>,

    /// Simulated time to run after the last recorded line (ms)
    #[arg(long)]
    tail_ms: Option<u64>,

    /// Pace frames against the wall clock instead of simulating
    #[arg(long)]
    realtime: bool,

    /// Write outbound calls here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("spaces_bridge=debug".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref()).context("loading settings")?;
    if let Some(hz) = args.frame_rate_hz {
        settings.frame_rate_hz = hz;
    }
    if let Some(hz) = args.send_rate_hz {
        settings.bridge.send_rate_hz = hz;
    }
    if let Some(ms) = args.tail_ms {
        settings.tail_ms = ms;
    }

    let text = tokio::fs::read_to_string(&args.recording)
        .await
        .with_context(|| format!("reading {}", args.recording.display()))?;
    let lines = replay::parse(&text)?;

    tracing::info!(
        recording = %args.recording.display(),
        lines = lines.len(),
        frame_rate_hz = settings.frame_rate_hz,
        realtime = args.realtime,
        "Starting replay"
    );

    let mut replayer = Replayer::new(settings.spaces_config(), settings.frame_dt());

    let report = if args.realtime {
        tokio::select! {
            report = replayer.run_realtime(&lines, settings.tail_ms) => report?,
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("Interrupted");
                return Ok(());
            }
        }
    } else {
        replayer.run(&lines, settings.tail_ms)?
    };

    let mut out = report.sent_jsonl();
    if !out.is_empty() {
        out.push('\n');
    }
    match &args.output {
        Some(path) => tokio::fs::write(path, out)
            .await
            .with_context(|| format!("writing {}", path.display()))?,
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(out.as_bytes()).await?;
            stdout.flush().await?;
        }
    }

    tracing::info!(
        frames = report.frames,
        delivered = report.delivered,
        unhandled = report.unhandled,
        failed = report.failed,
        sent = report.sent.len(),
        "Replay finished"
    );
    Ok(())
}
