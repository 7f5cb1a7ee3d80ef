//! Command-line entry
//!
//! Parses flags, loads configuration, and runs the browser-session
//! lifecycle around the interaction sequence: launch with a disposable
//! profile, navigate, drive, screenshot, tear down on every exit path.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use cdp_bridge::{BridgeConfig, BridgeSession, ChromiumTransport};
use chrono::Local;
use clap::Parser;
use iol_autofill::config::{load_config, RunConfig};
use iol_autofill::dom::BridgeDom;
use iol_autofill::session::{artifact_path, drive_calculator, log_report, prepare_plan, RunPlan};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Exported record to read
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Calculator URL
    #[arg(long)]
    url: Option<String>,

    /// Chrome or Chromium executable
    #[arg(long, value_name = "FILE")]
    chrome_path: Option<PathBuf>,

    /// Run the browser without a visible window
    #[arg(long)]
    headless: bool,

    /// Keep the browser open after the run until Enter is pressed
    #[arg(long)]
    inspect: bool,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.debug)?;
    info!("Starting iol-autofill v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(cli.config.as_deref()).await?;
    let config = apply_cli_overrides(config, &cli);

    match cmd_run(&config, cli.inspect).await {
        Ok(()) => {
            info!("Run completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

fn apply_cli_overrides(mut config: RunConfig, cli: &Cli) -> RunConfig {
    if let Some(input) = &cli.input {
        config.input = input.clone();
    }
    if let Some(url) = &cli.url {
        config.url = url.clone();
    }
    if let Some(path) = &cli.chrome_path {
        config.chrome_path = Some(path.clone());
    }
    if cli.headless {
        config.headless = true;
    }
    config
}

async fn cmd_run(config: &RunConfig, inspect: bool) -> Result<()> {
    // Input-file problems abort here, before any browser is launched.
    let plan = prepare_plan(&config.input)
        .with_context(|| format!("loading record {}", config.input.display()))?;
    info!(
        gender = %plan.gender,
        identity = plan.identity.len(),
        biometry = plan.biometry.len(),
        "record resolved"
    );

    let profile_dir = PathBuf::from(format!(".iol-autofill-profile-{}", Uuid::new_v4()));
    let mut bridge_cfg = BridgeConfig::default();
    bridge_cfg.user_data_dir = profile_dir.clone();
    bridge_cfg.headless = config.headless;
    bridge_cfg.window = config.window;
    if let Some(path) = &config.chrome_path {
        bridge_cfg.executable = path.clone();
    }

    let result = run_session(bridge_cfg, config, &plan, inspect).await;

    if let Err(err) = fs::remove_dir_all(&profile_dir).await {
        if err.kind() != std::io::ErrorKind::NotFound {
            warn!(
                path = %profile_dir.display(),
                ?err,
                "failed to remove temporary chrome profile directory"
            );
        }
    }

    result
}

async fn run_session(
    bridge_cfg: BridgeConfig,
    config: &RunConfig,
    plan: &RunPlan,
    inspect: bool,
) -> Result<()> {
    let transport = Arc::new(ChromiumTransport::new(bridge_cfg));
    let session = BridgeSession::start(transport, config.timing.wait_timeout())
        .await
        .context("starting browser session")?;

    let outcome = async {
        session
            .navigate(&config.url, config.timing.navigation_timeout())
            .await
            .with_context(|| format!("navigating to {}", config.url))?;
        info!(url = %config.url, "calculator page ready");

        let dom = BridgeDom::new(&session);
        let report = drive_calculator(&dom, plan, &config.timing).await?;

        let bytes = session
            .screenshot_png()
            .await
            .context("capturing result screenshot")?;
        let path = artifact_path(&config.artifact_dir, "iol_result", Local::now());
        fs::write(&path, &bytes)
            .await
            .with_context(|| format!("writing screenshot to {}", path.display()))?;
        info!(path = %path.display(), "result screenshot saved");

        log_report(&report);
        Ok::<(), anyhow::Error>(())
    }
    .await;

    if let Err(err) = &outcome {
        warn!(error = %err, "run failed, attempting error screenshot");
        save_error_screenshot(&session, config).await;
    }

    if inspect {
        info!("Inspection mode, press Enter to close the browser");
        if let Err(err) = wait_for_enter().await {
            warn!(?err, "stdin wait failed, closing immediately");
        }
    }

    session.shutdown().await;
    outcome
}

async fn save_error_screenshot(session: &BridgeSession, config: &RunConfig) {
    let path = artifact_path(&config.artifact_dir, "error", Local::now());
    match session.screenshot_png().await {
        Ok(bytes) => match fs::write(&path, &bytes).await {
            Ok(()) => info!(path = %path.display(), "error screenshot saved"),
            Err(err) => warn!(?err, "writing error screenshot failed"),
        },
        Err(err) => warn!(%err, "capturing error screenshot failed"),
    }
}

async fn wait_for_enter() -> std::io::Result<()> {
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    Ok(())
}
