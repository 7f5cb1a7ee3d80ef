//! Run configuration
//!
//! Optional YAML file with full defaults; CLI flags override file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

/// Settings for one run. Every field has a default, so the tool works with
/// no config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Calculator URL.
    pub url: String,

    /// Exported record to read.
    pub input: PathBuf,

    /// Directory receiving screenshot artifacts.
    pub artifact_dir: PathBuf,

    /// Chrome executable; autodetected when absent.
    pub chrome_path: Option<PathBuf>,

    /// Run without a visible window. The site renders differently headless,
    /// so the default is a visible one.
    pub headless: bool,

    /// Browser window size.
    pub window: (u32, u32),

    /// Waits and settles around the interaction sequence.
    pub timing: TimingConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            url: "https://iolcalculator.escrs.org/".to_string(),
            input: PathBuf::from("exported_iol_data.json"),
            artifact_dir: PathBuf::from("."),
            chrome_path: None,
            headless: false,
            window: (1920, 1080),
            timing: TimingConfig::default(),
        }
    }
}

/// Timing knobs, all in milliseconds. Bounded waits poll a page condition;
/// settles are unconditional because the page exposes no readiness signal
/// at those points.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Bound on element and popover waits.
    pub wait_timeout_ms: u64,

    /// Interval between wait probes.
    pub poll_ms: u64,

    /// Delay while dropdown options populate after the popover opens.
    pub populate_settle_ms: u64,

    /// Delay after the acknowledgment click and after the choice.
    pub step_settle_ms: u64,

    /// Delay between the blur click and the calculate trigger.
    pub pre_calculate_settle_ms: u64,

    /// Delay for the remote calculation to finish.
    pub post_calculate_wait_ms: u64,

    /// Bound on navigation readiness.
    pub navigation_timeout_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            wait_timeout_ms: 10_000,
            poll_ms: 100,
            populate_settle_ms: 500,
            step_settle_ms: 1_000,
            pre_calculate_settle_ms: 2_000,
            post_calculate_wait_ms: 10_000,
            navigation_timeout_ms: 30_000,
        }
    }
}

impl TimingConfig {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }

    pub fn populate_settle(&self) -> Duration {
        Duration::from_millis(self.populate_settle_ms)
    }

    pub fn step_settle(&self) -> Duration {
        Duration::from_millis(self.step_settle_ms)
    }

    pub fn pre_calculate_settle(&self) -> Duration {
        Duration::from_millis(self.pre_calculate_settle_ms)
    }

    pub fn post_calculate_wait(&self) -> Duration {
        Duration::from_millis(self.post_calculate_wait_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }
}

/// Loads the YAML config, falling back to defaults when the file is absent.
pub async fn load_config(config_path: Option<&Path>) -> Result<RunConfig> {
    let config_path = match config_path {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from("iol-autofill.yaml"),
    };

    if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .await
            .context("Failed to read config file")?;

        let config: RunConfig =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    } else {
        warn!(
            "Config file not found, using defaults: {}",
            config_path.display()
        );
        Ok(RunConfig::default())
    }
}
