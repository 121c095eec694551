use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::http::HttpOptions;
use crate::retry::RetryPolicy;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per segment (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 0.5,
            max_delay_secs: 10,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_secs_f64(self.base_delay_secs.max(0.0)),
            max_delay: Duration::from_secs(self.max_delay_secs),
        }
    }
}

/// How downloaded segments are turned into the final output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssembleMode {
    /// Raw byte concatenation in index order.
    #[default]
    Concat,
    /// Concat-demux remux through the external tool (stream copy).
    Remux,
    /// Concatenate, then also remux into `<output>.remux.<ext>`.
    Both,
}

/// Global configuration loaded from `~/.config/hlsdl/config.toml`.
/// Missing keys fall back to `HlsdlConfig::default()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HlsdlConfig {
    /// Maximum concurrent segment transfers per playlist job.
    pub max_concurrency: usize,
    /// Maximum playlist jobs running at once.
    pub max_batch_concurrency: usize,
    /// Receive buffer size for segment bodies, in bytes.
    pub chunk_size: usize,
    pub connect_timeout_secs: u64,
    /// Whole-request timeout for HEAD probes and playlist fetches.
    pub probe_timeout_secs: u64,
    /// Abort a segment transfer that stays below 1 KiB/s for this long.
    pub low_speed_time_secs: u64,
    /// Wall-clock cap on one segment GET. Unset means no cap; slow links are
    /// still cut off by `low_speed_time_secs`.
    pub transfer_timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
    /// Remux tool binary. When unset, `ffmpeg` is looked up on PATH.
    pub ffmpeg_path: Option<PathBuf>,
    pub assemble_mode: AssembleMode,
    /// Optional retry policy; if missing, built-in defaults are used.
    pub retry: Option<RetryConfig>,
}

impl Default for HlsdlConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            max_batch_concurrency: 1,
            chunk_size: 8192,
            connect_timeout_secs: 15,
            probe_timeout_secs: 30,
            low_speed_time_secs: 60,
            transfer_timeout_secs: None,
            user_agent: None,
            ffmpeg_path: None,
            assemble_mode: AssembleMode::Concat,
            retry: None,
        }
    }
}

impl HlsdlConfig {
    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            probe_timeout: Duration::from_secs(self.probe_timeout_secs),
            low_speed_time: Duration::from_secs(self.low_speed_time_secs),
            transfer_timeout: self
                .transfer_timeout_secs
                .filter(|&s| s > 0)
                .map(Duration::from_secs),
            buffer_size: self.chunk_size.max(1024),
            user_agent: self.user_agent.clone(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone().unwrap_or_default().to_policy()
    }

    pub fn limits(&self) -> ConcurrencyLimits {
        ConcurrencyLimits {
            per_job: self.max_concurrency.max(1),
            batch: self.max_batch_concurrency.max(1),
        }
    }
}

/// The two concurrency dimensions: segments within a job, and jobs within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyLimits {
    pub per_job: usize,
    pub batch: usize,
}

impl ConcurrencyLimits {
    /// Upper bound on simultaneous transfers across the whole batch.
    pub fn transfer_cap(&self) -> usize {
        self.per_job.saturating_mul(self.batch)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("hlsdl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<HlsdlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = HlsdlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file (e.g. `--config`).
pub fn load_from_path(path: &Path) -> Result<HlsdlConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let cfg: HlsdlConfig =
        toml::from_str(&data).with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
