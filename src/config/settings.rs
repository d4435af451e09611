use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::common::error::ConfigError;
use crate::config::env::{self, EnvKey};
use crate::modules::session::model::Quality;

pub const DEFAULT_CHECKPOINTS: [u8; 5] = [0, 25, 50, 75, 100];

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub server_port: u16,
    pub work_dir: PathBuf,
    pub default_quality: Quality,
    pub progress_checkpoints: Vec<u8>,
    pub progress_step: Duration,
    /// `None` disables the transcode watchdog.
    pub transcode_timeout: Option<Duration>,
    /// `None` keeps abandoned sessions forever.
    pub session_ttl: Option<Duration>,
    pub session_sweep_interval: Duration,
    pub ffmpeg_bin: String,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let work_dir = env::get(EnvKey::WorkDir)
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir().join("transcode-bot"));

        let raw_quality = env::get_or(EnvKey::DefaultVideoQuality, "720p");
        let default_quality = raw_quality.parse::<Quality>().unwrap_or_else(|_| {
            warn!(value = %raw_quality, "Unknown DEFAULT_VIDEO_QUALITY, falling back to 720p");
            Quality::default()
        });

        let progress_checkpoints = match env::get(EnvKey::ProgressCheckpoints) {
            Ok(raw) => parse_checkpoints(&raw)?,
            Err(_) => DEFAULT_CHECKPOINTS.to_vec(),
        };

        let timeout_secs: u64 = env::get_parsed(EnvKey::TranscodeTimeoutSecs, 1800);
        let ttl_secs: u64 = env::get_parsed(EnvKey::SessionTtlSecs, 3600);
        let upload_mb: usize = env::get_parsed(EnvKey::MaxUploadMb, 512);

        Ok(Self {
            server_port: env::get_parsed(EnvKey::ServerPort, 3000),
            work_dir,
            default_quality,
            progress_checkpoints,
            progress_step: Duration::from_millis(env::get_parsed(EnvKey::ProgressStepMs, 1000)),
            transcode_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            session_ttl: (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs)),
            session_sweep_interval: Duration::from_secs(
                env::get_parsed(EnvKey::SessionSweepSecs, 60u64).max(1),
            ),
            ffmpeg_bin: env::get_or(EnvKey::FfmpegBin, "ffmpeg"),
            max_upload_bytes: upload_mb.saturating_mul(1024 * 1024),
        })
    }
}

/// Parses a comma separated list of progress percentages.
///
/// The list must be strictly increasing and stay within `0..=100`.
pub fn parse_checkpoints(raw: &str) -> Result<Vec<u8>, ConfigError> {
    let mut checkpoints = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let value: u8 = part
            .parse()
            .map_err(|_| ConfigError::InvalidCheckpoints(raw.to_string()))?;
        if value > 100 || checkpoints.last().is_some_and(|last| *last >= value) {
            return Err(ConfigError::InvalidCheckpoints(raw.to_string()));
        }
        checkpoints.push(value);
    }
    Ok(checkpoints)
}
