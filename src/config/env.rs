use std::env;
use std::str::FromStr;

pub enum EnvKey {
    ServerPort,
    WorkDir,
    DefaultVideoQuality,
    ProgressCheckpoints,
    ProgressStepMs,
    TranscodeTimeoutSecs,
    SessionTtlSecs,
    SessionSweepSecs,
    FfmpegBin,
    MaxUploadMb,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::WorkDir => "WORK_DIR",
            EnvKey::DefaultVideoQuality => "DEFAULT_VIDEO_QUALITY",
            EnvKey::ProgressCheckpoints => "PROGRESS_CHECKPOINTS",
            EnvKey::ProgressStepMs => "PROGRESS_STEP_MS",
            EnvKey::TranscodeTimeoutSecs => "TRANSCODE_TIMEOUT_SECS",
            EnvKey::SessionTtlSecs => "SESSION_TTL_SECS",
            EnvKey::SessionSweepSecs => "SESSION_SWEEP_SECS",
            EnvKey::FfmpegBin => "FFMPEG_BIN",
            EnvKey::MaxUploadMb => "MAX_UPLOAD_MB",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
