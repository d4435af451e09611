use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::Transcoder;
use crate::common::error::TranscodeError;
use crate::modules::session::Quality;

/// Bytes of stderr kept in a failure report.
const STDERR_TAIL: usize = 2048;

/// Runs the `ffmpeg` binary. The child is killed when the call is dropped,
/// so a watchdog timeout really stops the encode.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    bin: String,
}

impl FfmpegTranscoder {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    pub fn compress_args(input: &Path, output: &Path, quality: Quality) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-hide_banner".into(), "-i".into(), input.into()];
        args.extend(
            [
                "-vf".to_string(),
                format!("scale=-2:{}", quality.height()),
                "-c:v".to_string(),
                "libx264".to_string(),
                "-preset".to_string(),
                "fast".to_string(),
                "-c:a".to_string(),
                "aac".to_string(),
                "-y".to_string(),
            ]
            .map(OsString::from),
        );
        args.push(output.into());
        args
    }

    pub fn extract_audio_args(input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-hide_banner".into(), "-i".into(), input.into()];
        args.extend(
            ["-vn", "-c:a", "libmp3lame", "-q:a", "2", "-y"].map(OsString::from),
        );
        args.push(output.into());
        args
    }

    async fn run(&self, args: Vec<OsString>, output: &Path) -> Result<PathBuf, TranscodeError> {
        debug!(bin = %self.bin, ?args, "Spawning transcoder");

        let result = Command::new(&self.bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(TranscodeError::Spawn)?;

        if !result.status.success() {
            return Err(TranscodeError::Failed {
                status: result.status.to_string(),
                stderr: stderr_tail(&result.stderr),
            });
        }

        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            return Err(TranscodeError::MissingOutput(output.to_path_buf()));
        }

        info!(output = %output.display(), "Transcode finished");
        Ok(output.to_path_buf())
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn compress(
        &self,
        input: &Path,
        output: &Path,
        quality: Quality,
    ) -> Result<PathBuf, TranscodeError> {
        self.run(Self::compress_args(input, output, quality), output)
            .await
    }

    async fn extract_audio(&self, input: &Path, output: &Path) -> Result<PathBuf, TranscodeError> {
        self.run(Self::extract_audio_args(input, output), output)
            .await
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let mut start = text.len().saturating_sub(STDERR_TAIL);
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}
