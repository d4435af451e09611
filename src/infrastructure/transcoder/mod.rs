use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::common::error::TranscodeError;
use crate::modules::session::Quality;

pub mod ffmpeg;

pub use ffmpeg::FfmpegTranscoder;

/// Performs the actual media work. Calls are opaque: they cannot be
/// interrupted other than by dropping the returned future.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn compress(
        &self,
        input: &Path,
        output: &Path,
        quality: Quality,
    ) -> Result<PathBuf, TranscodeError>;

    async fn extract_audio(&self, input: &Path, output: &Path) -> Result<PathBuf, TranscodeError>;
}
