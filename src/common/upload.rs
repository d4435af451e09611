use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use axum::body::Bytes;
use axum::extract::multipart::Field;
use futures_util::{Stream, StreamExt};
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{error, info};
use uuid::Uuid;

use crate::common::artifact;

/// Streams a multipart field into `work_dir` and returns the stored path.
pub async fn stream_to_disk(work_dir: &Path, field: Field<'_>) -> Result<PathBuf> {
    let content_type: mime::Mime = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .parse()
        .map_err(|_| anyhow!("Invalid content type"))?;

    // Documents arrive as octet-stream, so only obviously wrong types are refused
    if !accepts(&content_type) {
        return Err(anyhow!("Invalid content type: only video/* allowed"));
    }

    let file_name = field.file_name().unwrap_or("video.mp4").to_string();
    let dest = work_dir.join(artifact_name(&file_name));

    write_stream(&dest, field).await?;
    info!(path = %dest.display(), "Upload stored");
    Ok(dest)
}

/// Writes every chunk of `stream` to `dest`, removing the partial file on error.
pub async fn write_stream<S, E>(dest: &Path, stream: S) -> Result<u64>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    let file = File::create(dest).await?;
    write_into(dest, file, stream).await
}

/// Copies `stream` through `sink`, which backs `dest`. Any failure, the final
/// flush included, removes `dest`.
async fn write_into<W, S, E>(dest: &Path, sink: W, mut stream: S) -> Result<u64>
where
    W: AsyncWrite + Unpin,
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    let mut writer = BufWriter::new(sink);
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                error!("Stream error: {}", e);
                drop(writer);
                artifact::discard(dest).await;
                return Err(anyhow!("Stream interrupted"));
            }
        };

        if let Err(e) = writer.write_all(&chunk).await {
            error!("Write error: {}", e);
            drop(writer);
            artifact::discard(dest).await;
            return Err(e.into());
        }
        written += chunk.len() as u64;
    }

    if let Err(e) = writer.flush().await {
        error!("Flush error: {}", e);
        drop(writer);
        artifact::discard(dest).await;
        return Err(e.into());
    }
    Ok(written)
}

fn accepts(content_type: &mime::Mime) -> bool {
    content_type.type_() == mime::VIDEO
        || content_type.essence_str() == mime::APPLICATION_OCTET_STREAM.essence_str()
}

/// Unique on-disk name that keeps the uploaded extension.
fn artifact_name(file_name: &str) -> String {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("mp4");
    format!("{}_input.{}", Uuid::new_v4().simple(), extension)
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use super::*;
    use futures_util::stream;

    #[test]
    fn artifact_name_keeps_safe_extensions_only() {
        assert!(artifact_name("holiday.mkv").ends_with("_input.mkv"));
        assert!(artifact_name("no_extension").ends_with("_input.mp4"));
        assert!(artifact_name("../evil.m/p4").ends_with("_input.mp4"));
        assert_ne!(artifact_name("a.mp4"), artifact_name("a.mp4"));
    }

    /// Accepts every write but fails to flush, like a full disk.
    struct FullDisk;

    impl AsyncWrite for FullDisk {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Err(std::io::Error::other("no space left on device")))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn failed_flush_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("clip.mp4");
        tokio::fs::write(&dest, b"partial").await.unwrap();
        let chunks = stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from_static(b"abc"))]);

        assert!(write_into(&dest, FullDisk, chunks).await.is_err());
        assert!(!dest.exists());
    }

    #[test]
    fn only_video_or_raw_documents_are_accepted() {
        let parse = |s: &str| s.parse::<mime::Mime>().unwrap();
        assert!(accepts(&parse("video/mp4")));
        assert!(accepts(&parse("video/x-matroska")));
        assert!(accepts(&parse("application/octet-stream")));
        assert!(!accepts(&parse("image/png")));
        assert!(!accepts(&parse("text/plain; charset=utf-8")));
    }

    #[tokio::test]
    async fn writes_all_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("clip.mp4");
        let chunks = stream::iter(vec![
            Ok::<_, std::io::Error>(Bytes::from_static(b"abc")),
            Ok(Bytes::from_static(b"def")),
        ]);

        let written = write_stream(&dest, chunks).await.unwrap();

        assert_eq!(written, 6);
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"abcdef");
    }

    #[tokio::test]
    async fn interrupted_stream_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("clip.mp4");
        let chunks = stream::iter(vec![
            Ok(Bytes::from_static(b"abc")),
            Err(std::io::Error::other("connection reset")),
        ]);

        assert!(write_stream(&dest, chunks).await.is_err());
        assert!(!dest.exists());
    }
}
