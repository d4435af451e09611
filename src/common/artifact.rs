use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, warn};

use crate::common::error::CleanupError;

/// Removes a temporary artifact. A file that is already gone counts as removed.
pub async fn remove_artifact(path: &Path) -> Result<(), CleanupError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "Removed artifact");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(CleanupError {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Best-effort removal: failures are logged and never propagated.
pub async fn discard(path: &Path) {
    if let Err(e) = remove_artifact(path).await {
        warn!(error = %e, "Artifact cleanup failed");
    }
}
