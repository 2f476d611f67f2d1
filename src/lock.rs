//! Advisory lock file guarding the book file while it is read or written.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use tokio::io::AsyncWriteExt as _;

pub const DEFAULT_ATTEMPTS: u32 = 50;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Holds `<path>` (created exclusively) until dropped.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
}

impl FileLock {
    pub async fn acquire(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        Self::acquire_with(path, DEFAULT_ATTEMPTS, DEFAULT_RETRY_DELAY).await
    }

    pub async fn acquire_with(
        path: impl Into<PathBuf>,
        attempts: u32,
        delay: Duration,
    ) -> anyhow::Result<Self> {
        let path = path.into();
        let attempts = attempts.max(1);
        for attempt in 1..=attempts {
            match tokio::fs::OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    let owner = format!(
                        "pid={} acquired_at={}\n",
                        std::process::id(),
                        chrono::Utc::now().to_rfc3339()
                    );
                    // Content is informational only.
                    let _ = file.write_all(owner.as_bytes()).await;
                    tracing::trace!(path = %path.display(), attempt, "lock acquired");
                    return Ok(Self { path });
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!(path = %path.display(), attempt, "lock busy; waiting");
                    if attempt < attempts {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(err) => {
                    return Err(err)
                        .with_context(|| format!("create lock file: {}", path.display()));
                }
            }
        }
        anyhow::bail!(
            "file is locked by another process (remove {} if it is stale)",
            path.display()
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), ?err, "failed to remove lock file");
        }
    }
}
