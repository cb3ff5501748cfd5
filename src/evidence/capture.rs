//! Evidence Capture
//!
//! Produces a point-in-time artifact of what the cycle observed. Capture is
//! best-effort: callers downgrade any error here to a placeholder reference.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::feed::PageSession;

#[async_trait]
pub trait EvidenceCapture: Send + Sync {
    /// Capture now. `label` names the artifact; returns its path or identifier.
    async fn capture(&self, label: &str) -> Result<String>;
}

/// Saves the exact page markup the extractor checked in this cycle.
pub struct PageSnapshotCapture {
    session: Arc<PageSession>,
    dir: PathBuf,
}

/// Suffixed names tried before giving up on a label.
const MAX_NAME_ATTEMPTS: u32 = 100;

impl PageSnapshotCapture {
    pub fn new(session: Arc<PageSession>, dir: impl Into<PathBuf>) -> Self {
        Self {
            session,
            dir: dir.into(),
        }
    }

    /// `sorting_error_<label>.html`, then `sorting_error_<label>-<n>.html`
    /// for later attempts.
    pub fn artifact_path(&self, label: &str, attempt: u32) -> PathBuf {
        match attempt {
            0 => self.dir.join(format!("sorting_error_{}.html", label)),
            n => self.dir.join(format!("sorting_error_{}-{}.html", label, n)),
        }
    }

    /// Create a new artifact file; existing evidence is never overwritten.
    async fn create_artifact(&self, label: &str) -> Result<(PathBuf, tokio::fs::File)> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = self.artifact_path(label, attempt);
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to create {}", path.display()))
                }
            }
        }
        bail!("no free artifact name for run {}", label)
    }
}

#[async_trait]
impl EvidenceCapture for PageSnapshotCapture {
    async fn capture(&self, label: &str) -> Result<String> {
        let snapshot = self
            .session
            .latest()
            .ok_or_else(|| anyhow!("no page has been fetched in this cycle"))?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let (path, mut file) = self.create_artifact(label).await?;
        info!("Capturing page snapshot: {}", path.display());

        let document = format!(
            "<!-- captured from {} at {} -->\n{}",
            snapshot.url,
            snapshot.fetched_at.to_rfc3339(),
            snapshot.markup
        );
        file.write_all(document.as_bytes())
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        file.flush()
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::PageSnapshot;
    use chrono::Local;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_capture_writes_latest_page() {
        let dir = TempDir::new().unwrap();
        let session = Arc::new(PageSession::new());
        session.store(PageSnapshot {
            url: "https://example.com/newest".into(),
            fetched_at: Local::now(),
            markup: "<tr class=\"athing\"></tr>".into(),
        });

        let capture = PageSnapshotCapture::new(session, dir.path().join("shots"));
        let path = capture.capture("2025-02-23_12-00-00").await.unwrap();

        assert!(path.ends_with("sorting_error_2025-02-23_12-00-00.html"));
        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.contains("https://example.com/newest"));
        assert!(body.contains("athing"));
    }

    #[tokio::test]
    async fn test_repeated_label_keeps_earlier_evidence() {
        let dir = TempDir::new().unwrap();
        let session = Arc::new(PageSession::new());
        session.store(PageSnapshot {
            url: "https://example.com/newest".into(),
            fetched_at: Local::now(),
            markup: "first".into(),
        });
        let capture = PageSnapshotCapture::new(session.clone(), dir.path());
        let first = capture.capture("2025-02-23_12-00-00+0000").await.unwrap();

        session.store(PageSnapshot {
            url: "https://example.com/newest".into(),
            fetched_at: Local::now(),
            markup: "second".into(),
        });
        let second = capture.capture("2025-02-23_12-00-00+0000").await.unwrap();

        assert_ne!(first, second);
        assert!(second.ends_with("sorting_error_2025-02-23_12-00-00+0000-1.html"));
        assert!(std::fs::read_to_string(&first).unwrap().ends_with("first"));
        assert!(std::fs::read_to_string(&second).unwrap().ends_with("second"));
    }

    #[tokio::test]
    async fn test_capture_without_page_fails() {
        let dir = TempDir::new().unwrap();
        let capture = PageSnapshotCapture::new(Arc::new(PageSession::new()), dir.path());
        assert!(capture.capture("x").await.is_err());
    }
}
