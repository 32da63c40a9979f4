//! Output artifact collection, retrieval, and purge
//!
//! Operations write result artifacts into the shared root under fixed,
//! operation-specific filenames. The collector scans that fixed vocabulary
//! and claims each file it finds by atomically renaming it into the
//! session's output namespace. Claiming relies on operations writing
//! atomically (write-then-rename), so a racing session either sees a whole
//! file or no file; a lost rename race just means another session claimed
//! the artifact first.

use crate::error::{CoreError, CoreResult};
use crate::session::SessionId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Download descriptor for a collected artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputFile {
    pub filename: String,
    pub download_url: String,
}

/// Harvests operation artifacts into per-session output namespaces and
/// serves them back until purged
pub struct OutputCollector {
    shared_root: PathBuf,
    output_root: PathBuf,
}

impl OutputCollector {
    pub fn new(shared_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            shared_root: shared_root.into(),
            output_root: output_root.into(),
        }
    }

    /// Claim any artifacts from the vocabulary present in the shared root.
    ///
    /// An operation that produced nothing leaves nothing to find; the empty
    /// result is not an error.
    pub async fn collect(&self, session_id: &SessionId, vocabulary: &[&str]) -> Vec<OutputFile> {
        let mut collected = Vec::new();
        for name in vocabulary {
            let src = self.shared_root.join(name);
            if !src.exists() {
                continue;
            }
            let session_dir = self.output_root.join(session_id.as_str());
            if let Err(e) = tokio::fs::create_dir_all(&session_dir).await {
                warn!(session = %session_id, error = %e, "cannot create output namespace");
                continue;
            }
            match tokio::fs::rename(&src, session_dir.join(name)).await {
                Ok(()) => {
                    collected.push(OutputFile {
                        filename: name.to_string(),
                        download_url: format!("/api/download/{session_id}/{name}"),
                    });
                }
                Err(e) => {
                    // another session may have claimed it between the
                    // existence check and the rename
                    debug!(file = %name, error = %e, "artifact claim lost");
                }
            }
        }
        collected
    }

    /// Read a collected artifact back, byte for byte
    pub async fn retrieve(&self, session_id: &str, filename: &str) -> CoreResult<Vec<u8>> {
        validate_component(session_id)?;
        validate_component(filename)?;
        let path = self.output_root.join(session_id).join(filename);
        tokio::fs::read(&path)
            .await
            .map_err(|_| CoreError::not_found(format!("{session_id}/{filename}")))
    }

    /// Remove a session's entire output namespace.
    ///
    /// Idempotent: purging an unknown or already-purged session succeeds
    /// silently; removal faults are logged as cleanup warnings.
    pub async fn purge(&self, session_id: &str) -> CoreResult<()> {
        validate_component(session_id)?;
        let dir = self.output_root.join(session_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(session = %session_id, error = %e, "purge incomplete"),
        }
        Ok(())
    }
}

fn validate_component(component: &str) -> CoreResult<()> {
    if component.is_empty()
        || component.contains('/')
        || component.contains('\\')
        || component.contains("..")
    {
        return Err(CoreError::not_found(component));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, OutputCollector, SessionId) {
        let dir = TempDir::new().unwrap();
        let shared = dir.path().to_path_buf();
        let outputs = dir.path().join("outputs");
        std::fs::create_dir_all(&outputs).unwrap();
        (
            dir,
            OutputCollector::new(shared, outputs),
            SessionId::new(),
        )
    }

    #[tokio::test]
    async fn test_collect_moves_artifact_and_builds_descriptor() {
        let (dir, collector, session) = setup();
        std::fs::write(dir.path().join("merged_result.csv"), "a\n1\n").unwrap();

        let found = collector
            .collect(&session, &["merged_result.csv", "pivot_result.csv"])
            .await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].filename, "merged_result.csv");
        assert_eq!(
            found[0].download_url,
            format!("/api/download/{session}/merged_result.csv")
        );
        // claimed: gone from the shared root
        assert!(!dir.path().join("merged_result.csv").exists());
    }

    #[tokio::test]
    async fn test_collect_nothing_is_not_an_error() {
        let (_dir, collector, session) = setup();
        let found = collector.collect(&session, &["merged_result.csv"]).await;
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_round_trip() {
        let (dir, collector, session) = setup();
        std::fs::write(dir.path().join("quality_report.csv"), "f,s\na.csv,100\n").unwrap();
        collector.collect(&session, &["quality_report.csv"]).await;

        let bytes = collector
            .retrieve(session.as_str(), "quality_report.csv")
            .await
            .unwrap();
        assert_eq!(bytes, b"f,s\na.csv,100\n");
    }

    #[tokio::test]
    async fn test_retrieve_rejects_traversal() {
        let (_dir, collector, _session) = setup();
        assert!(collector.retrieve("..", "x.csv").await.is_err());
        assert!(collector.retrieve("sid", "../x.csv").await.is_err());
    }

    #[tokio::test]
    async fn test_purge_is_idempotent() {
        let (dir, collector, session) = setup();
        std::fs::write(dir.path().join("merged_result.csv"), "a\n1\n").unwrap();
        collector.collect(&session, &["merged_result.csv"]).await;

        collector.purge(session.as_str()).await.unwrap();
        assert!(collector
            .retrieve(session.as_str(), "merged_result.csv")
            .await
            .is_err());
        // second purge is a silent no-op
        collector.purge(session.as_str()).await.unwrap();
        collector.purge("never-existed").await.unwrap();
    }
}
