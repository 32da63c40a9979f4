//! Per-session file staging and shared-root exposure
//!
//! Uploads are staged into an isolated per-session directory, then exposed
//! (linked) into the single shared root the backend reads from. Exposure is
//! guarded by a process-wide name set so two concurrent sessions can never
//! publish colliding filenames. Teardown runs on every exit path and is
//! best-effort: cleanup faults are logged, never propagated, so they cannot
//! mask the real result of a request.

use crate::config::ServiceConfig;
use crate::error::{CoreError, CoreResult};
use crate::session::SessionId;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// One uploaded file, as received from the transport layer
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

/// Names a session has published into the shared root.
///
/// Handed back to [`FileStager::teardown`] so only this session's exposure
/// entries are removed.
#[derive(Debug, Default)]
pub struct ExposedNames {
    names: Vec<String>,
}

impl ExposedNames {
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Creates isolated per-session working areas and exposes staged files to
/// the shared backend root
pub struct FileStager {
    staging_root: PathBuf,
    shared_root: PathBuf,
    allowed_extensions: HashSet<String>,
    exposed: Arc<Mutex<HashSet<String>>>,
}

impl FileStager {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            staging_root: config.staging_root.clone(),
            shared_root: config.shared_root.clone(),
            allowed_extensions: config.allowed_extensions.clone(),
            exposed: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Allocate a fresh session id and working directory
    pub async fn begin_session(&self) -> CoreResult<(SessionId, PathBuf)> {
        let id = SessionId::new();
        let workdir = self.staging_root.join(id.as_str());
        tokio::fs::create_dir_all(&workdir)
            .await
            .map_err(|e| CoreError::allocation(format!("cannot create {}: {e}", workdir.display())))?;
        debug!(session = %id, dir = %workdir.display(), "session allocated");
        Ok((id, workdir))
    }

    /// Write uploads into the working directory, all-or-nothing.
    ///
    /// The first rejected file fails the whole batch; the caller must
    /// discard everything (teardown removes any files already written).
    pub async fn stage(
        &self,
        workdir: &Path,
        files: &[UploadedFile],
    ) -> CoreResult<Vec<String>> {
        if files.is_empty() {
            return Err(CoreError::invalid_artifact("No files supplied"));
        }

        let mut accepted = Vec::with_capacity(files.len());
        for file in files {
            let name = self.sanitize(&file.filename)?;
            if accepted.contains(&name) {
                return Err(CoreError::invalid_artifact(format!(
                    "Duplicate filename in upload: {name}"
                )));
            }
            tokio::fs::write(workdir.join(&name), &file.bytes).await?;
            accepted.push(name);
        }
        Ok(accepted)
    }

    /// Publish staged files into the shared root the backend reads from.
    ///
    /// Fails with `NameCollision` if any name is already exposed by another
    /// active session, or already present in the shared root; nothing is
    /// published in that case.
    pub async fn expose(&self, workdir: &Path, names: &[String]) -> CoreResult<ExposedNames> {
        let mut registry = self.exposed.lock().await;
        for name in names {
            if registry.contains(name) || self.shared_root.join(name).exists() {
                return Err(CoreError::name_collision(format!(
                    "'{name}' is already in use by another session"
                )));
            }
        }
        for name in names {
            registry.insert(name.clone());
        }
        drop(registry);

        let mut published = ExposedNames::default();
        for name in names {
            let src = workdir.join(name);
            let dst = self.shared_root.join(name);
            // Hard link is cheap when staging and shared root share a
            // filesystem; copy covers the case where they do not
            let linked = tokio::fs::hard_link(&src, &dst).await;
            if linked.is_err() {
                if let Err(e) = tokio::fs::copy(&src, &dst).await {
                    published.names.push(name.clone());
                    self.unpublish(&published, names).await;
                    return Err(CoreError::Io(e));
                }
            }
            published.names.push(name.clone());
        }
        Ok(published)
    }

    /// Remove this session's exposure entries and its working directory.
    ///
    /// Unconditional, best-effort: runs on success, operation failure, and
    /// faults alike, and never propagates its own failures.
    pub async fn teardown(&self, workdir: &Path, exposed: &ExposedNames) {
        for name in exposed.names() {
            let path = self.shared_root.join(name);
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!(file = %path.display(), error = %e, "could not remove exposed file");
            }
        }
        {
            let mut registry = self.exposed.lock().await;
            for name in exposed.names() {
                registry.remove(name);
            }
        }
        if let Err(e) = tokio::fs::remove_dir_all(workdir).await {
            warn!(dir = %workdir.display(), error = %e, "could not remove working directory");
        }
    }

    /// Roll back a partially completed expose
    async fn unpublish(&self, published: &ExposedNames, reserved: &[String]) {
        for name in published.names() {
            let _ = tokio::fs::remove_file(self.shared_root.join(name)).await;
        }
        let mut registry = self.exposed.lock().await;
        for name in reserved {
            registry.remove(name);
        }
    }

    /// Validate extension and reject unsafe names rather than mangling them
    fn sanitize(&self, filename: &str) -> CoreResult<String> {
        if filename.is_empty() {
            return Err(CoreError::invalid_artifact("Empty filename"));
        }
        if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
            return Err(CoreError::invalid_artifact(format!(
                "Unsafe filename: {filename}"
            )));
        }
        if filename.starts_with('.') {
            return Err(CoreError::invalid_artifact(format!(
                "Unsafe filename: {filename}"
            )));
        }
        let allowed = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| self.allowed_extensions.contains(&e.to_lowercase()))
            .unwrap_or(false);
        if !allowed {
            return Err(CoreError::invalid_artifact(format!(
                "Invalid file: {filename}. Only CSV files are allowed."
            )));
        }
        Ok(filename.to_string())
    }
}
