//! Common test utilities and helpers

use std::path::PathBuf;
use std::sync::Arc;
use tabserve::config::ServiceConfig;
use tabserve::engine::CsvEngine;
use tabserve::session::manager::ProcessRequest;
use tabserve::session::SessionManager;
use tabserve::staging::UploadedFile;
use tempfile::TempDir;

/// A fully wired service over a temporary data root
pub struct TestService {
    pub manager: SessionManager,
    pub data_root: PathBuf,
    _tmp: TempDir,
}

impl TestService {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Build a service, letting the test adjust the config first
    pub fn with_config(adjust: impl FnOnce(&mut ServiceConfig)) -> Self {
        let tmp = TempDir::new().expect("temp dir");
        let mut config = ServiceConfig::with_data_root(tmp.path());
        adjust(&mut config);
        config.ensure_dirs().expect("service dirs");
        let loader = Arc::new(CsvEngine::new(&config.shared_root));
        let data_root = config.data_root.clone();
        Self {
            manager: SessionManager::new(config, loader),
            data_root,
            _tmp: tmp,
        }
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.data_root.join("uploads")
    }

    /// Working directory of a session, as allocated by the stager
    pub fn workdir(&self, session_id: &str) -> PathBuf {
        self.uploads_dir().join(session_id)
    }
}

/// Build a process request from inline file contents
pub fn request(operation: &str, files: &[(&str, &str)], args: &[&str]) -> ProcessRequest {
    ProcessRequest {
        operation: operation.to_string(),
        files: files
            .iter()
            .map(|(name, content)| UploadedFile::new(*name, content.as_bytes().to_vec()))
            .collect(),
        args: args.iter().map(|a| a.to_string()).collect(),
    }
}
