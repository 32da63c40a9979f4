//! Service configuration

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default upload ceiling: 200 MiB, matching the original deployment
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 200 * 1024 * 1024;

/// Default listen port
pub const DEFAULT_PORT: u16 = 5000;

/// Configuration for the processing service.
///
/// The shared root is the single logical directory the tabular backend reads
/// staged inputs from and operations write results into. Staging and output
/// roots live underneath the data root so one `--data-root` flag relocates
/// everything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Root directory for all service state
    pub data_root: PathBuf,
    /// Per-session upload staging directories live here
    pub staging_root: PathBuf,
    /// Session output namespaces live here
    pub output_root: PathBuf,
    /// Shared logical root the backend loads from and operations write into
    pub shared_root: PathBuf,
    /// Accepted upload extensions (lowercase, without the dot)
    pub allowed_extensions: HashSet<String>,
    /// Maximum total upload size per request, in bytes
    pub max_upload_bytes: u64,
    /// HTTP listen port
    pub port: u16,
}

impl ServiceConfig {
    /// Build a configuration rooted at the given data directory
    pub fn with_data_root(data_root: impl Into<PathBuf>) -> Self {
        let data_root = data_root.into();
        Self {
            staging_root: data_root.join("uploads"),
            output_root: data_root.join("outputs"),
            shared_root: data_root.clone(),
            data_root,
            allowed_extensions: default_extensions(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            port: DEFAULT_PORT,
        }
    }

    /// Create the directory tree this configuration points at
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.staging_root)?;
        std::fs::create_dir_all(&self.output_root)?;
        std::fs::create_dir_all(&self.shared_root)?;
        Ok(())
    }

    /// Check whether a filename carries an accepted extension
    pub fn extension_allowed(&self, filename: &str) -> bool {
        Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| self.allowed_extensions.contains(&e.to_lowercase()))
            .unwrap_or(false)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::with_data_root("data")
    }
}

fn default_extensions() -> HashSet<String> {
    let mut set = HashSet::new();
    set.insert("csv".to_string());
    set
}
