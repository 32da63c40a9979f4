//! Dataset loader boundary and the CSV backend
//!
//! The pipeline never talks to the filesystem-backed table engine directly;
//! it goes through [`DatasetLoader`] so tests can substitute a failing or
//! fake loader without process-wide side effects.

pub mod table;

pub use table::{ColumnType, Table, Value};

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Opaque reference to a loaded table, valid for one operation invocation
pub type TableHandle = Arc<Table>;

/// Whole-batch load failure with a per-file reason
#[derive(Error, Debug)]
#[error("Failed to load {filename}: {reason}")]
pub struct LoadError {
    pub filename: String,
    pub reason: String,
}

/// Ordered mapping from staged filename to table handle.
///
/// Order matches upload order; operations that care about "first file"
/// semantics rely on it.
#[derive(Debug, Clone, Default)]
pub struct TableSet {
    entries: Vec<(String, TableHandle)>,
}

impl TableSet {
    pub fn push(&mut self, name: String, table: TableHandle) {
        self.entries.push((name, table));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Filenames in upload order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&TableHandle> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TableHandle)> {
        self.entries.iter().map(|(n, t)| (n.as_str(), t))
    }

    /// The sole entry, for single-file operations
    pub fn single(&self) -> Option<(&str, &TableHandle)> {
        match self.entries.as_slice() {
            [(n, t)] => Some((n.as_str(), t)),
            _ => None,
        }
    }
}

/// Boundary to the tabular backend: materialize staged files into tables.
///
/// Any per-file failure is a whole-batch failure; no partial set is ever
/// handed to an operation. Implementations must be safe to call from
/// concurrent sessions.
#[async_trait]
pub trait DatasetLoader: Send + Sync {
    async fn load(&self, filenames: &[String]) -> Result<TableSet, LoadError>;
}

/// Default backend: reads CSV files from the shared data root
pub struct CsvEngine {
    root: PathBuf,
}

impl CsvEngine {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DatasetLoader for CsvEngine {
    async fn load(&self, filenames: &[String]) -> Result<TableSet, LoadError> {
        let mut tables = TableSet::default();
        for name in filenames {
            let path = self.root.join(name);
            let bytes = tokio::fs::read(&path).await.map_err(|e| LoadError {
                filename: name.clone(),
                reason: e.to_string(),
            })?;
            let table = Table::from_csv_bytes(&bytes).map_err(|e| LoadError {
                filename: name.clone(),
                reason: e.to_string(),
            })?;
            debug!(
                file = %name,
                rows = table.row_count(),
                cols = table.column_count(),
                "loaded table"
            );
            tables.push(name.clone(), Arc::new(table));
        }
        Ok(tables)
    }
}
