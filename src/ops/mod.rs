//! Operation contract and registry
//!
//! Operations are registered once at startup into an immutable map; the
//! registry performs no argument validation. Each operation validates its
//! own file count and argument arity and reports expected misuse through a
//! failed [`OpOutcome`] rather than an error. Result artifacts are written
//! to the shared root under a fixed per-operation filename, atomically
//! (write-then-rename), so the output collector can claim them.

pub mod aggregate;
pub mod anomalies;
pub mod compare;
pub mod correlation;
pub mod merge;
pub mod pivot;
pub mod profile;
pub mod quality;
pub mod validate;

use crate::engine::{Table, TableSet};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

/// What an operation invocation reports back
#[derive(Debug, Clone)]
pub struct OpOutcome {
    pub success: bool,
    pub message: String,
}

impl OpOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Execution context handed to an operation
#[derive(Debug, Clone)]
pub struct OpContext {
    shared_root: PathBuf,
}

impl OpContext {
    pub fn new(shared_root: impl Into<PathBuf>) -> Self {
        Self {
            shared_root: shared_root.into(),
        }
    }

    /// Write a result table into the shared root under a fixed filename.
    ///
    /// The write goes to a temporary name first and is renamed into place,
    /// so a concurrent collector never observes a half-written file.
    pub fn write_artifact(&self, filename: &str, table: &Table) -> anyhow::Result<()> {
        let bytes = table.to_csv_bytes()?;
        let tmp = self
            .shared_root
            .join(format!(".{}.{}.tmp", filename, Uuid::new_v4()));
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, self.shared_root.join(filename))?;
        Ok(())
    }
}

/// A registered tabular operation.
///
/// Pure function of (ordered table set, string args) to an outcome, with the
/// optional side effect of writing one result artifact named by
/// [`Operation::output_name`].
pub trait Operation: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Fixed output filename this operation may produce, if any
    fn output_name(&self) -> Option<&'static str> {
        None
    }

    fn execute(&self, ctx: &OpContext, tables: &TableSet, args: &[String]) -> OpOutcome;
}

/// Immutable name-to-operation map, built once at startup.
///
/// Also owns one mutex per operation name: because output filenames are
/// fixed per operation, two sessions running the same operation would race
/// on the same artifact. The session manager holds the lock across
/// invoke-and-collect.
pub struct OperationRegistry {
    ops: HashMap<&'static str, Arc<dyn Operation>>,
    locks: HashMap<&'static str, Arc<Mutex<()>>>,
}

impl OperationRegistry {
    /// Registry with all built-in operations
    pub fn builtin() -> Self {
        let mut registry = Self {
            ops: HashMap::new(),
            locks: HashMap::new(),
        };
        registry.register(Arc::new(compare::CompareDataframes));
        registry.register(Arc::new(merge::MergeDataframes));
        registry.register(Arc::new(profile::ProfileDataframe));
        registry.register(Arc::new(validate::ValidateSchema));
        registry.register(Arc::new(aggregate::AggregateDataframe));
        registry.register(Arc::new(anomalies::DetectAnomalies));
        registry.register(Arc::new(quality::DataQualityCheck));
        registry.register(Arc::new(pivot::PivotDataframe));
        registry.register(Arc::new(correlation::CalculateCorrelation));
        registry
    }

    fn register(&mut self, op: Arc<dyn Operation>) {
        let name = op.name();
        debug_assert!(!self.ops.contains_key(name), "duplicate operation {name}");
        self.locks.insert(name, Arc::new(Mutex::new(())));
        self.ops.insert(name, op);
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Operation>> {
        self.ops.get(name).cloned()
    }

    /// Mutex guarding the named operation's fixed output filename
    pub fn lock_for(&self, name: &str) -> Option<Arc<Mutex<()>>> {
        self.locks.get(name).cloned()
    }

    /// Name and description of every operation, sorted by name
    pub fn catalog(&self) -> Vec<(&'static str, &'static str)> {
        let mut entries: Vec<_> = self
            .ops
            .values()
            .map(|op| (op.name(), op.description()))
            .collect();
        entries.sort_by_key(|(name, _)| *name);
        entries
    }

    /// Every output filename any operation may produce, sorted
    pub fn output_vocabulary(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.ops.values().filter_map(|op| op.output_name()).collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

/// Invoke an operation on the blocking pool, containing panics.
///
/// A panicking operation (or backend) must never escape as an unhandled
/// fault; it is normalized into a failed outcome here.
pub async fn invoke(
    op: Arc<dyn Operation>,
    ctx: OpContext,
    tables: TableSet,
    args: Vec<String>,
) -> OpOutcome {
    let name = op.name();
    let handle = tokio::task::spawn_blocking(move || op.execute(&ctx, &tables, &args));
    match handle.await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(operation = name, error = %e, "operation aborted");
            OpOutcome::fail(format!("Internal error: operation '{name}' aborted"))
        }
    }
}
