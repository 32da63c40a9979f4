//! Request pipeline orchestration
//!
//! Fixed order per request: validate before touching the filesystem,
//! allocate and stage, expose into the shared root, load tables, invoke the
//! operation under its per-name lock, collect outputs, then tear down
//! unconditionally. Different requests run the whole pipeline fully in
//! parallel; the exposure-collision check and the per-operation locks are
//! what keep them from interfering in the shared root.

use crate::config::ServiceConfig;
use crate::engine::DatasetLoader;
use crate::error::{CoreError, CoreResult};
use crate::ops::{self, OpContext, OpOutcome, Operation, OperationRegistry};
use crate::output::{OutputCollector, OutputFile};
use crate::session::Session;
use crate::staging::{ExposedNames, FileStager, UploadedFile};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// One processing request, as received from the transport layer
#[derive(Debug)]
pub struct ProcessRequest {
    pub operation: String,
    pub files: Vec<UploadedFile>,
    pub args: Vec<String>,
}

/// How the transport layer should reject a failed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Request malformed or unprocessable before the operation ran
    BadRequest,
    /// Upload exceeded the configured byte ceiling
    PayloadTooLarge,
}

/// The well-formed result every request produces, success or failure
#[derive(Debug, Clone, Serialize)]
pub struct ProcessResult {
    pub success: bool,
    pub message: String,
    pub operation: String,
    pub files_processed: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub output_files: Vec<OutputFile>,
    #[serde(skip)]
    pub rejection: Option<Rejection>,
}

impl ProcessResult {
    fn rejected(operation: &str, error: &CoreError, session_id: Option<String>) -> Self {
        let rejection = match error {
            CoreError::PayloadTooLarge { .. } => Rejection::PayloadTooLarge,
            _ => Rejection::BadRequest,
        };
        Self {
            success: false,
            message: error.to_string(),
            operation: operation.to_string(),
            files_processed: Vec::new(),
            session_id,
            output_files: Vec::new(),
            rejection: Some(rejection),
        }
    }
}

/// Owns the request pipeline and the session-scoped output store
pub struct SessionManager {
    config: ServiceConfig,
    stager: FileStager,
    registry: Arc<OperationRegistry>,
    loader: Arc<dyn DatasetLoader>,
    collector: OutputCollector,
}

impl SessionManager {
    pub fn new(config: ServiceConfig, loader: Arc<dyn DatasetLoader>) -> Self {
        let stager = FileStager::new(&config);
        let collector = OutputCollector::new(&config.shared_root, &config.output_root);
        Self {
            config,
            stager,
            registry: Arc::new(OperationRegistry::builtin()),
            loader,
            collector,
        }
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Run one request through the full pipeline.
    ///
    /// Always returns a well-formed result; by the time it returns, the
    /// session's working directory no longer exists.
    pub async fn process(&self, request: ProcessRequest) -> ProcessResult {
        // Fail fast, before any filesystem work: no session id is
        // allocated for these rejections
        let total_bytes: u64 = request.files.iter().map(|f| f.bytes.len() as u64).sum();
        if total_bytes > self.config.max_upload_bytes {
            let err = CoreError::PayloadTooLarge {
                got: total_bytes,
                limit: self.config.max_upload_bytes,
            };
            return ProcessResult::rejected(&request.operation, &err, None);
        }
        let Some(op) = self.registry.resolve(&request.operation) else {
            let err = CoreError::UnknownOperation(request.operation.clone());
            return ProcessResult::rejected(&request.operation, &err, None);
        };

        let (session_id, workdir) = match self.stager.begin_session().await {
            Ok(allocated) => allocated,
            Err(e) => return ProcessResult::rejected(&request.operation, &e, None),
        };
        let mut session = Session::new(
            session_id.clone(),
            workdir,
            self.config.output_root.join(session_id.as_str()),
        );
        info!(session = %session.id, operation = %request.operation, files = request.files.len(), "processing request");

        let (outcome, files_processed, output_files) =
            self.execute_session(&session, op, &request).await;
        session.close();

        match outcome {
            Ok(op_outcome) => {
                debug!(session = %session.id, success = op_outcome.success, "request complete");
                ProcessResult {
                    success: op_outcome.success,
                    message: op_outcome.message,
                    operation: request.operation,
                    files_processed,
                    session_id: Some(session.id.to_string()),
                    output_files,
                    rejection: None,
                }
            }
            Err(e) => {
                debug!(session = %session.id, error = %e, "request rejected");
                ProcessResult::rejected(&request.operation, &e, Some(session.id.to_string()))
            }
        }
    }

    /// Steps 2-5 of the pipeline; teardown runs no matter how they end
    async fn execute_session(
        &self,
        session: &Session,
        op: Arc<dyn Operation>,
        request: &ProcessRequest,
    ) -> (CoreResult<OpOutcome>, Vec<String>, Vec<OutputFile>) {
        let mut files_processed = Vec::new();
        let mut output_files = Vec::new();
        let mut exposed = ExposedNames::default();

        let outcome: CoreResult<OpOutcome> = async {
            let staged = self.stager.stage(&session.working_dir, &request.files).await?;
            files_processed = staged.clone();
            exposed = self.stager.expose(&session.working_dir, &staged).await?;

            let tables = self
                .loader
                .load(&staged)
                .await
                .map_err(|e| CoreError::load_failure(e))?;

            // Invoke and collect under the operation's lock: the fixed
            // output filename must have one writer-and-claimer at a time
            let lock = self
                .registry
                .lock_for(op.name())
                .ok_or_else(|| CoreError::UnknownOperation(op.name().to_string()))?;
            let _guard = lock.lock().await;

            let op_outcome = ops::invoke(
                op.clone(),
                OpContext::new(&self.config.shared_root),
                tables,
                request.args.clone(),
            )
            .await;

            output_files = self
                .collector
                .collect(&session.id, &self.registry.output_vocabulary())
                .await;

            Ok(op_outcome)
        }
        .await;

        self.stager.teardown(&session.working_dir, &exposed).await;
        (outcome, files_processed, output_files)
    }

    /// Read a collected artifact from a session's output namespace
    pub async fn retrieve(&self, session_id: &str, filename: &str) -> CoreResult<Vec<u8>> {
        self.collector.retrieve(session_id, filename).await
    }

    /// Remove a session's output namespace; idempotent
    pub async fn purge(&self, session_id: &str) -> CoreResult<()> {
        self.collector.purge(session_id).await
    }
}
