//! # Tabserve
//!
//! A small HTTP service that accepts uploaded CSV files, routes them through
//! a fixed registry of tabular operations, and returns a structured result
//! plus any produced output files. Concurrent requests are isolated from one
//! another: each request gets its own staging directory, exposure into the
//! shared data root is collision-checked, and cleanup runs on every exit
//! path.
//!
//! ## Modules
//!
//! - `config` - Service configuration (roots, extension set, upload ceiling)
//! - `engine` - Dataset loader boundary and the in-memory CSV table backend
//! - `ops` - Operation contract, registry, and the built-in operations
//! - `staging` - Per-session file staging and shared-root exposure
//! - `output` - Output artifact collection, retrieval, and purge
//! - `session` - Session model and the request pipeline orchestration
//! - `server` - Axum HTTP veneer over the core pipeline
pub mod config;
pub mod engine;
pub mod error;
pub mod ops;
pub mod output;
pub mod server;
pub mod session;
pub mod staging;
