//! Session model and request pipeline
//!
//! A session is the unit of request isolation: an opaque id, a private
//! working directory for staged uploads, and an output namespace that
//! outlives the request until explicitly purged.

pub mod manager;

pub use manager::SessionManager;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Unique identifier for a session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Create a new collision-resistant session id
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Closed,
}

/// A request-scoped session.
///
/// The working directory is removed at the end of the owning request; the
/// output directory survives until purged.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub working_dir: PathBuf,
    pub output_dir: PathBuf,
    pub status: SessionStatus,
}

impl Session {
    pub fn new(id: SessionId, working_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            working_dir,
            output_dir,
            status: SessionStatus::Active,
        }
    }

    pub fn close(&mut self) {
        self.status = SessionStatus::Closed;
    }
}
