//! Types for the migration system.

use crate::migration::events::ListenerError;
use crate::store::StoreError;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while discovering migration units.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Cannot read migrations directory {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed migration {id}: {reason}")]
    Malformed { id: String, reason: String },

    #[error("Duplicate migration id: {0}")]
    Duplicate(String),
}

/// Failure of a unit's own `up` or `down` operation.
#[derive(Error, Debug)]
pub enum UnitExecutionError {
    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command `{command}` exited with {}: {stderr}", exit_code_label(.code))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{0}")]
    Failed(String),
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Error types for migration engine operations.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Migration not found: {0}")]
    NotFound(String),

    #[error("Migration {id} failed ({direction}): {source}")]
    Unit {
        id: String,
        direction: MigrationDirection,
        #[source]
        source: UnitExecutionError,
    },

    #[error("Listener error: {0}")]
    Listener(#[from] ListenerError),

    /// A multi-unit run stopped part way. `completed` holds the ids that
    /// were processed (and persisted) before the failure.
    #[error("{source}")]
    Aborted {
        completed: Vec<String>,
        #[source]
        source: Box<MigrationError>,
    },
}

impl MigrationError {
    /// Ids processed before the failure point (empty unless `Aborted`).
    pub fn completed(&self) -> &[String] {
        match self {
            MigrationError::Aborted { completed, .. } => completed,
            _ => &[],
        }
    }

    /// The underlying error, looking through `Aborted`.
    pub fn root(&self) -> &MigrationError {
        match self {
            MigrationError::Aborted { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Trait for a single migration unit.
///
/// Each unit is identified by a timestamp-prefixed id and must be
/// reversible (implement both up and down).
#[async_trait]
pub trait Migration: Send + Sync {
    /// Unique id, e.g. `20230101120000-create-users`. Sort key.
    fn id(&self) -> &str;

    /// Human-readable description of what this migration does.
    fn description(&self) -> &str {
        ""
    }

    /// Checksum of the unit's source, if it has one.
    fn checksum(&self) -> Option<&str> {
        None
    }

    /// Apply the migration.
    async fn up(&self) -> Result<(), UnitExecutionError>;

    /// Revert the migration.
    async fn down(&self) -> Result<(), UnitExecutionError>;
}

/// Direction of migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    /// Applying pending units.
    Up,
    /// Reverting executed units.
    Down,
}

impl MigrationDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationDirection::Up => "up",
            MigrationDirection::Down => "down",
        }
    }
}

impl fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
