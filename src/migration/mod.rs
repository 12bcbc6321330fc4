//! Migration engine.
//!
//! # Overview
//!
//! - A [`MigrationLoader`] supplies every known unit, ascending by id
//!   ([`DirectoryLoader`] for JSON files on disk, [`MigrationRegistry`] for
//!   units registered in code)
//! - An [`ExecutionStore`](crate::store::ExecutionStore) records which ids
//!   have run
//! - The [`Migrator`] computes the pending/executed sets and runs units one
//!   at a time, forward or backward, emitting events through an
//!   [`EventNotifier`]
//! - A failing unit aborts the run; units completed before it stay recorded
//!
//! # Usage
//!
//! ```ignore
//! let loader = Arc::new(DirectoryLoader::new("migrations", "."));
//! let store = Arc::new(JsonFileStore::new(".migrate/state.json"));
//! let migrator = Migrator::new(loader, store);
//! let applied = migrator.up(UpOptions::default()).await?;
//! ```

pub mod events;
mod executor;
mod loader;
mod registry;
mod script;
mod types;

pub use events::{EventKind, EventNotifier, ListenerError, MigrationEvent};
pub use executor::{DownOptions, DownTarget, MigrationStatus, Migrator, UpOptions};
pub use loader::{is_migration_id, DirectoryLoader, MigrationLoader, UNIT_EXTENSION};
pub use registry::MigrationRegistry;
pub use script::{ScriptMigration, UnitDefinition};
pub use types::{LoadError, Migration, MigrationDirection, MigrationError, UnitExecutionError};
