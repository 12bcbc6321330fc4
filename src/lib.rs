pub mod cli;
pub mod config;
pub mod generate;
pub mod migration;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::{read_config, write_config, ConfigError, MigrateConfig};
pub use generate::{generate_migration, generate_migration_at, GenerateError, GenerateResult};
pub use migration::{
    DirectoryLoader, DownOptions, DownTarget, EventKind, EventNotifier, ListenerError, LoadError,
    Migration, MigrationDirection, MigrationError, MigrationEvent, MigrationLoader,
    MigrationRegistry, MigrationStatus, Migrator, ScriptMigration, UnitExecutionError, UpOptions,
};
pub use store::{ExecutionRecord, ExecutionStore, JsonFileStore, MemoryStore, StoreError};
