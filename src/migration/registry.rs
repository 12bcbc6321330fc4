//! In-code registry of migration units.

use super::loader::{sort_units, MigrationLoader};
use super::types::{LoadError, Migration};
use async_trait::async_trait;
use std::sync::Arc;

/// Registry of migrations compiled into the program.
///
/// The registry maintains a list kept sorted by id, so it can stand in
/// for a directory wherever a [`MigrationLoader`] is expected.
pub struct MigrationRegistry {
    migrations: Vec<Arc<dyn Migration>>,
}

impl MigrationRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            migrations: Vec::new(),
        }
    }

    /// Register a migration.
    ///
    /// Migrations are automatically sorted by id after registration.
    pub fn register(&mut self, migration: Arc<dyn Migration>) -> &mut Self {
        self.migrations.push(migration);
        self.migrations.sort_by(|a, b| a.id().cmp(b.id()));
        self
    }

    /// Ids of all registered migrations, in order.
    pub fn ids(&self) -> Vec<String> {
        self.migrations.iter().map(|m| m.id().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

impl Default for MigrationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MigrationLoader for MigrationRegistry {
    async fn list_all(&self) -> Result<Vec<Arc<dyn Migration>>, LoadError> {
        sort_units(self.migrations.clone())
    }
}
