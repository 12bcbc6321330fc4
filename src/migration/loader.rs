//! Discovery of migration units.

use super::script::{ScriptMigration, UnitDefinition};
use super::types::{LoadError, Migration};
use crate::utils::compute_checksum;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Extension of unit files in a migrations directory.
pub const UNIT_EXTENSION: &str = "json";

/// `<14-digit UTC timestamp>-<name>`
static MIGRATION_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{14}-[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("migration id pattern is valid")
});

/// Check if a string is a well-formed migration id
pub fn is_migration_id(s: &str) -> bool {
    MIGRATION_ID.is_match(s)
}

/// Source of the full, ordered list of migration units.
#[async_trait]
pub trait MigrationLoader: Send + Sync {
    /// All known units, ascending by id.
    async fn list_all(&self) -> Result<Vec<Arc<dyn Migration>>, LoadError>;
}

/// Sort units by id and reject duplicates.
pub(crate) fn sort_units(
    mut units: Vec<Arc<dyn Migration>>,
) -> Result<Vec<Arc<dyn Migration>>, LoadError> {
    units.sort_by(|a, b| a.id().cmp(b.id()));
    if let Some(pair) = units.windows(2).find(|pair| pair[0].id() == pair[1].id()) {
        return Err(LoadError::Duplicate(pair[0].id().to_string()));
    }
    Ok(units)
}

/// Loads JSON unit files from a directory.
///
/// Each `<id>.json` file becomes a [`ScriptMigration`]. Hidden files, other
/// extensions and names that are not migration ids are skipped.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    migrations_dir: PathBuf,
    working_dir: PathBuf,
    shell: String,
}

impl DirectoryLoader {
    pub fn new(migrations_dir: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            migrations_dir: migrations_dir.into(),
            working_dir: working_dir.into(),
            shell: "sh".to_string(),
        }
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn migrations_dir(&self) -> &Path {
        &self.migrations_dir
    }

    /// Unit files in the directory, sorted by file name.
    fn unit_files(&self) -> Result<Vec<(String, PathBuf)>, LoadError> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.migrations_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| LoadError::Unreadable {
                path: self.migrations_dir.clone(),
                source: e.into(),
            })?;
            let path = entry.path();

            if !entry.file_type().is_file() {
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some(UNIT_EXTENSION) {
                continue;
            }

            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            if !is_migration_id(stem) {
                debug!(file = %path.display(), "Skipping file without a migration id");
                continue;
            }

            files.push((stem.to_string(), path.to_path_buf()));
        }

        Ok(files)
    }

    async fn load_unit(&self, id: String, path: &Path) -> Result<ScriptMigration, LoadError> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| LoadError::Malformed {
                id: id.clone(),
                reason: e.to_string(),
            })?;

        let definition: UnitDefinition =
            serde_json::from_str(&content).map_err(|e| LoadError::Malformed {
                id: id.clone(),
                reason: e.to_string(),
            })?;

        Ok(ScriptMigration::new(id, definition, self.working_dir.clone())
            .with_shell(self.shell.clone())
            .with_checksum(compute_checksum(&content)))
    }
}

#[async_trait]
impl MigrationLoader for DirectoryLoader {
    async fn list_all(&self) -> Result<Vec<Arc<dyn Migration>>, LoadError> {
        if !self.migrations_dir.exists() {
            warn!(
                dir = %self.migrations_dir.display(),
                "Migrations directory does not exist, no units loaded"
            );
            return Ok(Vec::new());
        }
        if !self.migrations_dir.is_dir() {
            return Err(LoadError::Unreadable {
                path: self.migrations_dir.clone(),
                source: std::io::Error::other("not a directory"),
            });
        }

        let mut units: Vec<Arc<dyn Migration>> = Vec::new();
        for (id, path) in self.unit_files()? {
            units.push(Arc::new(self.load_unit(id, &path).await?));
        }

        debug!(count = units.len(), "Loaded migration units");
        sort_units(units)
    }
}
