//! Creation of new migration unit files from a template.

mod template;

pub use template::{
    get_project_template_path, resolve_template, Template, TemplateSource, DEFAULT_TEMPLATE,
};

use crate::config::MigrateConfig;
use crate::utils::migration_timestamp;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::info;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Migration name is required")]
    NameRequired,

    #[error("Invalid migration name '{0}': use letters, digits, '-', '_' or '.'")]
    InvalidName(String),

    #[error("Template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("Migration file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),
}

static MIGRATION_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("migration name pattern is valid")
});

/// Result of generating a migration
#[derive(Debug, Clone)]
pub struct GenerateResult {
    /// New unit id, `<timestamp>-<name>`
    pub id: String,
    /// Path of the created file
    pub path: PathBuf,
    pub template: TemplateSource,
}

/// Create a new migration unit named `<UTC timestamp>-<name>`
pub async fn generate_migration(
    project_path: &Path,
    config: &MigrateConfig,
    name: &str,
) -> Result<GenerateResult, GenerateError> {
    generate_migration_at(project_path, config, name, Utc::now()).await
}

/// Same as [`generate_migration`] with an explicit creation instant
pub async fn generate_migration_at(
    project_path: &Path,
    config: &MigrateConfig,
    name: &str,
    now: DateTime<Utc>,
) -> Result<GenerateResult, GenerateError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GenerateError::NameRequired);
    }
    if !MIGRATION_NAME.is_match(name) {
        return Err(GenerateError::InvalidName(name.to_string()));
    }

    let template = resolve_template(project_path, config).await?;

    let migrations_path = config.migrations_path(project_path);
    if !migrations_path.exists() {
        fs::create_dir_all(&migrations_path).await?;
    }

    let id = format!("{}-{}", migration_timestamp(now), name);
    let path = migrations_path.join(format!("{}{}", id, template.extension()));

    if path.exists() {
        return Err(GenerateError::AlreadyExists(path));
    }

    fs::write(&path, &template.content).await?;
    info!(id = %id, path = %path.display(), "Created migration");

    Ok(GenerateResult {
        id,
        path,
        template: template.source,
    })
}
