use crate::utils::{
    get_config_path, resolve_path, DEFAULT_MIGRATIONS_DIR, DEFAULT_STATE_PATH,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    JsonError(#[from] serde_json::Error),
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from(DEFAULT_MIGRATIONS_DIR)
}

fn default_state_path() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_PATH)
}

fn default_shell() -> String {
    "sh".to_string()
}

/// Project configuration, read from `migrate.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MigrateConfig {
    /// Directory holding migration units, relative to the project root
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,
    /// Execution state file, relative to the project root
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
    /// Template copied by `migration:generate`. None = built-in template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<PathBuf>,
    /// Shell used to run unit commands
    #[serde(default = "default_shell")]
    pub shell: String,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            migrations_dir: default_migrations_dir(),
            state_path: default_state_path(),
            template: None,
            shell: default_shell(),
        }
    }
}

impl MigrateConfig {
    /// Absolute migrations directory for a project
    pub fn migrations_path(&self, project_path: &Path) -> PathBuf {
        resolve_path(project_path, &self.migrations_dir)
    }

    /// Absolute state file path for a project
    pub fn state_file_path(&self, project_path: &Path) -> PathBuf {
        resolve_path(project_path, &self.state_path)
    }

    pub fn template_path(&self, project_path: &Path) -> Option<PathBuf> {
        self.template
            .as_ref()
            .map(|template| resolve_path(project_path, template))
    }
}

/// Read the configuration file
pub async fn read_config(project_path: &Path) -> Result<Option<MigrateConfig>, ConfigError> {
    let config_path = get_config_path(project_path);

    if !config_path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&config_path).await?;
    let config: MigrateConfig = serde_json::from_str(&content)?;
    Ok(Some(config))
}

/// Write the configuration file
pub async fn write_config(project_path: &Path, config: &MigrateConfig) -> Result<(), ConfigError> {
    let config_path = get_config_path(project_path);
    let content = serde_json::to_string_pretty(config)?;
    fs::write(&config_path, content).await?;
    Ok(())
}
