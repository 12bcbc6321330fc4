use crate::config::MigrateConfig;
use crate::utils::TEMPLATE_FILE;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::GenerateError;

/// Built-in template for new migration units
pub const DEFAULT_TEMPLATE: &str = r#"{
  "description": "",
  "up": [],
  "down": []
}
"#;

/// Where a template came from
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateSource {
    /// Path from the config file
    Configured(PathBuf),
    /// `.template.json` inside the migrations directory
    ProjectLocal(PathBuf),
    BuiltIn,
}

/// A resolved template, ready to copy
#[derive(Debug, Clone)]
pub struct Template {
    pub source: TemplateSource,
    pub content: String,
}

impl Template {
    /// Extension to give generated files, including the dot
    pub fn extension(&self) -> String {
        let path = match &self.source {
            TemplateSource::Configured(path) | TemplateSource::ProjectLocal(path) => path,
            TemplateSource::BuiltIn => return ".json".to_string(),
        };

        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default()
    }
}

/// Get the path of the project-local template
pub fn get_project_template_path(migrations_dir: &Path) -> PathBuf {
    migrations_dir.join(TEMPLATE_FILE)
}

/// Find the template to copy.
///
/// Order: configured template, project-local template, built-in.
pub async fn resolve_template(
    project_path: &Path,
    config: &MigrateConfig,
) -> Result<Template, GenerateError> {
    if let Some(path) = config.template_path(project_path) {
        if !path.exists() {
            return Err(GenerateError::TemplateNotFound(path));
        }
        let content = fs::read_to_string(&path).await?;
        return Ok(Template {
            source: TemplateSource::Configured(path),
            content,
        });
    }

    let local = get_project_template_path(&config.migrations_path(project_path));
    if local.exists() {
        let content = fs::read_to_string(&local).await?;
        return Ok(Template {
            source: TemplateSource::ProjectLocal(local),
            content,
        });
    }

    Ok(Template {
        source: TemplateSource::BuiltIn,
        content: DEFAULT_TEMPLATE.to_string(),
    })
}
