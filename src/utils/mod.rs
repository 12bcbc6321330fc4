mod hash;

pub use hash::compute_checksum;

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Name of the optional project config file
pub const CONFIG_FILE: &str = "migrate.json";

/// Default directory holding migration units
pub const DEFAULT_MIGRATIONS_DIR: &str = "migrations";

/// Default location of the execution state file
pub const DEFAULT_STATE_PATH: &str = ".migrate/state.json";

/// Name of a project-local template inside the migrations directory
pub const TEMPLATE_FILE: &str = ".template.json";

/// Get the path to the config file
pub fn get_config_path(project_path: &Path) -> PathBuf {
    project_path.join(CONFIG_FILE)
}

/// Resolve a possibly relative path against the project root
pub fn resolve_path(project_path: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_path.join(path)
    }
}

/// Get current timestamp in ISO 8601 format
pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

/// Format an instant as a migration id prefix (`YYYYMMDDHHMMSS`, UTC)
pub fn migration_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d%H%M%S").to_string()
}
