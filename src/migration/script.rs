//! File-backed migration units whose steps are shell commands.

use super::types::{Migration, MigrationDirection, UnitExecutionError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// On-disk shape of a migration unit file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnitDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub up: Vec<String>,
    pub down: Vec<String>,
}

/// A migration unit that runs its commands through a shell.
#[derive(Debug, Clone)]
pub struct ScriptMigration {
    id: String,
    description: String,
    up: Vec<String>,
    down: Vec<String>,
    checksum: Option<String>,
    working_dir: PathBuf,
    shell: String,
}

impl ScriptMigration {
    pub fn new(id: impl Into<String>, definition: UnitDefinition, working_dir: PathBuf) -> Self {
        Self {
            id: id.into(),
            description: definition.description.unwrap_or_default(),
            up: definition.up,
            down: definition.down,
            checksum: None,
            working_dir,
            shell: "sh".to_string(),
        }
    }

    pub fn with_checksum(mut self, checksum: String) -> Self {
        self.checksum = Some(checksum);
        self
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn commands(&self, direction: MigrationDirection) -> &[String] {
        match direction {
            MigrationDirection::Up => &self.up,
            MigrationDirection::Down => &self.down,
        }
    }

    async fn run(&self, direction: MigrationDirection) -> Result<(), UnitExecutionError> {
        for command in self.commands(direction) {
            debug!(id = %self.id, %direction, command = %command, "Running command");

            let output = Command::new(&self.shell)
                .arg("-c")
                .arg(command)
                .current_dir(&self.working_dir)
                .env("MIGRATION_ID", &self.id)
                .env("MIGRATION_DIRECTION", direction.as_str())
                .stdin(Stdio::null())
                .output()
                .await
                .map_err(|source| UnitExecutionError::Spawn {
                    command: command.clone(),
                    source,
                })?;

            let stdout = String::from_utf8_lossy(&output.stdout);
            for line in stdout.lines() {
                debug!(id = %self.id, "{}", line);
            }

            if !output.status.success() {
                return Err(UnitExecutionError::CommandFailed {
                    command: command.clone(),
                    code: output.status.code(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Migration for ScriptMigration {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    async fn up(&self) -> Result<(), UnitExecutionError> {
        self.run(MigrationDirection::Up).await
    }

    async fn down(&self) -> Result<(), UnitExecutionError> {
        self.run(MigrationDirection::Down).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(up: &[&str], down: &[&str], dir: PathBuf) -> ScriptMigration {
        let definition = UnitDefinition {
            description: Some("test unit".to_string()),
            up: up.iter().map(|c| c.to_string()).collect(),
            down: down.iter().map(|c| c.to_string()).collect(),
        };
        ScriptMigration::new("20230101000000-test", definition, dir)
    }

    #[test]
    fn test_definition_requires_up_and_down() {
        let missing_down = serde_json::from_str::<UnitDefinition>(r#"{ "up": [] }"#);
        assert!(missing_down.is_err());

        let ok = serde_json::from_str::<UnitDefinition>(r#"{ "up": [], "down": [] }"#).unwrap();
        assert!(ok.description.is_none());
    }

    #[tokio::test]
    async fn test_up_runs_commands_in_working_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let migration = unit(&["touch created"], &["rm created"], temp_dir.path().to_path_buf());

        migration.up().await.unwrap();
        assert!(temp_dir.path().join("created").exists());

        migration.down().await.unwrap();
        assert!(!temp_dir.path().join("created").exists());
    }

    #[tokio::test]
    async fn test_environment_carries_id_and_direction() {
        let temp_dir = tempfile::tempdir().unwrap();
        let migration = unit(
            &["echo \"$MIGRATION_ID $MIGRATION_DIRECTION\" > env.txt"],
            &[],
            temp_dir.path().to_path_buf(),
        );

        migration.up().await.unwrap();
        let content = std::fs::read_to_string(temp_dir.path().join("env.txt")).unwrap();
        assert_eq!(content.trim(), "20230101000000-test up");
    }

    #[tokio::test]
    async fn test_failing_command_stops_the_unit() {
        let temp_dir = tempfile::tempdir().unwrap();
        let migration = unit(
            &["echo oops >&2; exit 3", "touch never"],
            &[],
            temp_dir.path().to_path_buf(),
        );

        let err = migration.up().await.unwrap_err();
        match err {
            UnitExecutionError::CommandFailed { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "oops");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!temp_dir.path().join("never").exists());
    }

    #[tokio::test]
    async fn test_empty_command_list_is_noop() {
        let temp_dir = tempfile::tempdir().unwrap();
        let migration = unit(&[], &[], temp_dir.path().to_path_buf());
        assert!(migration.up().await.is_ok());
        assert!(migration.down().await.is_ok());
    }
}
