//! Migrator: computes pending/executed sets and runs units.

use super::events::{EventNotifier, MigrationEvent};
use super::loader::MigrationLoader;
use super::types::{Migration, MigrationDirection, MigrationError};
use crate::store::{ExecutionRecord, ExecutionStore, StoreError};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Options for [`Migrator::up`].
#[derive(Debug, Clone, Default)]
pub struct UpOptions {
    /// Stop after this pending id (inclusive).
    pub to: Option<String>,
}

impl UpOptions {
    pub fn to(id: impl Into<String>) -> Self {
        Self { to: Some(id.into()) }
    }
}

/// How far [`Migrator::down`] reverts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DownTarget {
    /// Only the most recently applied unit.
    #[default]
    Latest,
    /// Every executed unit.
    All,
    /// From the most recent down to and including this id.
    To(String),
}

impl DownTarget {
    /// `"0"` means all, anything else is a target id.
    pub fn parse(value: &str) -> Self {
        if value == "0" {
            DownTarget::All
        } else {
            DownTarget::To(value.to_string())
        }
    }
}

/// Options for [`Migrator::down`].
#[derive(Debug, Clone, Default)]
pub struct DownOptions {
    pub to: DownTarget,
}

impl DownOptions {
    pub fn all() -> Self {
        Self { to: DownTarget::All }
    }

    pub fn to(id: impl Into<String>) -> Self {
        Self {
            to: DownTarget::To(id.into()),
        }
    }
}

/// Snapshot of executed and pending units.
#[derive(Debug, Clone, Default)]
pub struct MigrationStatus {
    /// Executed records, in id order.
    pub executed: Vec<ExecutionRecord>,
    /// Pending ids, in id order.
    pub pending: Vec<String>,
    /// Executed ids whose source changed since they ran.
    pub modified: Vec<String>,
    /// Executed ids with no loaded unit.
    pub missing: Vec<String>,
}

/// Runs migration units against an execution store.
///
/// Units are processed strictly one after another. A unit's store update
/// completes before the next unit starts. At most one migrator may work
/// against a given store at a time.
pub struct Migrator {
    loader: Arc<dyn MigrationLoader>,
    store: Arc<dyn ExecutionStore>,
    notifier: EventNotifier,
}

impl Migrator {
    pub fn new(loader: Arc<dyn MigrationLoader>, store: Arc<dyn ExecutionStore>) -> Self {
        Self {
            loader,
            store,
            notifier: EventNotifier::new(),
        }
    }

    pub fn with_notifier(mut self, notifier: EventNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn notifier_mut(&mut self) -> &mut EventNotifier {
        &mut self.notifier
    }

    /// Loaded units without an execution record, in id order.
    pub async fn pending(&self) -> Result<Vec<Arc<dyn Migration>>, MigrationError> {
        let units = self.loader.list_all().await?;
        let executed = self.executed_ids().await?;
        Ok(units
            .into_iter()
            .filter(|unit| !executed.contains(unit.id()))
            .collect())
    }

    /// Execution records, in id order.
    pub async fn executed(&self) -> Result<Vec<ExecutionRecord>, MigrationError> {
        Ok(self.store.executed().await?)
    }

    async fn executed_ids(&self) -> Result<HashSet<String>, MigrationError> {
        Ok(self
            .store
            .executed()
            .await?
            .into_iter()
            .map(|record| record.migration_id)
            .collect())
    }

    pub async fn status(&self) -> Result<MigrationStatus, MigrationError> {
        let units = self.loader.list_all().await?;
        let executed = self.store.executed().await?;

        let by_id: HashMap<&str, &Arc<dyn Migration>> =
            units.iter().map(|unit| (unit.id(), unit)).collect();
        let executed_ids: HashSet<&str> =
            executed.iter().map(|r| r.migration_id.as_str()).collect();

        let mut status = MigrationStatus {
            pending: units
                .iter()
                .filter(|unit| !executed_ids.contains(unit.id()))
                .map(|unit| unit.id().to_string())
                .collect(),
            ..Default::default()
        };

        for record in &executed {
            match by_id.get(record.migration_id.as_str()) {
                None => status.missing.push(record.migration_id.clone()),
                Some(unit) => {
                    if let (Some(recorded), Some(current)) =
                        (record.checksum.as_deref(), unit.checksum())
                    {
                        if recorded != current {
                            status.modified.push(record.migration_id.clone());
                        }
                    }
                }
            }
        }

        status.executed = executed;
        Ok(status)
    }

    /// Apply pending units in ascending id order.
    ///
    /// Returns the applied ids. On failure the error is
    /// [`MigrationError::Aborted`] carrying the ids applied before it; those
    /// stay logged.
    pub async fn up(&self, options: UpOptions) -> Result<Vec<String>, MigrationError> {
        let mut pending = self.pending().await?;

        if let Some(to) = &options.to {
            let position = pending
                .iter()
                .position(|unit| unit.id() == to.as_str())
                .ok_or_else(|| MigrationError::NotFound(to.clone()))?;
            pending.truncate(position + 1);
        }

        if pending.is_empty() {
            info!("No pending migrations");
            return Ok(Vec::new());
        }

        info!(count = pending.len(), "Applying migrations");
        let applied = self.run(&pending, MigrationDirection::Up).await?;
        info!(count = applied.len(), "Migrations applied");
        Ok(applied)
    }

    /// Revert executed units in descending id order.
    ///
    /// Without a target only the latest unit is reverted. Returns the
    /// reverted ids; failures are reported like [`Migrator::up`].
    pub async fn down(&self, options: DownOptions) -> Result<Vec<String>, MigrationError> {
        let executed = self.store.executed().await?;
        let ids: Vec<&str> = executed.iter().map(|r| r.migration_id.as_str()).collect();

        let selected: &[&str] = match &options.to {
            DownTarget::Latest => {
                let start = ids.len().saturating_sub(1);
                &ids[start..]
            }
            DownTarget::All => &ids[..],
            DownTarget::To(to) => {
                let position = ids
                    .iter()
                    .position(|id| *id == to.as_str())
                    .ok_or_else(|| MigrationError::NotFound(to.clone()))?;
                &ids[position..]
            }
        };

        if selected.is_empty() {
            info!("No executed migrations to revert");
            return Ok(Vec::new());
        }

        let units = self.loader.list_all().await?;
        let by_id: HashMap<&str, &Arc<dyn Migration>> =
            units.iter().map(|unit| (unit.id(), unit)).collect();

        // Resolve every unit before touching anything
        let to_revert = selected
            .iter()
            .rev()
            .map(|id| {
                by_id
                    .get(id)
                    .map(|unit| Arc::clone(*unit))
                    .ok_or_else(|| MigrationError::NotFound(id.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!(count = to_revert.len(), "Reverting migrations");
        let reverted = self.run(&to_revert, MigrationDirection::Down).await?;
        info!(count = reverted.len(), "Migrations reverted");
        Ok(reverted)
    }

    /// Run units in the given order, stopping at the first failure.
    ///
    /// A unit counts as completed once its store update lands, so a failing
    /// after-event listener still reports it.
    async fn run(
        &self,
        units: &[Arc<dyn Migration>],
        direction: MigrationDirection,
    ) -> Result<Vec<String>, MigrationError> {
        let mut completed = Vec::with_capacity(units.len());

        for unit in units {
            let after = match self.run_unit(&**unit, direction).await {
                Ok(after) => after,
                Err(e) => {
                    error!(id = %unit.id(), %direction, error = %e, "Migration failed");
                    return Err(MigrationError::Aborted {
                        completed,
                        source: Box::new(e),
                    });
                }
            };
            completed.push(unit.id().to_string());

            if let Err(e) = self.notifier.emit(&after) {
                error!(id = %unit.id(), %direction, error = %e, "Listener failed after store update");
                return Err(MigrationError::Aborted {
                    completed,
                    source: Box::new(e.into()),
                });
            }
        }

        Ok(completed)
    }

    /// Emit the before-event, run the unit and update the store.
    ///
    /// Returns the after-event; emitting it is left to the caller.
    async fn run_unit(
        &self,
        unit: &dyn Migration,
        direction: MigrationDirection,
    ) -> Result<MigrationEvent, MigrationError> {
        let id = unit.id().to_string();

        let before = match direction {
            MigrationDirection::Up => MigrationEvent::Migrating { id: id.clone() },
            MigrationDirection::Down => MigrationEvent::Reverting { id: id.clone() },
        };
        self.notifier.emit(&before)?;

        info!(id = %id, description = %unit.description(), "{}", before.kind().as_str());
        let started = Instant::now();

        let result = match direction {
            MigrationDirection::Up => unit.up().await,
            MigrationDirection::Down => unit.down().await,
        };
        result.map_err(|source| MigrationError::Unit {
            id: id.clone(),
            direction,
            source,
        })?;

        match direction {
            MigrationDirection::Up => match self.store.log_migration(&id, unit.checksum()).await {
                Ok(_) => {}
                Err(StoreError::AlreadyLogged(_)) => {
                    warn!(id = %id, "Migration was already logged as executed");
                }
                Err(e) => return Err(e.into()),
            },
            MigrationDirection::Down => self.store.unlog_migration(&id).await?,
        }

        let after = match direction {
            MigrationDirection::Up => MigrationEvent::Migrated { id: id.clone() },
            MigrationDirection::Down => MigrationEvent::Reverted { id: id.clone() },
        };
        info!(
            id = %id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "{}",
            after.kind().as_str()
        );

        Ok(after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::registry::MigrationRegistry;
    use crate::migration::types::UnitExecutionError;
    use crate::store::MemoryStore;
    use async_trait::async_trait;

    struct NoopMigration(&'static str);

    #[async_trait]
    impl Migration for NoopMigration {
        fn id(&self) -> &str {
            self.0
        }

        async fn up(&self) -> Result<(), UnitExecutionError> {
            Ok(())
        }

        async fn down(&self) -> Result<(), UnitExecutionError> {
            Ok(())
        }
    }

    fn migrator(ids: &[&'static str], store: Arc<MemoryStore>) -> Migrator {
        let mut registry = MigrationRegistry::new();
        for id in ids {
            registry.register(Arc::new(NoopMigration(*id)));
        }
        Migrator::new(Arc::new(registry), store)
    }

    #[test]
    fn test_down_target_parse() {
        assert_eq!(DownTarget::parse("0"), DownTarget::All);
        assert_eq!(
            DownTarget::parse("20230101000000-a"),
            DownTarget::To("20230101000000-a".to_string())
        );
        assert_eq!(DownOptions::default().to, DownTarget::Latest);
    }

    #[tokio::test]
    async fn test_up_to_unknown_id_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let migrator = migrator(&["20230101000000-a"], Arc::clone(&store));

        let err = migrator
            .up(UpOptions::to("20991231000000-missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, MigrationError::NotFound(_)));
        assert!(store.executed().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_down_on_empty_state_is_noop() {
        let store = Arc::new(MemoryStore::new());
        let migrator = migrator(&["20230101000000-a"], store);
        assert!(migrator.down(DownOptions::default()).await.unwrap().is_empty());
        assert!(migrator.down(DownOptions::all()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_down_with_missing_unit_fails_before_running() {
        let store = Arc::new(MemoryStore::with_executed([
            "20230101000000-a",
            "20230102000000-gone",
        ]));
        let migrator = migrator(&["20230101000000-a"], Arc::clone(&store));

        let err = migrator.down(DownOptions::all()).await.unwrap_err();
        assert!(matches!(err, MigrationError::NotFound(id) if id == "20230102000000-gone"));
        assert_eq!(store.executed().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_status_reports_missing_and_pending() {
        let store = Arc::new(MemoryStore::with_executed(["20230101000000-gone"]));
        let migrator = migrator(&["20230102000000-b"], store);

        let status = migrator.status().await.unwrap();
        assert_eq!(status.pending, vec!["20230102000000-b"]);
        assert_eq!(status.missing, vec!["20230101000000-gone"]);
        assert!(status.modified.is_empty());
        assert_eq!(status.executed.len(), 1);
    }
}
