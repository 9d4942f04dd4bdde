//! Migration Manager (C5): ordered migrations, `schema_version` tracking,
//! backup-before-apply, and reverse-sweep rollback on failure.
//!
//! Registration mirrors the `if current_version < N { apply_migration_N(conn)? }`
//! sequential-apply shape, generalized from a fixed version ladder to a
//! registered, sorted `Vec<Migration>` so callers can assemble their own
//! migration set instead of editing this module.

use futures::future::BoxFuture;
use tracing::{error, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::engine::StorageEngine;

/// A migration step. `up`/`down` are plain function pointers rather than
/// boxed closures: migrations are registered once at startup from a static
/// list, never constructed with captured state.
pub type MigrationFn = for<'a> fn(&'a StorageEngine) -> BoxFuture<'a, EngineResult<()>>;

pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub up: MigrationFn,
    pub down: Option<MigrationFn>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedMigration {
    pub version: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrateOutcome {
    pub applied: usize,
    pub failed: Option<FailedMigration>,
}

#[derive(Default)]
pub struct MigrationManager {
    migrations: Vec<Migration>,
}

impl MigrationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `migration` and re-sorts ascending by version. Registering a
    /// version already present is a programming error (I4's uniqueness
    /// requirement), surfaced rather than silently overwritten.
    pub fn register(&mut self, migration: Migration) -> EngineResult<()> {
        if self.migrations.iter().any(|m| m.version == migration.version) {
            return Err(EngineError::DuplicateMigrationVersion(migration.version));
        }
        self.migrations.push(migration);
        self.migrations.sort_by_key(|m| m.version);
        Ok(())
    }

    pub async fn current_version(&self, engine: &StorageEngine) -> EngineResult<i64> {
        let rows: Vec<i64> = engine
            .query(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                vec![],
                None,
                |row| row.get(0),
            )
            .await?;
        Ok(rows.into_iter().next().unwrap_or(0))
    }

    /// Registered migrations with `version > current_version()`, in
    /// ascending order.
    pub async fn pending(&self, engine: &StorageEngine) -> EngineResult<Vec<&Migration>> {
        let current = self.current_version(engine).await?;
        Ok(self.migrations.iter().filter(|m| m.version > current).collect())
    }

    /// Snapshots the database file set, applies pending migrations in
    /// order, and reverses them on the first failure.
    pub async fn migrate(&self, engine: &StorageEngine) -> EngineResult<MigrateOutcome> {
        let pending = self.pending(engine).await?;
        if pending.is_empty() {
            return Ok(MigrateOutcome {
                applied: 0,
                failed: None,
            });
        }

        self.snapshot_backup(engine).await;

        let mut applied: Vec<&Migration> = Vec::new();
        for migration in pending {
            match (migration.up)(engine).await {
                Ok(()) => {
                    engine
                        .execute(
                            "INSERT INTO schema_version(version, applied_at) VALUES (?1, ?2)",
                            vec![migration.version.into(), now_ms().into()],
                            None,
                        )
                        .await?;
                    info!(
                        version = migration.version,
                        name = migration.name,
                        applied_at = %format_epoch_ms(now_ms()),
                        "migration applied"
                    );
                    applied.push(migration);
                }
                Err(cause) => {
                    error!(
                        version = migration.version,
                        name = migration.name,
                        error = %cause,
                        "migration failed; reversing previously applied migrations from this run"
                    );
                    self.reverse_sweep(engine, &applied).await;
                    return Ok(MigrateOutcome {
                        applied: 0,
                        failed: Some(FailedMigration {
                            version: migration.version,
                            name: migration.name.to_string(),
                        }),
                    });
                }
            }
        }
        Ok(MigrateOutcome {
            applied: applied.len(),
            failed: None,
        })
    }

    /// Undoes `applied` in reverse order. A rollback error is logged and the
    /// sweep continues — a partially-reversed migration set is still closer
    /// to safe than stopping the sweep early.
    async fn reverse_sweep(&self, engine: &StorageEngine, applied: &[&Migration]) {
        for migration in applied.iter().rev() {
            if let Some(down) = migration.down {
                if let Err(err) = down(engine).await {
                    warn!(version = migration.version, error = %err, "rollback failed during reverse sweep");
                }
            } else {
                warn!(version = migration.version, "no down() registered; cannot reverse this step");
            }
            let _ = engine
                .execute(
                    "DELETE FROM schema_version WHERE version = ?1",
                    vec![migration.version.into()],
                    None,
                )
                .await;
        }
    }

    /// Rolls back every applied migration with `version > target`, in
    /// descending order. Requires `down` on each; missing one is a fatal
    /// configuration error, not a skip.
    pub async fn rollback_to(&self, engine: &StorageEngine, target: i64) -> EngineResult<usize> {
        let rows: Vec<i64> = engine
            .query(
                "SELECT version FROM schema_version WHERE version > ?1 ORDER BY version DESC",
                vec![target.into()],
                None,
                |row| row.get(0),
            )
            .await?;

        // Resolve and validate every step before touching any state: a
        // missing down() partway through would otherwise leave the schema
        // half rolled back with nothing to show the caller but an error.
        let mut steps = Vec::with_capacity(rows.len());
        for version in rows {
            let migration = self
                .migrations
                .iter()
                .find(|m| m.version == version)
                .ok_or_else(|| EngineError::MigrationFailed {
                    version,
                    name: "<unregistered>".to_string(),
                    cause: "no migration registered for this applied version".to_string(),
                })?;
            let down = migration.down.ok_or(EngineError::MissingDown {
                version: migration.version,
                name: migration.name.to_string(),
            })?;
            steps.push((version, down));
        }

        let mut rolled_back = 0;
        for (version, down) in steps {
            down(engine).await?;
            engine
                .execute(
                    "DELETE FROM schema_version WHERE version = ?1",
                    vec![version.into()],
                    None,
                )
                .await?;
            rolled_back += 1;
        }
        Ok(rolled_back)
    }

    /// Copies the database file set to `<path>.backup.<epoch_ms>`, after a
    /// WAL checkpoint so the copy is self-consistent without needing
    /// post-restore recovery. Failures are logged, not surfaced — a missed
    /// backup should not block an otherwise-safe migration run (the reverse
    /// sweep is the real safety net).
    async fn snapshot_backup(&self, engine: &StorageEngine) {
        if engine.config().enable_wal {
            let checkpoint: EngineResult<Vec<()>> = engine
                .query("PRAGMA wal_checkpoint(TRUNCATE)", vec![], None, |_| Ok(()))
                .await;
            if let Err(err) = checkpoint {
                warn!(error = %err, "checkpoint before migration backup failed");
            }
        }

        let ms = now_ms();
        let db_path = engine.config().path.clone();
        let result = tokio::task::spawn_blocking(move || copy_database_file_set(&db_path, ms)).await;
        match result {
            Ok(Ok(())) => info!(epoch_ms = ms, "migration backup snapshot written"),
            Ok(Err(err)) => warn!(error = %err, "migration backup snapshot failed"),
            Err(join_err) => warn!(error = %join_err, "migration backup task panicked"),
        }
    }
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Renders an epoch-millisecond timestamp as RFC 3339 for log lines; falls
/// back to the raw number if it's out of chrono's representable range.
fn format_epoch_ms(epoch_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(epoch_ms)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| epoch_ms.to_string())
}

fn copy_database_file_set(db_path: &std::path::Path, epoch_ms: i64) -> std::io::Result<()> {
    let backup_path = path_with_suffix(db_path, &format!(".backup.{epoch_ms}"));
    std::fs::copy(db_path, backup_path)?;

    for sibling_suffix in ["-wal", "-shm"] {
        let sibling = path_with_suffix(db_path, sibling_suffix);
        if sibling.exists() {
            let backup_sibling = path_with_suffix(db_path, &format!("{sibling_suffix}.backup.{epoch_ms}"));
            std::fs::copy(sibling, backup_sibling)?;
        }
    }
    Ok(())
}

fn path_with_suffix(path: &std::path::Path, suffix: &str) -> std::path::PathBuf {
    let mut os_string = path.as_os_str().to_os_string();
    os_string.push(suffix);
    std::path::PathBuf::from(os_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use tempfile::tempdir;

    fn v1_up(engine: &StorageEngine) -> BoxFuture<'_, EngineResult<()>> {
        Box::pin(async move {
            engine
                .execute("CREATE TABLE t_v1(id INTEGER PRIMARY KEY)", vec![], None)
                .await?;
            Ok(())
        })
    }
    fn v1_down(engine: &StorageEngine) -> BoxFuture<'_, EngineResult<()>> {
        Box::pin(async move {
            engine.execute("DROP TABLE t_v1", vec![], None).await?;
            Ok(())
        })
    }
    fn v2_up(engine: &StorageEngine) -> BoxFuture<'_, EngineResult<()>> {
        Box::pin(async move {
            engine
                .execute("CREATE TABLE t_v2(id INTEGER PRIMARY KEY)", vec![], None)
                .await?;
            Ok(())
        })
    }
    fn v2_down(engine: &StorageEngine) -> BoxFuture<'_, EngineResult<()>> {
        Box::pin(async move {
            engine.execute("DROP TABLE t_v2", vec![], None).await?;
            Ok(())
        })
    }
    fn v3_up_always_fails(_engine: &StorageEngine) -> BoxFuture<'_, EngineResult<()>> {
        Box::pin(async move { Err(EngineError::Sql("intentional failure for v3".into())) })
    }

    async fn engine_with_schema() -> (tempfile::TempDir, StorageEngine) {
        let dir = tempdir().unwrap();
        let engine = StorageEngine::new(EngineConfig::test_mode(dir.path().join("test.db")));
        engine.initialize().await.unwrap();
        (dir, engine)
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_versions() {
        let mut manager = MigrationManager::new();
        manager
            .register(Migration {
                version: 1,
                name: "v1",
                up: v1_up,
                down: Some(v1_down),
            })
            .unwrap();
        let err = manager
            .register(Migration {
                version: 1,
                name: "v1-again",
                up: v1_up,
                down: Some(v1_down),
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateMigrationVersion(1)));
    }

    #[tokio::test]
    async fn test_migrate_applies_in_ascending_order() {
        // P8
        let (_dir, engine) = engine_with_schema().await;
        let mut manager = MigrationManager::new();
        manager
            .register(Migration { version: 2, name: "v2", up: v2_up, down: Some(v2_down) })
            .unwrap();
        manager
            .register(Migration { version: 1, name: "v1", up: v1_up, down: Some(v1_down) })
            .unwrap();

        let outcome = manager.migrate(&engine).await.unwrap();
        assert_eq!(outcome.applied, 2);
        assert_eq!(manager.current_version(&engine).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_migrate_no_pending_is_a_no_op() {
        let (_dir, engine) = engine_with_schema().await;
        let manager = MigrationManager::new();
        let outcome = manager.migrate(&engine).await.unwrap();
        assert_eq!(outcome.applied, 0);
        assert!(outcome.failed.is_none());
    }

    #[tokio::test]
    async fn test_failed_migration_reverses_prior_steps() {
        // S6
        let (_dir, engine) = engine_with_schema().await;
        let mut manager = MigrationManager::new();
        manager
            .register(Migration { version: 1, name: "v1", up: v1_up, down: Some(v1_down) })
            .unwrap();
        manager
            .register(Migration { version: 2, name: "v2", up: v2_up, down: Some(v2_down) })
            .unwrap();
        manager
            .register(Migration {
                version: 3,
                name: "v3",
                up: v3_up_always_fails,
                down: None,
            })
            .unwrap();

        let outcome = manager.migrate(&engine).await.unwrap();
        assert_eq!(outcome.applied, 0);
        assert_eq!(outcome.failed.as_ref().unwrap().version, 3);
        assert_eq!(manager.current_version(&engine).await.unwrap(), 0);

        let remaining: Vec<String> = engine
            .query(
                "SELECT name FROM sqlite_master WHERE name IN ('t_v1','t_v2')",
                vec![],
                None,
                |row| row.get(0),
            )
            .await
            .unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn test_rollback_to_requires_down() {
        let (_dir, engine) = engine_with_schema().await;
        let mut manager = MigrationManager::new();
        manager
            .register(Migration {
                version: 1,
                name: "v1-no-down",
                up: v1_up,
                down: None,
            })
            .unwrap();
        manager.migrate(&engine).await.unwrap();

        let err = manager.rollback_to(&engine, 0).await.unwrap_err();
        assert!(matches!(err, EngineError::MissingDown { version: 1, .. }));
    }

    #[tokio::test]
    async fn test_rollback_to_validates_all_downs_before_undoing_any() {
        let (_dir, engine) = engine_with_schema().await;
        let mut manager = MigrationManager::new();
        manager
            .register(Migration { version: 1, name: "v1-no-down", up: v1_up, down: None })
            .unwrap();
        manager
            .register(Migration { version: 2, name: "v2", up: v2_up, down: Some(v2_down) })
            .unwrap();
        manager.migrate(&engine).await.unwrap();

        let err = manager.rollback_to(&engine, 0).await.unwrap_err();
        assert!(matches!(err, EngineError::MissingDown { version: 1, .. }));
        // version 2 must still be applied: nothing should have been undone
        // once the missing down() for version 1 was discovered.
        assert_eq!(manager.current_version(&engine).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_rollback_to_undoes_migrations_above_target() {
        let (_dir, engine) = engine_with_schema().await;
        let mut manager = MigrationManager::new();
        manager
            .register(Migration { version: 1, name: "v1", up: v1_up, down: Some(v1_down) })
            .unwrap();
        manager
            .register(Migration { version: 2, name: "v2", up: v2_up, down: Some(v2_down) })
            .unwrap();
        manager.migrate(&engine).await.unwrap();

        let rolled_back = manager.rollback_to(&engine, 1).await.unwrap();
        assert_eq!(rolled_back, 1);
        assert_eq!(manager.current_version(&engine).await.unwrap(), 1);
    }
}
