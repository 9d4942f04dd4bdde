//! Engine Core (C4): lifecycle, schema bootstrap, query/execute/transaction/
//! batch, graceful degradation, health, reconnect.
//!
//! `StorageEngine` is a cheap `Clone` handle (`Arc<EngineInner>`) around a
//! single `rusqlite::Connection`. rusqlite is a blocking API, so every touch
//! of the connection happens inside `tokio::task::spawn_blocking`; writes
//! additionally route through the `WriteQueue` (C2) so at most one write
//! touches the connection at a time (I2), while reads race for the same
//! `std::sync::Mutex` directly. See DESIGN.md for why this, rather than a
//! connection pool, is the right shape for a single-file engine.

use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use rusqlite::{Connection, Row, ToSql};
use tracing::{debug, error, instrument, warn};

use crate::cache;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::queue::WriteQueue;
use crate::retry::with_timeout;
use crate::schema;

/// An owned SQL parameter. Query/execute parameters must be `'static` and
/// `Send` because they cross into `spawn_blocking` and, for writes, through
/// the queue — a borrowed `&dyn ToSql` cannot make that trip.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        use rusqlite::types::{ToSqlOutput, Value};
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            SqlValue::Real(r) => ToSqlOutput::Owned(Value::Real(*r)),
            SqlValue::Text(s) => ToSqlOutput::Owned(Value::Text(s.clone())),
            SqlValue::Blob(b) => ToSqlOutput::Owned(Value::Blob(b.clone())),
        })
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}
impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}
impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}
impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Real(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteResult {
    pub last_insert_rowid: i64,
    pub changes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VerifyIndicesResult {
    pub missing: Vec<String>,
    pub existing: Vec<String>,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Uninitialized = 0,
    Initializing = 1,
    Ready = 2,
    Closing = 3,
    Closed = 4,
}

impl From<u8> for State {
    fn from(value: u8) -> Self {
        match value {
            0 => State::Uninitialized,
            1 => State::Initializing,
            2 => State::Ready,
            3 => State::Closing,
            _ => State::Closed,
        }
    }
}

struct EngineInner {
    config: EngineConfig,
    conn: StdMutex<Option<Connection>>,
    state: AtomicU8,
    init_lock: tokio::sync::Mutex<()>,
    queue: WriteQueue,
}

/// The embedded SQL storage engine. Cloning shares the same connection,
/// queue, and lifecycle state (I1: at most one connection handle per engine
/// instance, regardless of how many `StorageEngine` handles point at it).
#[derive(Clone)]
pub struct StorageEngine {
    inner: Arc<EngineInner>,
}

impl StorageEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                config,
                conn: StdMutex::new(None),
                state: AtomicU8::new(State::Uninitialized as u8),
                init_lock: tokio::sync::Mutex::new(()),
                queue: WriteQueue::new(),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    fn state(&self) -> State {
        State::from(self.inner.state.load(Ordering::SeqCst))
    }

    pub fn is_ready(&self) -> bool {
        self.state() == State::Ready
    }

    pub fn is_closed(&self) -> bool {
        self.state() == State::Closed
    }

    /// Idempotent. Concurrent callers await the same in-flight attempt via
    /// `init_lock` rather than racing to open the file twice.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> EngineResult<()> {
        if self.is_ready() {
            return Ok(());
        }
        let _guard = self.inner.init_lock.lock().await;
        if self.is_ready() {
            return Ok(());
        }
        self.inner
            .state
            .store(State::Initializing as u8, Ordering::SeqCst);

        let inner = self.inner.clone();
        let outcome = tokio::task::spawn_blocking(move || inner.run_initialize()).await;
        match outcome {
            Ok(Ok(())) => {
                self.inner.state.store(State::Ready as u8, Ordering::SeqCst);
                debug!("engine initialized");
                Ok(())
            }
            Ok(Err(err)) => {
                self.inner
                    .state
                    .store(State::Uninitialized as u8, Ordering::SeqCst);
                error!(error = %err, "initialization failed");
                Err(err)
            }
            Err(join_err) => {
                self.inner
                    .state
                    .store(State::Uninitialized as u8, Ordering::SeqCst);
                Err(EngineError::Io(join_err.to_string()))
            }
        }
    }

    /// Polls `Ready` with a bounded busy-wait; does not itself trigger
    /// initialization (see `query`, which does).
    pub async fn wait_for_ready(&self, timeout_ms: u64) -> EngineResult<()> {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if self.is_ready() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(EngineError::timeout("wait_for_ready", timeout_ms));
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Concurrent reads. Auto-initializes on first use unless graceful
    /// degradation is on and the engine isn't ready yet, in which case this
    /// returns an empty result set without touching the connection.
    #[instrument(skip(self, params, mapper))]
    pub async fn query<T, F>(
        &self,
        sql: &str,
        params: Vec<SqlValue>,
        timeout_ms: Option<u64>,
        mapper: F,
    ) -> EngineResult<Vec<T>>
    where
        T: Send + 'static,
        F: Fn(&Row<'_>) -> rusqlite::Result<T> + Send + 'static,
    {
        if !self.is_ready() {
            if self.inner.config.graceful_degradation {
                warn!(operation = "query", "engine not ready; returning empty result set");
                return Ok(Vec::new());
            }
            self.initialize().await?;
        }

        let timeout_ms = timeout_ms.unwrap_or(self.inner.config.operation_timeout_ms);
        let inner = self.inner.clone();
        let sql = sql.to_string();
        with_timeout(
            async move {
                tokio::task::spawn_blocking(move || inner.run_query(&sql, &params, mapper))
                    .await
                    .map_err(|e| EngineError::Io(e.to_string()))?
            },
            timeout_ms,
            "query",
        )
        .await
    }

    /// Serialized writes, funneled through the write queue (C2).
    #[instrument(skip(self, params))]
    pub async fn execute(
        &self,
        sql: &str,
        params: Vec<SqlValue>,
        timeout_ms: Option<u64>,
    ) -> EngineResult<ExecuteResult> {
        if !self.is_ready() {
            if self.inner.config.graceful_degradation {
                warn!(operation = "execute", "engine not ready; skipping write");
                return Ok(ExecuteResult {
                    last_insert_rowid: 0,
                    changes: 0,
                });
            }
            return Err(EngineError::NotInitialized);
        }

        let op_timeout_ms = timeout_ms.unwrap_or(self.inner.config.operation_timeout_ms);
        let queue_timeout_ms = self.inner.config.queue_timeout_ms;
        let inner = self.inner.clone();
        let sql = sql.to_string();

        self.inner
            .queue
            .clone()
            .enqueue(queue_timeout_ms, move || async move {
                with_timeout(
                    async move {
                        let inner = inner.clone();
                        let sql = sql.clone();
                        tokio::task::spawn_blocking(move || inner.run_execute(&sql, &params))
                            .await
                            .map_err(|e| EngineError::Io(e.to_string()))?
                    },
                    op_timeout_ms,
                    "execute",
                )
                .await
            })
            .await
    }

    /// Runs `f` inside one `IMMEDIATE` write transaction. Immediate mode is
    /// mandatory: deferred transactions can upgrade mid-transaction and
    /// deadlock against another writer, which immediate mode avoids by
    /// taking the write lock up front.
    #[instrument(skip(self, f))]
    pub async fn transaction<F, T>(&self, timeout_ms: Option<u64>, f: F) -> EngineResult<T>
    where
        F: FnOnce(&rusqlite::Transaction<'_>) -> EngineResult<T> + Send + 'static,
        T: Send + 'static,
    {
        if !self.is_ready() {
            return Err(EngineError::NotInitialized);
        }

        let op_timeout_ms = timeout_ms.unwrap_or(self.inner.config.operation_timeout_ms);
        let queue_timeout_ms = self.inner.config.queue_timeout_ms;
        let inner = self.inner.clone();

        self.inner
            .queue
            .clone()
            .enqueue(queue_timeout_ms, move || async move {
                with_timeout(
                    async move {
                        let inner = inner.clone();
                        tokio::task::spawn_blocking(move || inner.run_transaction(f))
                            .await
                            .map_err(|e| EngineError::Io(e.to_string()))?
                    },
                    op_timeout_ms,
                    "transaction",
                )
                .await
            })
            .await
    }

    /// Like `transaction`, but takes `[{sql, params}]` pairs run under one
    /// immediate transaction via the statement cache. An empty batch never
    /// touches the queue.
    #[instrument(skip(self, statements))]
    pub async fn batch(
        &self,
        statements: Vec<(String, Vec<SqlValue>)>,
        timeout_ms: Option<u64>,
    ) -> EngineResult<()> {
        if statements.is_empty() {
            return Ok(());
        }
        self.transaction(timeout_ms, move |tx| {
            for (sql, params) in &statements {
                let param_refs: Vec<&dyn ToSql> =
                    params.iter().map(|p| p as &dyn ToSql).collect();
                let mut stmt = tx.prepare_cached(sql)?;
                stmt.execute(param_refs.as_slice())?;
            }
            Ok(())
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn verify_indices(&self) -> EngineResult<VerifyIndicesResult> {
        if !self.is_ready() {
            self.initialize().await?;
        }
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.run_verify_indices())
            .await
            .map_err(|e| EngineError::Io(e.to_string()))?
    }

    /// Aborts pending queue items, checkpoints WAL (best-effort), clears the
    /// statement cache, and closes the connection. Safe to call more than
    /// once.
    #[instrument(skip(self))]
    pub async fn close(&self) -> EngineResult<()> {
        if self.is_closed() {
            return Ok(());
        }
        self.inner
            .state
            .store(State::Closing as u8, Ordering::SeqCst);
        self.inner.queue.clear().await;

        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.run_close())
            .await
            .map_err(|e| EngineError::Io(e.to_string()))?;

        self.inner
            .state
            .store(State::Closed as u8, Ordering::SeqCst);
        Ok(())
    }

    /// True iff the connection is present and a trivial read succeeds.
    pub async fn check_health(&self) -> bool {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.run_check_health())
            .await
            .unwrap_or(false)
    }

    /// Close (best-effort), then re-initialize. Callers must re-prepare any
    /// statements they held externally — the cache is empty after this.
    #[instrument(skip(self))]
    pub async fn reconnect(&self) -> EngineResult<()> {
        if let Err(err) = self.close().await {
            warn!(error = %err, "best-effort close before reconnect failed");
        }
        self.inner
            .state
            .store(State::Uninitialized as u8, Ordering::SeqCst);
        self.initialize().await
    }

    /// Clears `sessions`, `tab_groups`, and `schema_version` only. See
    /// DESIGN.md for why this list is narrower than `truncate_all`.
    #[instrument(skip(self))]
    pub async fn reset(&self) -> EngineResult<()> {
        self.clear_tables(schema::RESET_TABLES).await
    }

    /// Clears every table the baseline schema defines, `schema_version`
    /// included.
    #[instrument(skip(self))]
    pub async fn truncate_all(&self) -> EngineResult<()> {
        self.clear_tables(schema::TRUNCATE_ALL_TABLES).await
    }

    async fn clear_tables(&self, tables: &'static [&'static str]) -> EngineResult<()> {
        self.transaction(None, move |tx| {
            for table in tables {
                tx.execute(&format!("DELETE FROM {table}"), [])?;
            }
            Ok(())
        })
        .await
    }
}

impl EngineInner {
    fn run_initialize(&self) -> EngineResult<()> {
        if let Some(parent) = self.config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = open_connection(&self.config.path)?;
        apply_pragmas(&conn, &self.config)?;
        create_baseline_schema(&conn)?;
        cache::configure(&conn);

        let mut guard = self.conn.lock().unwrap();
        *guard = Some(conn);
        Ok(())
    }

    fn run_query<T>(
        &self,
        sql: &str,
        params: &[SqlValue],
        mapper: impl Fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> EngineResult<Vec<T>> {
        let guard = self.conn.lock().unwrap();
        let conn = guard.as_ref().ok_or(EngineError::NotInitialized)?;
        let mut stmt = conn.prepare_cached(sql)?;
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
        let rows = stmt.query_map(param_refs.as_slice(), mapper)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn run_execute(&self, sql: &str, params: &[SqlValue]) -> EngineResult<ExecuteResult> {
        let guard = self.conn.lock().unwrap();
        let conn = guard.as_ref().ok_or(EngineError::NotInitialized)?;
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
        let mut stmt = conn.prepare_cached(sql)?;
        let changes = stmt.execute(param_refs.as_slice())?;
        Ok(ExecuteResult {
            last_insert_rowid: conn.last_insert_rowid(),
            changes,
        })
    }

    fn run_transaction<F, T>(&self, f: F) -> EngineResult<T>
    where
        F: FnOnce(&rusqlite::Transaction<'_>) -> EngineResult<T>,
    {
        let mut guard = self.conn.lock().unwrap();
        let conn = guard.as_mut().ok_or(EngineError::NotInitialized)?;
        let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        let result = f(&tx);
        match result {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                // tx drops here without commit, which rolls back.
                Err(err)
            }
        }
    }

    fn run_verify_indices(&self) -> EngineResult<VerifyIndicesResult> {
        let guard = self.conn.lock().unwrap();
        let conn = guard.as_ref().ok_or(EngineError::NotInitialized)?;
        let mut result = VerifyIndicesResult::default();
        for (name, _ddl) in schema::BASELINE_INDICES {
            let exists: bool = conn
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1)",
                    [name],
                    |row| row.get(0),
                )
                .unwrap_or(false);
            if exists {
                result.existing.push((*name).to_string());
            } else {
                result.missing.push((*name).to_string());
            }
        }
        Ok(result)
    }

    fn run_close(&self) {
        let mut guard = self.conn.lock().unwrap();
        if let Some(conn) = guard.as_ref() {
            if self.config.enable_wal {
                if let Err(err) =
                    conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
                {
                    warn!(error = %err, "wal checkpoint before close failed");
                }
            }
            cache::flush(conn);
        }
        *guard = None; // dropping the Connection closes it
    }

    fn run_check_health(&self) -> bool {
        let guard = self.conn.lock().unwrap();
        match guard.as_ref() {
            Some(conn) => conn
                .query_row("SELECT 1 FROM sqlite_master LIMIT 1", [], |_| Ok(()))
                .is_ok(),
            None => false,
        }
    }
}

fn open_connection(path: &Path) -> EngineResult<Connection> {
    Connection::open(path).map_err(EngineError::from)
}

fn apply_pragmas(conn: &Connection, config: &EngineConfig) -> EngineResult<()> {
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    if config.enable_wal {
        conn.pragma_update(None, "journal_mode", "WAL")?;
    }
    conn.pragma_update(None, "cache_size", config.cache_size_pages)?;
    conn.pragma_update(None, "page_size", config.page_size)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(())
}

fn create_baseline_schema(conn: &Connection) -> EngineResult<()> {
    for statement in schema::BASELINE_TABLES {
        conn.execute(statement, [])?;
    }
    for (_name, ddl) in schema::BASELINE_INDICES {
        conn.execute(ddl, [])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use tempfile::tempdir;

    fn test_engine(dir: &tempfile::TempDir) -> StorageEngine {
        let path = dir.path().join("test.db");
        StorageEngine::new(EngineConfig::test_mode(path))
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let dir = tempdir().unwrap();
        let engine = test_engine(&dir);
        engine.initialize().await.unwrap();
        engine.initialize().await.unwrap();
        assert!(engine.is_ready());
    }

    #[tokio::test]
    async fn test_happy_read_after_write() {
        // S1
        let dir = tempdir().unwrap();
        let engine = test_engine(&dir);
        engine.initialize().await.unwrap();
        let result = engine
            .execute(
                "INSERT INTO sessions(tabs, timestamp, version) VALUES (?1, ?2, ?3)",
                vec!["t".into(), 42i64.into(), "1.0".into()],
                None,
            )
            .await
            .unwrap();
        assert_eq!(result.changes, 1);

        let rows: Vec<i64> = engine
            .query(
                "SELECT timestamp FROM sessions WHERE tabs = ?1",
                vec!["t".into()],
                None,
                |row| row.get(0),
            )
            .await
            .unwrap();
        assert_eq!(rows, vec![42]);
    }

    #[tokio::test]
    async fn test_graceful_read_before_initialize_returns_empty() {
        // S3
        let dir = tempdir().unwrap();
        let mut config = EngineConfig::test_mode(dir.path().join("test.db"));
        config.graceful_degradation = true;
        let engine = StorageEngine::new(config);
        let rows: Vec<i64> = engine
            .query("SELECT 1", vec![], None, |row| row.get(0))
            .await
            .unwrap();
        assert!(rows.is_empty());
        assert!(!engine.is_ready());
    }

    #[tokio::test]
    async fn test_execute_before_initialize_without_degradation_fails() {
        let dir = tempdir().unwrap();
        let engine = test_engine(&dir);
        let result = engine
            .execute("INSERT INTO sessions(tabs,timestamp,version) VALUES ('x',1,'1.0')", vec![], None)
            .await;
        assert!(matches!(result, Err(EngineError::NotInitialized)));
    }

    #[tokio::test]
    async fn test_verify_indices_reports_none_missing_after_init() {
        // P10
        let dir = tempdir().unwrap();
        let engine = test_engine(&dir);
        engine.initialize().await.unwrap();
        let result = engine.verify_indices().await.unwrap();
        assert!(result.missing.is_empty());
        assert!(result.existing.contains(&"idx_sessions_timestamp".to_string()));
    }

    #[tokio::test]
    async fn test_syntax_error_leaves_connection_healthy() {
        // P5
        let dir = tempdir().unwrap();
        let engine = test_engine(&dir);
        engine.initialize().await.unwrap();
        let result = engine.execute("NOT VALID SQL", vec![], None).await;
        assert!(matches!(result, Err(EngineError::Sql(_))));
        assert!(engine.check_health().await);
    }

    #[tokio::test]
    async fn test_reconnect_preserves_data_and_empties_cache() {
        // S7
        let dir = tempdir().unwrap();
        let engine = test_engine(&dir);
        engine.initialize().await.unwrap();
        engine
            .execute("CREATE TABLE x(v TEXT)", vec![], None)
            .await
            .unwrap();
        engine
            .execute("INSERT INTO x(v) VALUES (?1)", vec!["hello".into()], None)
            .await
            .unwrap();

        engine.reconnect().await.unwrap();

        let cache_len_after_reconnect = {
            let guard = engine.inner.conn.lock().unwrap();
            cache::len(guard.as_ref().unwrap())
        };
        assert_eq!(cache_len_after_reconnect, 0);

        let rows: Vec<String> = engine
            .query("SELECT v FROM x", vec![], None, |row| row.get(0))
            .await
            .unwrap();
        assert_eq!(rows, vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_reset_clears_only_documented_tables() {
        let dir = tempdir().unwrap();
        let engine = test_engine(&dir);
        engine.initialize().await.unwrap();
        engine
            .execute(
                "INSERT INTO sessions(tabs,timestamp,version) VALUES ('t',1,'1.0')",
                vec![],
                None,
            )
            .await
            .unwrap();
        engine
            .execute(
                "INSERT INTO bookmarks(id,url,title,createdAt,updatedAt) VALUES ('b','u','t',1,1)",
                vec![],
                None,
            )
            .await
            .unwrap();

        engine.reset().await.unwrap();

        let sessions: Vec<i64> = engine
            .query("SELECT COUNT(*) FROM sessions", vec![], None, |row| row.get(0))
            .await
            .unwrap();
        let bookmarks: Vec<i64> = engine
            .query("SELECT COUNT(*) FROM bookmarks", vec![], None, |row| row.get(0))
            .await
            .unwrap();
        assert_eq!(sessions, vec![0]);
        assert_eq!(bookmarks, vec![1]);
    }

    #[tokio::test]
    async fn test_truncate_all_clears_every_table() {
        let dir = tempdir().unwrap();
        let engine = test_engine(&dir);
        engine.initialize().await.unwrap();
        engine
            .execute(
                "INSERT INTO bookmarks(id,url,title,createdAt,updatedAt) VALUES ('b','u','t',1,1)",
                vec![],
                None,
            )
            .await
            .unwrap();

        engine.truncate_all().await.unwrap();

        let bookmarks: Vec<i64> = engine
            .query("SELECT COUNT(*) FROM bookmarks", vec![], None, |row| row.get(0))
            .await
            .unwrap();
        assert_eq!(bookmarks, vec![0]);
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_no_op() {
        let dir = tempdir().unwrap();
        let engine = test_engine(&dir);
        engine.initialize().await.unwrap();
        engine.batch(vec![], None).await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_writes_complete_in_enqueue_order() {
        // S2
        let dir = tempdir().unwrap();
        let engine = test_engine(&dir);
        engine.initialize().await.unwrap();

        let mut handles = Vec::new();
        for i in 0..10u32 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine
                    .execute(
                        "INSERT INTO sessions(tabs,timestamp,version) VALUES (?1,?2,?3)",
                        vec![format!("t-{i}").into(), (i as i64 + 1).into(), "1.0".into()],
                        None,
                    )
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let tabs: Vec<String> = engine
            .query("SELECT tabs FROM sessions ORDER BY id", vec![], None, |row| row.get(0))
            .await
            .unwrap();
        let expected: Vec<String> = (0..10).map(|i| format!("t-{i}")).collect();
        assert_eq!(tabs, expected);
    }
}
