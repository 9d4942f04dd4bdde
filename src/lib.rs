//! Embedded SQL storage engine: a single-connection SQLite wrapper with a
//! serialized write queue, per-operation timeout/retry, automatic
//! reconnection, a statement-prepare cache, graceful degradation, and a
//! version-tracked schema migration manager.

pub mod cache;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod migrations;
pub mod queue;
pub mod retry;
pub mod schema;

pub use config::EngineConfig;
pub use engine::{ExecuteResult, SqlValue, StorageEngine, VerifyIndicesResult};
pub use error::{EngineError, EngineResult};
pub use migrations::{FailedMigration, MigrateOutcome, Migration, MigrationFn, MigrationManager};
pub use retry::RetryPolicy;
