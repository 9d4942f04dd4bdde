//! CLI module — command-line argument parsing and subcommand handlers.
//!
//! Exposes the engine's consumer contract directly: `init`, `query`,
//! `execute`, `migrate`, `verify-indices`, `health`, `reset`, `truncate-all`.
//! This is the crate's only "application" surface — no UI, no IPC, those are
//! external collaborators.

use clap::{Parser, Subcommand};

use crate::config::EngineConfig;
use crate::engine::{SqlValue, StorageEngine};
use crate::migrations::MigrationManager;

#[derive(Parser)]
#[command(name = "browserstore")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Embedded SQL storage engine", long_about = None)]
pub struct Cli {
    /// Path to the SQLite database file. Defaults to the configured path.
    #[arg(long, global = true)]
    pub db: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database file and baseline schema if missing.
    Init,

    /// Run a read-only query and print rows as JSON.
    Query {
        sql: String,
    },

    /// Run a write statement and print `{last_insert_rowid, changes}`.
    Execute {
        sql: String,
    },

    /// Apply any pending migrations.
    Migrate,

    /// Report missing vs. existing required indices.
    VerifyIndices,

    /// Print whether the connection is healthy.
    Health,

    /// Clear `sessions`, `tab_groups`, and `schema_version`.
    Reset,

    /// Clear every table the baseline schema defines.
    TruncateAll,
}

/// Builds an `EngineConfig` honoring `--db`, `BROWSERSTORE_*` env vars, and
/// the on-disk config file, in that order of increasing precedence loss
/// (flag wins over env, env wins over file).
fn config_from_cli(cli: &Cli) -> EngineConfig {
    let mut config = EngineConfig::from_env();
    if let Some(db) = &cli.db {
        config.path = db.into();
    }
    config
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = config_from_cli(&cli);
    let engine = StorageEngine::new(config);

    match cli.command {
        Commands::Init => {
            engine.initialize().await?;
            println!("initialized {}", engine.config().path.display());
        }
        Commands::Query { sql } => {
            engine.initialize().await?;
            let rows = engine
                .query(&sql, Vec::<SqlValue>::new(), None, row_to_json)
                .await?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Commands::Execute { sql } => {
            engine.initialize().await?;
            let result = engine.execute(&sql, Vec::new(), None).await?;
            println!(
                "{{\"last_insert_rowid\": {}, \"changes\": {}}}",
                result.last_insert_rowid, result.changes
            );
        }
        Commands::Migrate => {
            engine.initialize().await?;
            let manager = MigrationManager::new();
            let outcome = manager.migrate(&engine).await?;
            match outcome.failed {
                Some(failed) => {
                    println!("migration {} ({}) failed; rolled back", failed.version, failed.name);
                }
                None => println!("applied {} migration(s)", outcome.applied),
            }
        }
        Commands::VerifyIndices => {
            engine.initialize().await?;
            let result = engine.verify_indices().await?;
            println!("existing: {:?}", result.existing);
            println!("missing: {:?}", result.missing);
        }
        Commands::Health => {
            engine.initialize().await?;
            println!("healthy = {}", engine.check_health().await);
        }
        Commands::Reset => {
            engine.initialize().await?;
            engine.reset().await?;
            println!("reset sessions, tab_groups, schema_version");
        }
        Commands::TruncateAll => {
            engine.initialize().await?;
            engine.truncate_all().await?;
            println!("truncated all tables");
        }
    }

    engine.close().await?;
    Ok(())
}

/// Decodes an arbitrary row into a JSON object keyed by column name. Ad-hoc
/// query results have no static shape, so this is the CLI's own decoder;
/// callers embedding the engine as a library are free to pick their own.
fn row_to_json(row: &rusqlite::Row<'_>) -> rusqlite::Result<serde_json::Value> {
    use serde_json::{Map, Value};
    let mut map = Map::new();
    for i in 0..row.as_ref().column_count() {
        let name = row.as_ref().column_name(i)?.to_string();
        let value: rusqlite::types::Value = row.get(i)?;
        let json_value = match value {
            rusqlite::types::Value::Null => Value::Null,
            rusqlite::types::Value::Integer(n) => Value::from(n),
            rusqlite::types::Value::Real(f) => Value::from(f),
            rusqlite::types::Value::Text(s) => Value::from(s),
            rusqlite::types::Value::Blob(b) => Value::from(b),
        };
        map.insert(name, json_value);
    }
    Ok(Value::Object(map))
}
