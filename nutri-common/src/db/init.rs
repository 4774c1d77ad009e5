//! Database initialization
//!
//! Opens (creating on first use) the SQLite store, brings its schema to the
//! current version, and reports whether the contents still need to be loaded
//! from the source dataset.
//!
//! `open_store` itself is not a singleton. The composition root that owns the
//! store decides how many callers share one handle.

use crate::db::aggregates::AggregateQueries;
use crate::db::migrations::{ensure_schema, SchemaOutcome};
use crate::db::models::Metric;
use crate::db::preferences::PreferenceStore;
use crate::db::records::RecordStore;
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// DDL for the preferences table (added in schema v2)
pub const FOOD_PREFERENCES_TABLE_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS food_preferences (
        user_id TEXT PRIMARY KEY NOT NULL,
        fruits INTEGER NOT NULL DEFAULT 0,
        vegetables INTEGER NOT NULL DEFAULT 0,
        grains INTEGER NOT NULL DEFAULT 0,
        red_meat INTEGER NOT NULL DEFAULT 0,
        seafood INTEGER NOT NULL DEFAULT 0,
        poultry INTEGER NOT NULL DEFAULT 0,
        fish INTEGER NOT NULL DEFAULT 0,
        eggs INTEGER NOT NULL DEFAULT 0,
        nuts_seeds INTEGER NOT NULL DEFAULT 0,
        persona_id INTEGER NOT NULL DEFAULT 0,
        persona_name TEXT NOT NULL DEFAULT '',
        biggest_meal_time TEXT NOT NULL DEFAULT '',
        sleep_time TEXT NOT NULL DEFAULT '',
        wake_time TEXT NOT NULL DEFAULT ''
    )
"#;

/// DDL for the records table
///
/// Identity columns first, then one nullable REAL column per [`Metric`].
pub fn records_table_ddl() -> String {
    let mut columns = vec![
        "user_id TEXT PRIMARY KEY NOT NULL".to_string(),
        "phone_number TEXT NOT NULL".to_string(),
        "sex TEXT NOT NULL".to_string(),
        "password TEXT NOT NULL DEFAULT ''".to_string(),
    ];
    columns.extend(Metric::ALL.iter().map(|m| format!("{} REAL", m.column())));

    format!(
        "CREATE TABLE IF NOT EXISTS records (\n    {}\n)",
        columns.join(",\n    ")
    )
}

/// Create every table of the current schema version
pub(crate) async fn create_current_schema(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query(&records_table_ddl())
        .execute(&mut *conn)
        .await?;
    sqlx::query(FOOD_PREFERENCES_TABLE_DDL)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// How the store came into being on this open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenKind {
    /// No prior database (or an empty one); tables were just created
    Created,
    /// Existing database at (or migrated to) the current schema
    Existing,
    /// Existing database without a migration path; contents were discarded
    Recreated,
}

/// Handle to an opened NutriTrack database
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
    path: PathBuf,
    kind: OpenKind,
}

impl Store {
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn open_kind(&self) -> OpenKind {
        self.kind
    }

    /// True when the tables are empty because they were just (re)created
    pub fn needs_ingestion(&self) -> bool {
        matches!(self.kind, OpenKind::Created | OpenKind::Recreated)
    }

    pub fn records(&self) -> RecordStore {
        RecordStore::new(self.pool.clone())
    }

    pub fn preferences(&self) -> PreferenceStore {
        PreferenceStore::new(self.pool.clone())
    }

    pub fn aggregates(&self) -> AggregateQueries {
        AggregateQueries::new(self.pool.clone())
    }
}

/// Open the database at `db_path`, creating it if needed
///
/// Idempotent: opening an up-to-date store changes nothing on disk.
pub async fn open_store(db_path: &Path) -> Result<Store> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // WAL allows readers to keep working while an ingestion transaction is open
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    let kind = match ensure_schema(&pool).await? {
        SchemaOutcome::Created => OpenKind::Created,
        SchemaOutcome::Recreated { .. } => OpenKind::Recreated,
        SchemaOutcome::UpToDate | SchemaOutcome::Migrated { .. } => OpenKind::Existing,
    };

    Ok(Store {
        pool,
        path: db_path.to_path_buf(),
        kind,
    })
}
