//! Database schema versioning and migrations
//!
//! The schema version is tracked in the `schema_version` table, one row per
//! applied version. Migrations are an ordered list of `(from, to, ddl)` steps.
//! Opening a store walks the chain from the on-disk version to
//! [`CURRENT_SCHEMA_VERSION`].
//!
//! # Data-loss policy
//!
//! When no chain of migrations leads from the on-disk version to the current
//! one, the store is **destructively recreated**. Every table is dropped and
//! rebuilt empty at the current version, and the ingestion pipeline reloads
//! the dataset. This is intentional: all record data can be re-derived from
//! the source dataset. Preferences are lost.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations**. Add a new step instead.
//! 2. Steps are pure DDL. Data transformation belongs in ingestion.
//! 3. Each step runs in its own transaction together with its version bump.

use crate::db::init::{create_current_schema, FOOD_PREFERENCES_TABLE_DDL};
use crate::Result;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// One upgrade step between two schema versions
#[derive(Debug)]
pub struct Migration {
    pub from_version: i32,
    pub to_version: i32,
    pub description: &'static str,
    pub statements: &'static [&'static str],
}

/// All known migrations, in order
///
/// v1 holds the `records` table only.
pub const MIGRATIONS: &[Migration] = &[Migration {
    from_version: 1,
    to_version: 2,
    description: "Add food_preferences table",
    statements: &[FOOD_PREFERENCES_TABLE_DDL],
}];

/// What opening the schema did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaOutcome {
    /// No prior schema; tables created at the current version
    Created,
    /// Schema already at the current version
    UpToDate,
    /// Upgraded along the migration chain
    Migrated { from: i32, to: i32 },
    /// No migration path existed; all tables were dropped and recreated
    Recreated { found: i32 },
}

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    if !table_exists(pool, "schema_version").await? {
        return Ok(0);
    }

    let version: Option<i32> = sqlx::query_scalar(
        "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1"
    )
    .fetch_optional(pool)
    .await?;

    Ok(version.unwrap_or(0))
}

/// Record `version` as applied
async fn set_schema_version<'e, E>(executor: E, version: i32) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query("INSERT OR REPLACE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(executor)
        .await?;

    Ok(())
}

pub(crate) async fn table_exists(pool: &SqlitePool, table: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)"
    )
    .bind(table)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Ordered chain of migrations from `from` to `to`, if one exists
pub fn migration_path(from: i32, to: i32) -> Option<Vec<&'static Migration>> {
    let mut path = Vec::new();
    let mut version = from;

    while version != to {
        let step = MIGRATIONS.iter().find(|m| m.from_version == version)?;
        if step.to_version <= version {
            return None;
        }
        path.push(step);
        version = step.to_version;
    }

    Some(path)
}

/// Bring the schema to [`CURRENT_SCHEMA_VERSION`]
///
/// Creates, migrates or recreates as needed. See the module docs for the
/// data-loss policy.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<SchemaOutcome> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(SchemaOutcome::UpToDate);
    }

    if current_version == 0 && !table_exists(pool, "records").await? {
        let mut tx = pool.begin().await?;
        create_current_schema(&mut tx).await?;
        set_schema_version(&mut *tx, CURRENT_SCHEMA_VERSION).await?;
        tx.commit().await?;

        info!("Created database schema v{}", CURRENT_SCHEMA_VERSION);
        return Ok(SchemaOutcome::Created);
    }

    match migration_path(current_version, CURRENT_SCHEMA_VERSION) {
        Some(path) if current_version > 0 => {
            info!(
                "Running database migrations: v{} -> v{}",
                current_version, CURRENT_SCHEMA_VERSION
            );

            for step in path {
                let mut tx = pool.begin().await?;
                for statement in step.statements {
                    sqlx::query(statement).execute(&mut *tx).await?;
                }
                set_schema_version(&mut *tx, step.to_version).await?;
                tx.commit().await?;

                info!(
                    "✓ Migration v{} -> v{} completed: {}",
                    step.from_version, step.to_version, step.description
                );
            }

            Ok(SchemaOutcome::Migrated {
                from: current_version,
                to: CURRENT_SCHEMA_VERSION,
            })
        }
        _ => {
            warn!(
                "No migration path from schema v{} to v{}; dropping and recreating all tables",
                current_version, CURRENT_SCHEMA_VERSION
            );
            recreate_schema(pool).await?;
            Ok(SchemaOutcome::Recreated {
                found: current_version,
            })
        }
    }
}

/// Drop every table and rebuild the current schema
async fn recreate_schema(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin().await?;
    drop_all_tables(&mut tx).await?;
    create_current_schema(&mut tx).await?;
    set_schema_version(&mut *tx, CURRENT_SCHEMA_VERSION).await?;
    tx.commit().await?;

    warn!("Database recreated at schema v{}; previous contents discarded", CURRENT_SCHEMA_VERSION);
    Ok(())
}

async fn drop_all_tables(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query("DROP TABLE IF EXISTS records")
        .execute(&mut *conn)
        .await?;
    sqlx::query("DROP TABLE IF EXISTS food_preferences")
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM schema_version")
        .execute(&mut *conn)
        .await?;
    Ok(())
}
