//! Database schema migrations.
//!
//! Each schema version `NN` has two SQL files in this directory:
//! - `migration_NN_up.sql` moves the schema from version `NN-1` to `NN`
//! - `migration_NN_down.sql` moves the schema from version `NN` back to `NN-1`
//!
//! The current version is kept in the single-row `schema_version` table.

use anyhow::{bail, Context};
use sqlx::{Executor, SqlitePool};
use tracing::debug;

use crate::Result;

/// The schema version that this build of the program expects.
pub(crate) const CURRENT_VERSION: i32 = 1;

struct Migration {
    version: i32,
    up_sql: &'static str,
    down_sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    up_sql: include_str!("migration_01_up.sql"),
    down_sql: include_str!("migration_01_down.sql"),
}];

/// One SQL script to run and the version the schema is at afterwards.
struct Step {
    sql: &'static str,
    version_after: i32,
}

/// Moves the schema from `current_ver` to `target_ver`, running up or down migrations one
/// version at a time. Each step runs in its own transaction together with the `schema_version`
/// update. All required migrations are looked up before any of them run.
pub(crate) async fn run(pool: &SqlitePool, current_ver: i32, target_ver: i32) -> Result<()> {
    if current_ver == target_ver {
        debug!("Database already at schema version {target_ver}");
        return Ok(());
    }

    for step in plan(current_ver, target_ver)? {
        debug!("Migrating schema to version {:02}", step.version_after);
        run_step(pool, &step).await?;
    }

    debug!("Migration complete, schema now at version {target_ver}");
    Ok(())
}

/// Reads the schema version of an existing database.
pub(crate) async fn schema_version(pool: &SqlitePool) -> Result<i32> {
    let row: (i32,) = sqlx::query_as("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await
        .context("Failed to read the schema version")?;
    Ok(row.0)
}

/// Creates the `schema_version` table of a brand new database at version 0.
pub(crate) async fn bootstrap(pool: &SqlitePool) -> Result<()> {
    sqlx::query("CREATE TABLE schema_version (version INTEGER NOT NULL)")
        .execute(pool)
        .await
        .context("Failed to create schema_version table")?;
    sqlx::query("INSERT INTO schema_version (version) VALUES (0)")
        .execute(pool)
        .await
        .context("Failed to insert initial schema version")?;
    Ok(())
}

fn plan(current_ver: i32, target_ver: i32) -> Result<Vec<Step>> {
    let find = |version: i32| {
        MIGRATIONS.iter().find(|m| m.version == version).with_context(|| {
            format!(
                "Migration {version} is missing but required to migrate from version \
                {current_ver} to {target_ver}"
            )
        })
    };

    let mut steps = Vec::new();
    if current_ver < target_ver {
        for version in (current_ver + 1)..=target_ver {
            steps.push(Step {
                sql: find(version)?.up_sql,
                version_after: version,
            });
        }
    } else {
        for version in ((target_ver + 1)..=current_ver).rev() {
            steps.push(Step {
                sql: find(version)?.down_sql,
                version_after: version - 1,
            });
        }
    }
    if steps.is_empty() {
        bail!("No migrations between version {current_ver} and {target_ver}");
    }
    Ok(steps)
}

async fn run_step(pool: &SqlitePool, step: &Step) -> Result<()> {
    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin migration transaction")?;

    tx.execute(step.sql)
        .await
        .context("Failed to execute migration SQL")?;

    sqlx::query("UPDATE schema_version SET version = ?")
        .bind(step.version_after)
        .execute(&mut *tx)
        .await
        .context("Failed to update schema_version")?;

    tx.commit()
        .await
        .context("Failed to commit migration transaction")?;
    Ok(())
}
