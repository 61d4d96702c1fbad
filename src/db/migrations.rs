use error_stack::{Report, Result, ResultExt};
use sqlx::migrate::{Migrate, Migrator};
use thiserror::Error;
use tokio::time::Instant;
use tracing::info;

use super::Connection;

/// Embedded migrations of the `users` schema.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Schema version this build reads and writes.
pub const SCHEMA_VERSION: i64 = 1;

#[derive(Debug, Error)]
#[error("Failed to perform database migrations")]
pub struct MigrationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
  pub applied: Vec<i64>,
  pub pending: Vec<i64>,
  /// Version of a migration that failed halfway, if any.
  pub dirty: Option<i64>,
}

impl MigrationStatus {
  #[must_use]
  pub fn current_version(&self) -> i64 {
    self.applied.iter().copied().max().unwrap_or_default()
  }
}

/// Brings the schema up to [`SCHEMA_VERSION`].
///
/// It fails if a migration is dirty, if an applied migration was
/// modified or if the database carries a version this build does
/// not know about.
#[tracing::instrument(skip_all, name = "migrations.run_pending")]
pub async fn run_pending(conn: &mut Connection) -> Result<(), MigrationError> {
  let now = Instant::now();
  info!("Performing database migrations... (this may take a while)");

  MIGRATOR.run(&mut *conn).await.change_context(MigrationError)?;

  let status = status(conn).await?;
  if status.current_version() != SCHEMA_VERSION {
    return Err(
      Report::new(MigrationError).attach_printable(format!(
        "expected schema version {SCHEMA_VERSION}, found {}",
        status.current_version()
      )),
    );
  }

  let elapsed = now.elapsed();
  info!("Successfully performed database migrations! took {elapsed:.2?}");

  Ok(())
}

/// Reads the migration history without writing to the database. A
/// database that was never migrated has every migration pending.
#[tracing::instrument(skip_all, name = "migrations.status")]
pub async fn status(conn: &mut Connection) -> Result<MigrationStatus, MigrationError> {
  if !migrations_table_exists(conn).await? {
    return Ok(MigrationStatus {
      applied: Vec::new(),
      pending: known_versions().collect(),
      dirty: None,
    });
  }

  let dirty = conn.dirty_version().await.change_context(MigrationError)?;
  let applied = conn
    .list_applied_migrations()
    .await
    .change_context(MigrationError)?
    .into_iter()
    .map(|v| v.version)
    .collect::<Vec<_>>();

  let pending = known_versions()
    .filter(|v| !applied.contains(v))
    .collect::<Vec<_>>();

  Ok(MigrationStatus { applied, pending, dirty })
}

/// Reverts every applied migration, dropping the `users` table.
#[tracing::instrument(skip_all, name = "migrations.undo")]
pub async fn undo(conn: &mut Connection) -> Result<(), MigrationError> {
  let now = Instant::now();
  info!("Reverting database migrations...");

  MIGRATOR.undo(&mut *conn, 0).await.change_context(MigrationError)?;

  let elapsed = now.elapsed();
  info!("Successfully reverted database migrations! took {elapsed:.2?}");

  Ok(())
}

async fn migrations_table_exists(
  conn: &mut Connection,
) -> Result<bool, MigrationError> {
  sqlx::query_scalar("SELECT to_regclass('_sqlx_migrations') IS NOT NULL")
    .fetch_one(&mut *conn)
    .await
    .change_context(MigrationError)
    .attach_printable("could not look up the migrations table")
}

fn known_versions() -> impl Iterator<Item = i64> {
  MIGRATOR
    .iter()
    .filter(|m| !m.migration_type.is_down_migration())
    .map(|m| m.version)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn latest_migration_matches_schema_version() {
    assert_eq!(known_versions().max(), Some(SCHEMA_VERSION));
  }

  #[test]
  fn every_migration_is_reversible() {
    let ups = known_versions().count();
    let downs = MIGRATOR
      .iter()
      .filter(|m| m.migration_type.is_down_migration())
      .count();

    assert_eq!(ups, downs);
  }

  #[test]
  fn current_version_of_empty_history_is_zero() {
    let status =
      MigrationStatus { applied: Vec::new(), pending: vec![1], dirty: None };
    assert_eq!(status.current_version(), 0);
  }
}
