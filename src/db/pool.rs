use error_stack::{Report, Result, ResultExt};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use std::borrow::Cow;
use std::fmt::Debug;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use super::{PoolConnection, SqlxErrorExt};
use crate::config;

/// A shared Postgres connection pool. Cloning it is cheap
/// and every clone hands out connections from the same pool.
#[derive(Clone)]
pub struct Pool {
  inner: sqlx::PgPool,
}

#[derive(Debug, Error)]
pub enum PoolError {
  #[error("Invalid connection url")]
  InvalidUrl,
  #[error("Unhealthy database pool")]
  UnhealthyPool,
  #[error("received a pool error")]
  Internal,
}

impl Pool {
  const APPLICATION_NAME: &'static str = "userdir";

  /// Connects to the database and waits until at least one
  /// connection can be established.
  #[tracing::instrument(skip_all, name = "db.connect_pool")]
  pub async fn connect(cfg: &config::Database) -> Result<Self, PoolError> {
    let mut pool_opts = PgPoolOptions::new()
      .acquire_timeout(Duration::from_secs(cfg.timeout_secs.get()))
      .max_connections(cfg.pool_size.get());

    if let Some(min_idle) = cfg.min_idle {
      pool_opts = pool_opts.min_connections(min_idle.get());
    }

    let connect_opts =
      PgConnectOptions::from_str(&connection_url(cfg.url.as_str()))
        .change_context(PoolError::InvalidUrl)?
        .application_name(Self::APPLICATION_NAME)
        .ssl_mode(ssl_mode(cfg.prefer_tls));

    let pool = Self { inner: pool_opts.connect_lazy_with(connect_opts) };
    pool.wait_until_healthy().await?;

    tracing::debug!(connections = pool.connections(), "Connected to database");
    Ok(pool)
  }
}

impl Pool {
  #[inline]
  #[must_use]
  pub fn connections(&self) -> u32 {
    self.inner.size()
  }

  /// It attempts to get an active database connection.
  #[tracing::instrument(name = "db.connect")]
  pub async fn get(&self) -> Result<PoolConnection, PoolError> {
    if let Some(inner) = self.inner.try_acquire() {
      Ok(inner)
    } else {
      self.inner.acquire().await.into_db_error()
    }
  }

  #[tracing::instrument]
  pub async fn wait_until_healthy(&self) -> Result<(), PoolError> {
    match self.inner.acquire().await {
      Ok(..) => Ok(()),
      Err(e) if e.as_database_error().is_none() => {
        Err(Report::new(e).change_context(PoolError::UnhealthyPool))
      },
      Err(err) => Err(Report::new(err).change_context(PoolError::Internal)),
    }
  }

  pub async fn close(&self) {
    self.inner.close().await;
  }
}

/// CockroachDB speaks the Postgres protocol but the driver only
/// knows the `postgres` schemes.
fn connection_url(url: &str) -> Cow<'_, str> {
  match url.strip_prefix("cockroachdb://") {
    Some(rest) => Cow::Owned(format!("postgres://{rest}")),
    None => Cow::Borrowed(url),
  }
}

fn ssl_mode(prefer_tls: bool) -> PgSslMode {
  if prefer_tls {
    PgSslMode::Prefer
  } else {
    PgSslMode::Allow
  }
}

impl From<sqlx::PgPool> for Pool {
  fn from(inner: sqlx::PgPool) -> Self {
    Self { inner }
  }
}

impl Debug for Pool {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    self.inner.fmt(f)
  }
}
