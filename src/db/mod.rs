use error_stack::{Report, Result};

use crate::error::{ErrorCategory, ReportIntoError};

pub mod migrations;
mod pool;

pub use self::migrations::MIGRATOR;
pub use self::pool::{Pool, PoolError};

pub type PoolConnection = sqlx::pool::PoolConnection<sqlx::Postgres>;
pub type Connection = sqlx::PgConnection;

impl ReportIntoError for PoolError {
  fn category(&self) -> ErrorCategory {
    match self {
      PoolError::UnhealthyPool => ErrorCategory::Unavailable,
      PoolError::InvalidUrl | PoolError::Internal => ErrorCategory::Internal,
    }
  }
}

/// Converts from a generic [sqlx] result into a [database compatible error](PoolError).
pub trait SqlxErrorExt<T> {
  fn into_db_error(self) -> Result<T, PoolError>;
}

impl<T> SqlxErrorExt<T> for std::result::Result<T, sqlx::Error> {
  fn into_db_error(self) -> Result<T, PoolError> {
    self.map_err(|e| match &e {
      sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
        Report::new(e).change_context(PoolError::UnhealthyPool)
      },
      _ => Report::new(e).change_context(PoolError::Internal),
    })
  }
}
