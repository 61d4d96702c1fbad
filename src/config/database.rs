use serde::Deserialize;
use std::num::{NonZeroU32, NonZeroU64};
use validator::{Validate, ValidateError};

use crate::util::Sensitive;

/// Configuration for connecting to the Postgres database
/// that stores the directory.
#[derive(Debug, Deserialize)]
pub struct Database {
  /// Minimum idle database connections just to avoid wasting
  /// hardware resources from the database server.
  ///
  /// **Environment variables**:
  /// - `USERDIR_DB_MIN_IDLE`
  pub min_idle: Option<NonZeroU32>,
  /// Maximum amount of pool size that database can handle
  ///
  /// **Environment variables**:
  /// - `USERDIR_DB_POOL_SIZE`
  #[serde(default = "Database::default_pool_size")]
  pub pool_size: NonZeroU32,
  /// Connection URL connecting to the Postgres database.
  ///
  /// **Environment variables**:
  /// - `USERDIR_DB_URL` or `DATABASE_URL`
  pub url: Sensitive<String>,
  /// Tries TLS first and falls back to a plaintext connection
  /// when the server does not support it. Certificates are not
  /// verified either way.
  ///
  /// **Environment variables**:
  /// - `USERDIR_DB_PREFER_TLS`
  #[serde(default = "Database::default_prefer_tls")]
  pub prefer_tls: bool,
  /// How long this server can wait until its time limit where the
  /// database connection takes a while to acknowledge or
  /// successfully established.
  ///
  /// **Environment variables**:
  /// - `USERDIR_DB_TIMEOUT_SECS`
  #[serde(default = "Database::default_pool_timeout_secs")]
  pub timeout_secs: NonZeroU64,
}

impl Database {
  const DEFAULT_POOL_SIZE: u32 = 5;
  const DEFAULT_POOL_TIMEOUT_SECS: u64 = 5;

  // Required by serde
  const fn default_pool_size() -> NonZeroU32 {
    match NonZeroU32::new(Self::DEFAULT_POOL_SIZE) {
      Some(n) => n,
      None => panic!("DEFAULT_POOL_SIZE is accidentally set to 0"),
    }
  }

  const fn default_pool_timeout_secs() -> NonZeroU64 {
    match NonZeroU64::new(Self::DEFAULT_POOL_TIMEOUT_SECS) {
      Some(n) => n,
      None => panic!("DEFAULT_POOL_TIMEOUT_SECS is accidentally set to 0"),
    }
  }

  const fn default_prefer_tls() -> bool {
    true
  }
}

impl Validate for Database {
  fn validate(&self) -> Result<(), ValidateError> {
    let mut fields = ValidateError::field_builder();

    let mut url = ValidateError::msg_builder();
    if !validator::extras::validate_pg_url(self.url.as_str()) {
      url.insert("Invalid Postgres connection URL");
    }
    fields.insert("url", url.build());

    let mut min_idle = ValidateError::msg_builder();
    if let Some(value) = self.min_idle {
      if value > self.pool_size {
        min_idle.insert("Minimum idle connections exceed the pool size");
      }
    }
    fields.insert("min_idle", min_idle.build());

    fields.build().into_result()
  }
}
