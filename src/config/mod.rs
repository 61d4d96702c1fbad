use error_stack::{Report, Result, ResultExt};
use serde::Deserialize;
use thiserror::Error;
use validator::{Validate, ValidateError};

use crate::util::figment::FigmentErrorAttachable;
use crate::util::validator::IntoValidatorReport;

mod database;
mod grpc;
mod logging;

pub use database::Database;
pub use grpc::Grpc;
pub use logging::{Logging, LoggingStyle};

#[derive(Debug, Error)]
#[error("Failed to load configuration")]
pub struct ParseError;

/// Everything the service needs to start, loaded once
/// and passed down by reference.
#[derive(Debug, Deserialize)]
pub struct Server {
  pub db: Database,
  #[serde(default)]
  pub grpc: Grpc,
  #[serde(default)]
  pub logging: Logging,
}

impl Server {
  pub fn load() -> Result<Self, ParseError> {
    dotenvy::dotenv().ok();
    Self::from_figment(&Self::figment())
  }

  pub fn from_figment(figment: &figment::Figment) -> Result<Self, ParseError> {
    let config = figment
      .extract::<Self>()
      .map_err(|e| Report::new(ParseError).attach_figment_error(e))?;

    config
      .validate()
      .into_validator_report()
      .change_context(ParseError)?;

    Ok(config)
  }
}

impl Server {
  const DEFAULT_CONFIG_FILE: &'static str = "userdir.toml";

  /// Creates a default [`Figment`](figment::Figment) object to load
  /// server configuration from `userdir.toml` and the environment.
  pub(crate) fn figment() -> figment::Figment {
    use figment::{
      providers::{Env, Format, Toml},
      Figment,
    };

    Figment::new()
      .merge(Toml::file(Self::DEFAULT_CONFIG_FILE))
      // Fields with underscores cannot be split on `_`, so
      // they are mapped by hand.
      .merge(Env::prefixed("USERDIR_").map(|v| match v.as_str() {
        "DB_POOL_SIZE" => "db.pool_size".into(),
        "DB_MIN_IDLE" => "db.min_idle".into(),
        "DB_TIMEOUT_SECS" => "db.timeout_secs".into(),
        "DB_PREFER_TLS" => "db.prefer_tls".into(),
        _ => v.as_str().replace('_', ".").into(),
      }))
      // Environment variable aliases
      .merge(Env::raw().only(&["DATABASE_URL"]).map(|_| "db.url".into()))
  }
}

impl Validate for Server {
  fn validate(&self) -> std::result::Result<(), ValidateError> {
    let mut fields = ValidateError::field_builder();
    fields.insert_nested("db", &self.db);
    fields.insert_nested("logging", &self.logging);
    fields.build().into_result()
  }
}
