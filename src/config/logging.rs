use serde::Deserialize;
use validator::{Validate, ValidateError};

#[derive(Debug, Default, Deserialize)]
pub struct Logging {
  /// There are three styles to choose:
  /// - `compact` - compacts logs but it is readable enough
  /// - `full` - default formatter from [`tracing_subscriber`].
  /// - `pretty` - makes logs pretty
  ///
  /// **Environment variables**:
  /// - `USERDIR_LOGGING_STYLE`
  #[serde(default)]
  pub style: LoggingStyle,

  /// Filters logging events with the use of directives. `RUST_LOG`
  /// is used instead when this is not set.
  ///
  /// https://docs.rs/tracing-subscriber/0.3.18/tracing_subscriber/filter/struct.EnvFilter.html
  ///
  /// **Environment variables**:
  /// - `USERDIR_LOGGING_TARGETS`
  pub targets: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingStyle {
  Compact,
  #[default]
  Full,
  Pretty,
}

impl Validate for Logging {
  fn validate(&self) -> Result<(), ValidateError> {
    let mut fields = ValidateError::field_builder();

    let mut targets = ValidateError::msg_builder();
    if let Some(directives) = &self.targets {
      if let Err(error) = tracing_subscriber::EnvFilter::try_new(directives) {
        targets.insert(format!("Invalid logging directives: {error}"));
      }
    }
    fields.insert("targets", targets.build());

    fields.build().into_result()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn should_validate_targets() {
    let logging = Logging {
      style: LoggingStyle::Compact,
      targets: Some("userdir=debug,sqlx=warn".into()),
    };
    assert!(logging.validate().is_ok());

    let logging = Logging {
      style: LoggingStyle::Compact,
      targets: Some("userdir=notalevel".into()),
    };
    assert!(logging.validate().is_err());
  }
}
