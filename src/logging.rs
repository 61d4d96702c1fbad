use error_stack::{Result, ResultExt};
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_error::ErrorLayer;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Layer};

use crate::config::{Logging, LoggingStyle};

#[derive(Debug, Error)]
#[error("Failed to initialize tracing")]
pub struct TracingInitError;

pub fn init(config: &Logging) -> Result<(), TracingInitError> {
  let targets = config
    .targets
    .clone()
    .or_else(|| std::env::var("RUST_LOG").ok())
    .unwrap_or_default();

  let registry = tracing_subscriber::registry()
    .with(fmt_layer(config.style, false).with_filter(make_env_filter(&targets)))
    .with(ErrorLayer::default());

  tracing::subscriber::set_global_default(registry)
    .change_context(TracingInitError)
    .attach_printable("already initialized tracing")?;

  if config.targets.is_some() && std::env::var("RUST_LOG").is_ok() {
    tracing::warn!(
      "Both `RUST_LOG` and `USERDIR_LOGGING_TARGETS` are set, using the latter"
    );
  }

  Ok(())
}

/// Installs a subscriber that writes through the test harness.
/// Calling it more than once is harmless.
pub fn init_for_tests() {
  let targets = std::env::var("RUST_LOG").unwrap_or_default();
  let registry = tracing_subscriber::registry()
    .with(
      fmt_layer(LoggingStyle::Full, true).with_filter(make_env_filter(&targets)),
    )
    .with(ErrorLayer::default());

  tracing::subscriber::set_global_default(registry).ok();
}

fn fmt_layer<S>(
  style: LoggingStyle,
  test_writer: bool,
) -> Box<dyn Layer<S> + Send + Sync + 'static>
where
  S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
  let layer = tracing_subscriber::fmt::layer()
    .with_target(true)
    .with_writer(std::io::stderr);

  match (style, test_writer) {
    (LoggingStyle::Compact, false) => layer.compact().boxed(),
    (LoggingStyle::Full, false) => layer.boxed(),
    (LoggingStyle::Pretty, false) => layer.pretty().boxed(),
    (LoggingStyle::Compact, true) => layer.with_test_writer().compact().boxed(),
    (LoggingStyle::Full, true) => layer.with_test_writer().boxed(),
    (LoggingStyle::Pretty, true) => layer.with_test_writer().pretty().boxed(),
  }
}

fn make_env_filter(targets: &str) -> EnvFilter {
  let default_level = if cfg!(debug_assertions) {
    LevelFilter::DEBUG
  } else {
    LevelFilter::INFO
  };

  EnvFilter::builder()
    .with_default_directive(default_level.into())
    .parse_lossy(targets)
}
