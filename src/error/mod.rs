mod ext;
mod impls;

pub use self::ext::ErrorExt;

use error_stack::{Context, Report};
use thiserror::Error;
use tracing_error::SpanTrace;

pub type Result<T> = std::result::Result<T, Error>;

/// What went wrong from the point of view of the caller.
///
/// The displayed message is what gets sent back over the wire,
/// so it must never contain storage details.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorCategory {
  #[error("{0}")]
  InvalidArgument(String),
  #[error("User not found")]
  NotFound,
  #[error("Internal error occurred")]
  Internal,
  #[error("Service unavailable")]
  Unavailable,
  #[error("Request cancelled")]
  Cancelled,
}

pub struct Error {
  report: Report<ErrorCategory>,
  trace: SpanTrace,
}

impl Error {
  #[must_use]
  #[track_caller]
  pub fn new(category: ErrorCategory) -> Self {
    Self { report: Report::new(category), trace: SpanTrace::capture() }
  }

  #[must_use]
  #[track_caller]
  pub fn from_context(category: ErrorCategory, context: impl Context) -> Self {
    Self {
      report: Report::new(context).change_context(category),
      trace: SpanTrace::capture(),
    }
  }

  #[must_use]
  #[track_caller]
  pub fn from_report(
    category: ErrorCategory,
    report: Report<impl Context>,
  ) -> Self {
    Self { report: report.change_context(category), trace: SpanTrace::capture() }
  }

  #[must_use]
  #[track_caller]
  pub fn invalid_argument(message: impl Into<String>) -> Self {
    Self::new(ErrorCategory::InvalidArgument(message.into()))
  }

  #[must_use]
  #[track_caller]
  pub fn internal(context: impl Context) -> Self {
    Self::from_context(ErrorCategory::Internal, context)
  }
}

impl Error {
  #[must_use]
  pub fn category(&self) -> &ErrorCategory {
    self.report.current_context()
  }

  #[must_use]
  #[track_caller]
  pub fn attach_printable<A>(mut self, attachment: A) -> Self
  where
    A: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
  {
    self.report = self.report.attach_printable(attachment);
    self
  }

  /// Whether the error was caused by malformed input.
  #[must_use]
  pub fn is_invalid_argument(&self) -> bool {
    matches!(self.category(), ErrorCategory::InvalidArgument(..))
  }

  #[must_use]
  pub fn downcast_ref<F: Context>(&self) -> Option<&F> {
    self.report.downcast_ref::<F>()
  }

  #[must_use]
  pub fn into_report(self) -> Report<ErrorCategory> {
    self.report
  }
}

impl std::fmt::Debug for Error {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Error")
      .field("category", self.category())
      .field("report", &self.report)
      .field("trace", &self.trace)
      .finish()
  }
}

impl std::fmt::Display for Error {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    self.category().fmt(f)?;
    writeln!(f, ": {:?}", self.report)?;
    std::fmt::Display::fmt(&self.trace, f)
  }
}

// This is for types that wrapped with error_stack's Report type while
// it preserves the report data.
pub trait ReportIntoError: Context {
  fn category(&self) -> ErrorCategory;
}
