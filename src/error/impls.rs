use error_stack::Report;
use tonic::{Code, Status};

use super::{Error, ErrorCategory, ReportIntoError};

impl<T: ReportIntoError> From<Report<T>> for Error {
  #[track_caller]
  fn from(value: Report<T>) -> Self {
    let category = value.current_context().category();
    Error::from_report(category, value)
  }
}

impl From<Error> for Status {
  fn from(value: Error) -> Self {
    value.into_rpc()
  }
}

impl From<Status> for Error {
  #[track_caller]
  fn from(value: Status) -> Self {
    Error::from_rpc(value)
  }
}

#[derive(Debug, thiserror::Error)]
#[error("received {code:?} status from the server: {message}")]
struct RemoteStatus {
  code: Code,
  message: String,
}

impl Error {
  /// Converts this error into a gRPC status.
  ///
  /// Internal errors are logged here since the caller
  /// only gets to see the category message.
  #[must_use]
  pub fn into_rpc(&self) -> Status {
    let code = match self.category() {
      ErrorCategory::InvalidArgument(..) => Code::InvalidArgument,
      ErrorCategory::NotFound => Code::NotFound,
      ErrorCategory::Internal => Code::Internal,
      ErrorCategory::Unavailable => Code::Unavailable,
      ErrorCategory::Cancelled => Code::Cancelled,
    };

    if matches!(code, Code::Internal | Code::Unavailable) {
      tracing::error!(error = %self, "Caught internal error");
    }

    Status::new(code, self.category().to_string())
  }

  #[must_use]
  #[track_caller]
  pub fn from_rpc(status: Status) -> Self {
    let category = match status.code() {
      Code::InvalidArgument => {
        ErrorCategory::InvalidArgument(status.message().to_string())
      },
      Code::NotFound => ErrorCategory::NotFound,
      Code::Unavailable => ErrorCategory::Unavailable,
      Code::Cancelled => ErrorCategory::Cancelled,
      _ => ErrorCategory::Internal,
    };

    Error::from_context(
      category,
      RemoteStatus { code: status.code(), message: status.message().into() },
    )
  }
}
