use error_stack::Context;

use super::{Error, ErrorCategory};

pub trait ErrorExt<T> {
  fn with_category(self, category: ErrorCategory) -> Result<T, Error>;
}

impl<T, C: Context> ErrorExt<T> for std::result::Result<T, C> {
  #[track_caller]
  fn with_category(self, category: ErrorCategory) -> Result<T, Error> {
    self.map_err(|e| Error::from_context(category, e))
  }
}
