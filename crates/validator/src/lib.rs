#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;

pub use error::*;
pub mod extras;

/// Checks whether a value (usually a configuration section) holds
/// acceptable data.
///
/// Nested sections report their errors under their own field name
/// with [`FieldBuilder::insert_nested`].
pub trait Validate {
  fn validate(&self) -> Result<(), ValidateError>;
}

impl<T: Validate> Validate for Option<T> {
  fn validate(&self) -> Result<(), ValidateError> {
    match self {
      Some(value) => value.validate(),
      None => Ok(()),
    }
  }
}
