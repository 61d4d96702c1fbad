use indexmap::IndexMap;
use std::borrow::Cow;

pub struct MessageBuilder(Vec<Cow<'static, str>>);

impl MessageBuilder {
  #[must_use]
  pub const fn new() -> Self {
    Self(Vec::new())
  }

  pub fn insert(&mut self, message: impl Into<Cow<'static, str>>) {
    self.0.push(message.into());
  }

  #[must_use]
  pub fn build(self) -> ValidateError {
    ValidateError::Messages(self.0)
  }
}

pub struct FieldBuilder(IndexMap<Cow<'static, str>, ValidateError>);

#[allow(clippy::new_without_default)]
impl FieldBuilder {
  #[must_use]
  pub fn new() -> Self {
    Self(IndexMap::default())
  }

  pub fn insert(
    &mut self,
    key: impl Into<Cow<'static, str>>,
    value: ValidateError,
  ) {
    if !value.is_empty() {
      self.0.insert(key.into(), value);
    }
  }

  /// Validates a nested value and stores its errors (if any)
  /// under `key`.
  pub fn insert_nested(
    &mut self,
    key: impl Into<Cow<'static, str>>,
    value: &impl crate::Validate,
  ) {
    if let Err(error) = value.validate() {
      self.insert(key, error);
    }
  }

  #[must_use]
  pub fn build(self) -> ValidateError {
    ValidateError::Fields(self.0)
  }
}

// ---------------------------------------------------- //

#[derive(PartialEq, Eq)]
pub enum ValidateError {
  Fields(IndexMap<Cow<'static, str>, ValidateError>),
  Messages(Vec<Cow<'static, str>>),
}

impl std::fmt::Display for ValidateError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str("Invalid data occurred")
  }
}

impl std::error::Error for ValidateError {}

impl std::fmt::Debug for ValidateError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ValidateError::Fields(n) => n.fmt(f),
      ValidateError::Messages(n) => {
        f.debug_map().entry(&"_errors", &n).finish()
      },
    }
  }
}

impl ValidateError {
  #[must_use]
  pub fn field_builder() -> FieldBuilder {
    FieldBuilder::new()
  }

  #[must_use]
  pub fn msg_builder() -> MessageBuilder {
    MessageBuilder::new()
  }
}

impl ValidateError {
  #[must_use]
  pub fn is_empty(&self) -> bool {
    match self {
      ValidateError::Fields(n) => n.is_empty(),
      ValidateError::Messages(n) => n.is_empty(),
    }
  }

  pub fn into_result(self) -> Result<(), Self> {
    if self.is_empty() {
      Ok(())
    } else {
      Err(self)
    }
  }

  /// Flattens every message with the dotted path of the
  /// field it belongs to, e.g. `db.url: Invalid Postgres URL`.
  #[must_use]
  pub fn flatten(&self) -> Vec<String> {
    fn walk(err: &ValidateError, path: &mut Vec<String>, out: &mut Vec<String>) {
      match err {
        ValidateError::Fields(fields) => {
          for (field, data) in fields {
            path.push(field.to_string());
            walk(data, path, out);
            path.pop();
          }
        },
        ValidateError::Messages(messages) => {
          let field = path.join(".");
          for message in messages {
            if field.is_empty() {
              out.push(message.to_string());
            } else {
              out.push(format!("{field}: {message}"));
            }
          }
        },
      }
    }

    let mut out = Vec::new();
    walk(self, &mut Vec::new(), &mut out);
    out
  }
}
