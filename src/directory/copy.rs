use crate::entity::Role;

/// Loads rows encoded by [`encode_row`].
pub const COPY_STATEMENT: &str =
  "COPY users (role, name) FROM STDIN WITH (FORMAT csv)";

/// Rows are buffered up to this many bytes before being sent.
pub const FLUSH_THRESHOLD: usize = 64 * 1024;

/// Appends one CSV row for [`COPY_STATEMENT`].
///
/// The name is always quoted: an unquoted empty field would be
/// loaded as `NULL` and rejected by the `NOT NULL` constraint.
pub fn encode_row(buffer: &mut Vec<u8>, role: Role, name: &str) {
  buffer.extend_from_slice(role.as_str().as_bytes());
  buffer.extend_from_slice(b",\"");
  for part in name.split_inclusive('"') {
    buffer.extend_from_slice(part.as_bytes());
    if part.ends_with('"') {
      buffer.push(b'"');
    }
  }
  buffer.extend_from_slice(b"\"\n");
}

#[cfg(test)]
mod tests {
  use super::*;

  fn encode(role: Role, name: &str) -> String {
    let mut buffer = Vec::new();
    encode_row(&mut buffer, role, name);
    String::from_utf8(buffer).unwrap()
  }

  #[test]
  fn plain_names() {
    assert_eq!(encode(Role::Member, "Sample User"), "member,\"Sample User\"\n");
  }

  #[test]
  fn empty_name_is_quoted() {
    assert_eq!(encode(Role::Guest, ""), "guest,\"\"\n");
  }

  #[test]
  fn quotes_are_doubled() {
    assert_eq!(encode(Role::Admin, "\"a\"b\""), "admin,\"\"\"a\"\"b\"\"\"\n");
  }

  #[test]
  fn delimiters_stay_inside_quotes() {
    assert_eq!(
      encode(Role::Guest, "a,b\nc\\N"),
      "guest,\"a,b\nc\\N\"\n"
    );
  }

  #[test]
  fn rows_are_appended() {
    let mut buffer = Vec::new();
    encode_row(&mut buffer, Role::Guest, "a");
    encode_row(&mut buffer, Role::Admin, "b");
    assert_eq!(buffer, b"guest,\"a\"\nadmin,\"b\"\n");
  }
}
