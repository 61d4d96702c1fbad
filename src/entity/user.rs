use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::Role;
use crate::error::{ErrorCategory, ErrorExt};

/// A row of the `users` table as it comes out of the database.
///
/// `role` is selected as text so an unexpected token surfaces
/// as an error instead of a decoding panic.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UserRow {
  pub id: Uuid,
  pub role: String,
  pub create_time: DateTime<Utc>,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
  pub id: Uuid,
  pub role: Role,
  pub create_time: DateTime<Utc>,
  pub name: String,
}

impl TryFrom<UserRow> for User {
  type Error = crate::Error;

  fn try_from(row: UserRow) -> crate::Result<Self> {
    let role = row
      .role
      .parse::<Role>()
      .with_category(ErrorCategory::Internal)
      .map_err(|e| e.attach_printable(format!("stored in user {}", row.id)))?;

    Ok(Self { id: row.id, role, create_time: row.create_time, name: row.name })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::entity::UnknownRole;

  fn row(role: &str) -> UserRow {
    UserRow {
      id: Uuid::new_v4(),
      role: role.into(),
      create_time: Utc::now(),
      name: "Sample User".into(),
    }
  }

  #[test]
  fn translates_known_roles() {
    let row = row("member");
    let user = User::try_from(row.clone()).unwrap();
    assert_eq!(user.id, row.id);
    assert_eq!(user.role, Role::Member);
    assert_eq!(user.create_time, row.create_time);
    assert_eq!(user.name, row.name);
  }

  #[test]
  fn corrupt_role_is_internal() {
    let error = User::try_from(row("superuser")).unwrap_err();
    assert_eq!(error.category(), &ErrorCategory::Internal);
    assert!(error.downcast_ref::<UnknownRole>().is_some());
  }
}
