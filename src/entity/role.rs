use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// Access level of a user. Stored as the `role` Postgres enum.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
  #[default]
  Guest,
  Member,
  Admin,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown role {0:?}")]
pub struct UnknownRole(pub String);

impl Role {
  pub const ALL: [Role; 3] = [Role::Guest, Role::Member, Role::Admin];

  /// Token used by the `role` enum in the database.
  #[must_use]
  pub const fn as_str(self) -> &'static str {
    match self {
      Self::Guest => "guest",
      Self::Member => "member",
      Self::Admin => "admin",
    }
  }
}

impl FromStr for Role {
  type Err = UnknownRole;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "guest" => Ok(Self::Guest),
      "member" => Ok(Self::Member),
      "admin" => Ok(Self::Admin),
      _ => Err(UnknownRole(s.to_string())),
    }
  }
}

impl Display for Role {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn storage_tokens_round_trip() {
    for role in Role::ALL {
      assert_eq!(role.as_str().parse::<Role>(), Ok(role));
    }
  }

  #[test]
  fn rejects_unknown_tokens() {
    assert_eq!("owner".parse::<Role>(), Err(UnknownRole("owner".into())));
    // tokens are case sensitive
    assert!("ADMIN".parse::<Role>().is_err());
  }
}
