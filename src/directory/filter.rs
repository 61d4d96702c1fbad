use chrono::{DateTime, Utc};
use sqlx::postgres::types::PgInterval;
use sqlx::{Postgres, QueryBuilder};

use crate::grpc::proto::{self, FromProto};

const SELECT_USERS: &str =
  "SELECT id, role::text AS role, create_time, name FROM users";

/// Restrictions of a `ListUsers` call. Every condition that is
/// set must hold for a user to be listed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ListFilter {
  /// Keeps users with `create_time > created_since`.
  pub created_since: Option<DateTime<Utc>>,
  /// Keeps users with `CURRENT_TIMESTAMP - create_time > older_than`.
  pub older_than: Option<PgInterval>,
}

impl FromProto for ListFilter {
  type ProtoType = proto::ListUsersRequest;

  fn from_proto(proto: Self::ProtoType) -> crate::Result<Self>
  where
    Self: Sized,
  {
    Ok(Self {
      created_since: proto.created_since.map(FromProto::from_proto).transpose()?,
      older_than: proto.older_than.map(FromProto::from_proto).transpose()?,
    })
  }
}

impl ListFilter {
  /// Builds the ordered select statement with every set condition.
  #[must_use]
  pub fn to_query(&self) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(SELECT_USERS);
    let mut separator = " WHERE ";

    if let Some(created_since) = self.created_since {
      query.push(separator).push("create_time > ").push_bind(created_since);
      separator = " AND ";
    }

    if let Some(older_than) = &self.older_than {
      query
        .push(separator)
        .push("CURRENT_TIMESTAMP - create_time > ")
        .push_bind(older_than.clone());
    }

    query.push(" ORDER BY create_time ASC, id ASC");
    query
  }
}
