use error_stack::{Result as StackResult, ResultExt};
use futures::TryStreamExt;
use sqlx::postgres::PgCopyIn;
use thiserror::Error;
use uuid::Uuid;

use crate::config;
use crate::db::{migrations, Connection, Pool, SqlxErrorExt};
use crate::entity::{Role, User, UserRow};
use crate::error::{Error, ErrorCategory, Result};
use crate::grpc::proto::{self, FromProto, ToProto};

mod copy;
mod filter;
mod stream;

pub use self::filter::ListFilter;
pub use self::stream::{AddUserSource, UserSink};

/// The user directory. It owns the database pool and is the only
/// one issuing statements against the `users` table.
#[derive(Debug, Clone)]
pub struct Directory {
  pool: Pool,
}

#[derive(Debug, Error)]
#[error("Failed to initialize user directory")]
pub struct DirectoryInitError;

impl Directory {
  /// Connects to the database and brings its schema up to date
  /// before anything is served.
  #[tracing::instrument(skip_all, name = "directory.connect")]
  pub async fn connect(
    cfg: &config::Server,
  ) -> StackResult<Self, DirectoryInitError> {
    let pool = Pool::connect(&cfg.db).await.change_context(DirectoryInitError)?;
    let mut conn = pool.get().await.change_context(DirectoryInitError)?;
    migrations::run_pending(&mut conn)
      .await
      .change_context(DirectoryInitError)?;

    Ok(Self { pool })
  }

  /// Uses an existing pool as is. The schema must already be
  /// migrated.
  #[must_use]
  pub fn from_pool(pool: impl Into<Pool>) -> Self {
    Self { pool: pool.into() }
  }

  #[must_use]
  pub fn pool(&self) -> &Pool {
    &self.pool
  }
}

impl Directory {
  #[tracing::instrument(skip_all, name = "directory.add_user")]
  pub async fn add_user(
    &self,
    request: proto::AddUserRequest,
  ) -> Result<proto::User> {
    let role = Role::from_proto(request.role)?;

    let mut conn = self.pool.get().await?;
    let row = sqlx::query_as::<_, UserRow>(
      r"INSERT INTO users (role, name) VALUES ($1::role, $2)
        RETURNING id, role::text AS role, create_time, name",
    )
    .bind(role.as_str())
    .bind(request.name)
    .fetch_one(&mut *conn)
    .await
    .into_db_error()?;

    tracing::debug!(id = %row.id, "Added user");
    User::try_from(row)?.to_proto()
  }

  /// Loads every request of `source` in a single `COPY` session.
  ///
  /// A request with an unknown role or a failing source aborts the
  /// session so none of the rows are stored.
  #[tracing::instrument(skip_all, name = "directory.add_users")]
  pub async fn add_users(
    &self,
    source: &mut impl AddUserSource,
  ) -> Result<()> {
    let mut conn = self.pool.get().await?;
    let mut copy_in =
      conn.copy_in_raw(copy::COPY_STATEMENT).await.into_db_error()?;

    let mut buffer = Vec::new();
    loop {
      let request = match source.recv().await {
        Ok(Some(request)) => request,
        Ok(None) => break,
        Err(error) => return Err(abort_copy(copy_in, error).await),
      };

      let role = match Role::from_proto(request.role) {
        Ok(role) => role,
        Err(error) => return Err(abort_copy(copy_in, error).await),
      };

      copy::encode_row(&mut buffer, role, &request.name);
      if buffer.len() >= copy::FLUSH_THRESHOLD {
        copy_in.send(std::mem::take(&mut buffer)).await.into_db_error()?;
      }
    }

    if !buffer.is_empty() {
      copy_in.send(buffer).await.into_db_error()?;
    }

    let rows = copy_in.finish().await.into_db_error()?;
    tracing::debug!(rows, "Added users");

    Ok(())
  }

  #[tracing::instrument(skip_all, name = "directory.delete_user")]
  pub async fn delete_user(
    &self,
    request: proto::DeleteUserRequest,
  ) -> Result<proto::User> {
    let id = Uuid::from_proto(request.id)?;

    let mut conn = self.pool.get().await?;
    let row = sqlx::query_as::<_, UserRow>(
      r"DELETE FROM users WHERE id = $1
        RETURNING id, role::text AS role, create_time, name",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .into_db_error()?
    .ok_or_else(|| Error::new(ErrorCategory::NotFound))?;

    tracing::debug!(%id, "Deleted user");
    User::try_from(row)?.to_proto()
  }

  #[tracing::instrument(skip_all, name = "directory.list_users")]
  pub async fn list_users(
    &self,
    request: proto::ListUsersRequest,
    sink: &mut impl UserSink,
  ) -> Result<()> {
    let filter = ListFilter::from_proto(request)?;
    self.list_filtered(&filter, sink).await
  }

  /// Sends every user matching `filter` to `sink` as they are read,
  /// oldest first. Users already sent stay sent if a later one fails.
  #[tracing::instrument(skip_all, name = "directory.list_filtered")]
  pub async fn list_filtered(
    &self,
    filter: &ListFilter,
    sink: &mut impl UserSink,
  ) -> Result<()> {
    let mut conn = self.pool.get().await?;
    let mut query = filter.to_query();
    let mut rows = query.build_query_as::<UserRow>().fetch(&mut *conn);

    let mut sent = 0_u64;
    while let Some(row) = rows.try_next().await.into_db_error()? {
      let user = User::try_from(row)?.to_proto()?;
      sink.send(user).await?;
      sent += 1;
    }

    tracing::debug!(sent, "Listed users");
    Ok(())
  }
}

async fn abort_copy(copy_in: PgCopyIn<&mut Connection>, error: Error) -> Error {
  if let Err(abort_error) = copy_in.abort(error.category().to_string()).await {
    tracing::warn!(error = %abort_error, "Failed to abort bulk copy");
  }
  error
}
