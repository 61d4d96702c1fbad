use chrono::{DateTime, Utc};
use error_stack::{Result as StackResult, ResultExt};
use futures::{Stream, TryStreamExt};
use std::time::Duration;
use thiserror::Error;
use tonic::transport::{Channel, Endpoint};
use tonic::Request;

use crate::entity::{Role, User};
use crate::error::{Error, Result};
use crate::grpc::proto::user_service_client::UserServiceClient;
use crate::grpc::proto::{self, FromProto, ToProto};

/// Talks to a running user directory over gRPC.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
  inner: UserServiceClient<Channel>,
}

#[derive(Debug, Error)]
#[error("Failed to connect to the user directory")]
pub struct ClientInitError;

impl DirectoryClient {
  const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

  #[tracing::instrument]
  pub async fn connect(address: &str) -> StackResult<Self, ClientInitError> {
    let channel = Endpoint::from_shared(address.to_string())
      .change_context(ClientInitError)
      .attach_printable_lazy(|| format!("invalid address {address:?}"))?
      .connect_timeout(Self::CONNECT_TIMEOUT)
      .connect()
      .await
      .change_context(ClientInitError)?;

    Ok(Self { inner: UserServiceClient::new(channel) })
  }

  fn establish_grpc_client(&self) -> UserServiceClient<Channel> {
    self.inner.clone()
  }
}

impl DirectoryClient {
  #[tracing::instrument(skip(self))]
  pub async fn add_user(&self, role: Role, name: &str) -> Result<User> {
    let mut client = self.establish_grpc_client();
    let user = client
      .add_user(Request::new(proto::AddUserRequest {
        role: role.to_proto()?,
        name: name.to_string(),
      }))
      .await?
      .into_inner();

    User::from_proto(user)
  }

  /// Adds every user in one bulk call. Either all of them are
  /// stored or none are.
  #[tracing::instrument(skip_all)]
  pub async fn add_users(
    &self,
    users: impl IntoIterator<Item = (Role, String)>,
  ) -> Result<()> {
    let requests = users
      .into_iter()
      .map(|(role, name)| {
        Ok(proto::AddUserRequest { role: role.to_proto()?, name })
      })
      .collect::<Result<Vec<_>>>()?;

    let mut client = self.establish_grpc_client();
    client.add_users(futures::stream::iter(requests)).await?;

    Ok(())
  }

  /// `id` is sent as is, the server validates it.
  #[tracing::instrument(skip(self))]
  pub async fn delete_user(&self, id: &str) -> Result<User> {
    let mut client = self.establish_grpc_client();
    let user = client
      .delete_user(Request::new(proto::DeleteUserRequest { id: id.to_string() }))
      .await?
      .into_inner();

    User::from_proto(user)
  }

  /// Lists users oldest first, as the server streams them.
  #[tracing::instrument(skip(self))]
  pub async fn list_users(
    &self,
    created_since: Option<DateTime<Utc>>,
    older_than: Option<Duration>,
  ) -> Result<impl Stream<Item = Result<User>>> {
    let older_than = older_than.map(duration_to_proto).transpose()?;
    let created_since = created_since.map(ToProto::to_proto).transpose()?;

    let mut client = self.establish_grpc_client();
    let users = client
      .list_users(Request::new(proto::ListUsersRequest {
        created_since,
        older_than,
      }))
      .await?
      .into_inner();

    Ok(
      users
        .map_err(Error::from_rpc)
        .and_then(|user| futures::future::ready(User::from_proto(user))),
    )
  }
}

fn duration_to_proto(duration: Duration) -> Result<prost_types::Duration> {
  let seconds = i64::try_from(duration.as_secs())
    .map_err(|_| Error::invalid_argument("duration is too long"))?;

  // Sub-second nanos are below one billion so they fit in i32
  #[allow(clippy::cast_possible_wrap)]
  let nanos = duration.subsec_nanos() as i32;

  Ok(prost_types::Duration { seconds, nanos })
}
