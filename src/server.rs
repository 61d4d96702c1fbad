use error_stack::{Result as StackResult, ResultExt};
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;
use tokio::sync::mpsc;
use tonic::transport::server::Router;
use tonic::transport::Server;
use tonic::{Request, Response, Status, Streaming};
use tracing::Instrument;

use crate::config;
use crate::directory::{Directory, ListFilter};
use crate::error::ErrorCategory;
use crate::grpc::proto::user_service_server::{UserService, UserServiceServer};
use crate::grpc::proto::{self, FromProto};

/// Users waiting to be picked up by a slow `ListUsers` client.
const LIST_USERS_BUFFER: usize = 16;

/// Serves [`Directory`] over gRPC.
#[derive(Debug, Clone)]
pub struct DirectoryServer {
  directory: Directory,
}

impl DirectoryServer {
  #[must_use]
  pub fn new(directory: Directory) -> Self {
    Self { directory }
  }

  #[must_use]
  pub fn into_service(self) -> UserServiceServer<Self> {
    UserServiceServer::new(self)
  }
}

#[tonic::async_trait]
impl UserService for DirectoryServer {
  async fn add_user(
    &self,
    request: Request<proto::AddUserRequest>,
  ) -> Result<Response<proto::User>, Status> {
    let user = self.directory.add_user(request.into_inner()).await?;
    Ok(Response::new(user))
  }

  async fn add_users(
    &self,
    request: Request<Streaming<proto::AddUserRequest>>,
  ) -> Result<Response<()>, Status> {
    let mut requests = request.into_inner();
    self.directory.add_users(&mut requests).await?;
    Ok(Response::new(()))
  }

  async fn delete_user(
    &self,
    request: Request<proto::DeleteUserRequest>,
  ) -> Result<Response<proto::User>, Status> {
    let user = self.directory.delete_user(request.into_inner()).await?;
    Ok(Response::new(user))
  }

  type ListUsersStream =
    Pin<Box<dyn Stream<Item = Result<proto::User, Status>> + Send>>;

  async fn list_users(
    &self,
    request: Request<proto::ListUsersRequest>,
  ) -> Result<Response<Self::ListUsersStream>, Status> {
    // Invalid filters are reported before the stream starts
    let filter = ListFilter::from_proto(request.into_inner())?;

    let (mut tx, mut rx) = mpsc::channel(LIST_USERS_BUFFER);
    let directory = self.directory.clone();
    let task = async move {
      // Stops reading as soon as the client goes away, not only
      // when the next user is about to be sent.
      let watcher = tx.clone();
      let result = tokio::select! {
        result = directory.list_filtered(&filter, &mut tx) => result,
        () = watcher.closed() => {
          tracing::debug!("Client went away while listing users");
          return;
        },
      };

      match result {
        Ok(()) => {},
        Err(error) if error.category() == &ErrorCategory::Cancelled => {
          tracing::debug!("Client went away while listing users");
        },
        Err(error) => {
          tx.send(Err(error.into_rpc())).await.ok();
        },
      }
    };
    tokio::spawn(task.in_current_span());

    let stream = futures::stream::poll_fn(move |cx| rx.poll_recv(cx));
    Ok(Response::new(Box::pin(stream)))
  }
}

#[derive(Debug, Error)]
#[error("Failed to start user directory server")]
pub struct StartServerError;

/// Routes `UserService` to `directory`, next to the gRPC reflection
/// service so tools like `grpcurl` can discover it.
pub fn router(directory: Directory) -> StackResult<Router, StartServerError> {
  let reflection = tonic_reflection::server::Builder::configure()
    .register_encoded_file_descriptor_set(proto::FILE_DESCRIPTOR_SET)
    .build()
    .change_context(StartServerError)
    .attach_printable("could not load the reflection descriptors")?;

  Ok(
    Server::builder()
      .add_service(reflection)
      .add_service(DirectoryServer::new(directory).into_service()),
  )
}

/// Connects to the database, migrates it and serves `UserService`
/// until Ctrl-C is pressed.
#[tracing::instrument(skip_all, name = "server.run")]
pub async fn run(config: &config::Server) -> StackResult<(), StartServerError> {
  let directory =
    Directory::connect(config).await.change_context(StartServerError)?;
  let pool = directory.pool().clone();

  let address = config.grpc.address;
  tracing::info!("Serving user directory at {address}");

  router(directory)?
    .serve_with_shutdown(address, shutdown_signal())
    .await
    .change_context(StartServerError)
    .attach_printable_lazy(|| format!("could not serve at {address}"))?;

  pool.close().await;
  tracing::info!("Server stopped");

  Ok(())
}

async fn shutdown_signal() {
  if let Err(error) = tokio::signal::ctrl_c().await {
    tracing::warn!(%error, "Failed to listen for Ctrl-C, serving until killed");
    std::future::pending::<()>().await;
  }
  tracing::info!("Shutting down...");
}
