use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::mpsc;
use tonic::{Status, Streaming};

use crate::error::{Error, ErrorCategory};
use crate::grpc::proto;

/// Where [`Directory::list_users`](super::Directory::list_users)
/// sends users to, one at a time.
#[async_trait]
pub trait UserSink: Send {
  /// Fails with [`ErrorCategory::Cancelled`] once the receiving
  /// end went away.
  async fn send(&mut self, user: proto::User) -> crate::Result<()>;
}

/// Where [`Directory::add_users`](super::Directory::add_users)
/// reads requests from. `Ok(None)` marks a clean end of input.
#[async_trait]
pub trait AddUserSource: Send {
  async fn recv(&mut self) -> crate::Result<Option<proto::AddUserRequest>>;
}

#[async_trait]
impl UserSink for mpsc::Sender<Result<proto::User, Status>> {
  async fn send(&mut self, user: proto::User) -> crate::Result<()> {
    mpsc::Sender::send(self, Ok(user))
      .await
      .map_err(|e| Error::from_context(ErrorCategory::Cancelled, e))
  }
}

#[async_trait]
impl UserSink for Vec<proto::User> {
  async fn send(&mut self, user: proto::User) -> crate::Result<()> {
    self.push(user);
    Ok(())
  }
}

#[async_trait]
impl AddUserSource for Streaming<proto::AddUserRequest> {
  async fn recv(&mut self) -> crate::Result<Option<proto::AddUserRequest>> {
    self.message().await.map_err(Error::from_rpc)
  }
}

#[async_trait]
impl AddUserSource for VecDeque<proto::AddUserRequest> {
  async fn recv(&mut self) -> crate::Result<Option<proto::AddUserRequest>> {
    Ok(self.pop_front())
  }
}
