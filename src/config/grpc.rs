use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[derive(Debug, Deserialize)]
pub struct Grpc {
  /// Address where `UserService` listens for requests.
  ///
  /// **Environment variables**:
  /// - `USERDIR_GRPC_ADDRESS`
  #[serde(default = "Grpc::default_address")]
  pub address: SocketAddr,
}

impl Grpc {
  const DEFAULT_PORT: u16 = 10000;

  fn default_address() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), Self::DEFAULT_PORT)
  }
}

impl Default for Grpc {
  fn default() -> Self {
    Self { address: Self::default_address() }
  }
}
