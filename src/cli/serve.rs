use clap::Parser;
use error_stack::{Result, ResultExt};
use std::net::SocketAddr;
use userdir::config::Server as Config;

use super::CliError;

/// Serve the user directory over gRPC
#[derive(Debug, Parser)]
pub struct ServeCommand {
  /// Overrides `grpc.address` of the configuration
  #[clap(long)]
  pub address: Option<SocketAddr>,
}

pub fn run(args: &ServeCommand) -> Result<(), CliError> {
  let mut config = Config::load().change_context(CliError)?;
  if let Some(address) = args.address {
    config.grpc.address = address;
  }

  userdir::logging::init(&config.logging).change_context(CliError)?;
  super::runtime()?
    .block_on(userdir::server::run(&config))
    .change_context(CliError)
}
