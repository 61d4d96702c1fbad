use clap::Parser;
use error_stack::{Result, ResultExt};
use thiserror::Error;
use tokio::runtime::Runtime;

mod client;
mod migrate;
mod serve;

#[derive(Debug, Error)]
#[error("Failed to run command")]
pub struct CliError;

/// Command line options for the user directory.
#[derive(Debug, Parser)]
#[command(about = "A gRPC directory of users", version, author, long_about)]
pub struct Cli {
  #[clap(subcommand)]
  pub subcommand: Subcommand,
}

impl Cli {
  pub fn run(self) -> Result<(), CliError> {
    match self.subcommand {
      Subcommand::Serve(args) => self::serve::run(&args),
      Subcommand::Migrate(args) => self::migrate::run(&args),
      Subcommand::Add(args) => self::client::add(args),
      Subcommand::List(args) => self::client::list(args),
      Subcommand::Delete(args) => self::client::delete(args),
      Subcommand::BulkAdd(args) => self::client::bulk_add(args),
    }
  }
}

#[derive(Debug, Parser)]
pub enum Subcommand {
  Serve(self::serve::ServeCommand),
  Migrate(self::migrate::MigrateCommand),
  Add(self::client::AddCommand),
  List(self::client::ListCommand),
  Delete(self::client::DeleteCommand),
  BulkAdd(self::client::BulkAddCommand),
}

fn runtime() -> Result<Runtime, CliError> {
  tokio::runtime::Builder::new_multi_thread()
    .enable_all()
    .build()
    .change_context(CliError)
    .attach_printable("could not build tokio runtime")
}
