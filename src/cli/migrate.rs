use clap::Parser;
use error_stack::{Result, ResultExt};
use userdir::config::Server as Config;
use userdir::db::{migrations, Pool};

use super::CliError;

/// Bring the database schema up to date
#[derive(Debug, Parser)]
pub struct MigrateCommand {
  /// Only print applied and pending migrations
  #[clap(long, conflicts_with = "revert")]
  pub status: bool,
  /// Revert every migration. This drops all users!
  #[clap(long)]
  pub revert: bool,
}

pub fn run(args: &MigrateCommand) -> Result<(), CliError> {
  let config = Config::load().change_context(CliError)?;
  userdir::logging::init(&config.logging).change_context(CliError)?;

  super::runtime()?.block_on(async {
    let pool = Pool::connect(&config.db).await.change_context(CliError)?;
    let mut conn = pool.get().await.change_context(CliError)?;

    if args.status {
      let status = migrations::status(&mut conn).await.change_context(CliError)?;
      println!("schema version: {}", status.current_version());
      println!("expected version: {}", migrations::SCHEMA_VERSION);
      println!("applied: {:?}", status.applied);
      println!("pending: {:?}", status.pending);
      if let Some(version) = status.dirty {
        println!("dirty: {version}");
      }
    } else if args.revert {
      migrations::undo(&mut conn).await.change_context(CliError)?;
    } else {
      migrations::run_pending(&mut conn).await.change_context(CliError)?;
    }

    drop(conn);
    pool.close().await;
    Ok(())
  })
}
