use chrono::{DateTime, SecondsFormat, Utc};
use clap::{Args, Parser};
use error_stack::{Report, Result, ResultExt};
use futures::TryStreamExt;
use std::time::Duration;
use userdir::client::DirectoryClient;
use userdir::entity::{Role, User};

use super::CliError;

#[derive(Debug, Args)]
pub struct ClientArgs {
  /// Address of a running user directory
  #[clap(long, env = "USERDIR_ADDR", default_value = "http://localhost:10000")]
  pub addr: String,
}

/// Add a user
#[derive(Debug, Parser)]
pub struct AddCommand {
  #[clap(flatten)]
  pub client: ClientArgs,
  #[clap(long, default_value = "guest")]
  pub role: Role,
  #[clap(long, default_value = "")]
  pub name: String,
}

/// List users, oldest first
#[derive(Debug, Parser)]
pub struct ListCommand {
  #[clap(flatten)]
  pub client: ClientArgs,
  /// Only users created more than this many seconds ago
  #[clap(long)]
  pub older_than: Option<u64>,
  /// Only users created after this RFC 3339 timestamp
  #[clap(long)]
  pub created_since: Option<DateTime<Utc>>,
}

/// Delete a user by its id
#[derive(Debug, Parser)]
pub struct DeleteCommand {
  #[clap(flatten)]
  pub client: ClientArgs,
  pub id: String,
}

/// Add many users with the same role and name in one call
#[derive(Debug, Parser)]
pub struct BulkAddCommand {
  #[clap(flatten)]
  pub client: ClientArgs,
  #[clap(long, default_value_t = 10)]
  pub count: usize,
  #[clap(long, default_value = "guest")]
  pub role: Role,
  #[clap(long, default_value = "")]
  pub name: String,
}

pub fn add(args: AddCommand) -> Result<(), CliError> {
  with_client(&args.client, |client| async move {
    let user = client.add_user(args.role, &args.name).await?;
    print_user(&user);
    Ok(())
  })
}

pub fn list(args: ListCommand) -> Result<(), CliError> {
  with_client(&args.client, |client| async move {
    let older_than = args.older_than.map(Duration::from_secs);
    let users = client.list_users(args.created_since, older_than).await?;
    futures::pin_mut!(users);

    while let Some(user) = users.try_next().await? {
      print_user(&user);
    }
    Ok(())
  })
}

pub fn delete(args: DeleteCommand) -> Result<(), CliError> {
  with_client(&args.client, |client| async move {
    let user = client.delete_user(&args.id).await?;
    print_user(&user);
    Ok(())
  })
}

pub fn bulk_add(args: BulkAddCommand) -> Result<(), CliError> {
  with_client(&args.client, |client| async move {
    let users = std::iter::repeat((args.role, args.name)).take(args.count);
    client.add_users(users).await?;
    println!("added {} users", args.count);
    Ok(())
  })
}

fn with_client<F, Fut>(args: &ClientArgs, f: F) -> Result<(), CliError>
where
  F: FnOnce(DirectoryClient) -> Fut,
  Fut: std::future::Future<Output = userdir::Result<()>>,
{
  if !validator::extras::validate_url(&args.addr) {
    return Err(
      Report::new(CliError).attach_printable(format!("invalid address {:?}", args.addr)),
    );
  }

  super::runtime()?.block_on(async {
    let client = DirectoryClient::connect(&args.addr)
      .await
      .change_context(CliError)?;

    f(client).await.map_err(|e| e.into_report().change_context(CliError))
  })
}

fn print_user(user: &User) {
  println!(
    "{}\t{}\t{}\t{:?}",
    user.id,
    user.role,
    user.create_time.to_rfc3339_opts(SecondsFormat::Micros, true),
    user.name
  );
}
