//! These tests need a Postgres server reachable through `DATABASE_URL`.
//! Run them with `cargo test -- --ignored`.
#![allow(clippy::unwrap_used, clippy::panic)]
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::VecDeque;
use std::time::Duration;
use userdir::directory::{AddUserSource, UserSink};
use userdir::grpc::proto::{self, FromProto};
use userdir::{Directory, ErrorCategory};

fn add_request(role: proto::Role, name: &str) -> proto::AddUserRequest {
  proto::AddUserRequest { role: role.into(), name: name.to_string() }
}

fn create_time(user: &proto::User) -> DateTime<Utc> {
  DateTime::<Utc>::from_proto(user.create_time.clone().unwrap()).unwrap()
}

async fn list(
  directory: &Directory,
  request: proto::ListUsersRequest,
) -> Vec<proto::User> {
  let mut users: Vec<proto::User> = Vec::new();
  directory.list_users(request, &mut users).await.unwrap();
  users
}

async fn count_users(pool: &PgPool) -> i64 {
  sqlx::query_scalar("SELECT COUNT(*) FROM users")
    .fetch_one(pool)
    .await
    .unwrap()
}

#[sqlx::test(migrator = "userdir::db::MIGRATOR")]
#[ignore = "needs a Postgres database in DATABASE_URL"]
async fn add_user_returns_stored_record(pool: PgPool) {
  userdir::logging::init_for_tests();
  let directory = Directory::from_pool(pool);

  let before = Utc::now();
  let user = directory
    .add_user(add_request(proto::Role::Member, "Sample User"))
    .await
    .unwrap();

  assert!(!user.id.is_empty());
  assert!(uuid::Uuid::parse_str(&user.id).is_ok());
  assert_eq!(user.role, i32::from(proto::Role::Member));
  assert_eq!(user.name, "Sample User");

  let elapsed = (create_time(&user) - before).num_milliseconds().abs();
  assert!(elapsed < 1000, "create_time is {elapsed}ms away");
}

#[sqlx::test(migrator = "userdir::db::MIGRATOR")]
#[ignore = "needs a Postgres database in DATABASE_URL"]
async fn add_user_accepts_empty_name(pool: PgPool) {
  let directory = Directory::from_pool(pool);
  let user = directory.add_user(add_request(proto::Role::Guest, "")).await.unwrap();
  assert_eq!(user.name, "");
  assert_eq!(user.role, i32::from(proto::Role::Guest));
}

#[sqlx::test(migrator = "userdir::db::MIGRATOR")]
#[ignore = "needs a Postgres database in DATABASE_URL"]
async fn add_user_rejects_unknown_role(pool: PgPool) {
  let directory = Directory::from_pool(pool.clone());
  let request = proto::AddUserRequest { role: 42, name: "x".into() };

  let error = directory.add_user(request).await.unwrap_err();
  assert!(error.is_invalid_argument());
  assert_eq!(count_users(&pool).await, 0);
}

#[sqlx::test(migrator = "userdir::db::MIGRATOR")]
#[ignore = "needs a Postgres database in DATABASE_URL"]
async fn delete_user_returns_last_state(pool: PgPool) {
  let directory = Directory::from_pool(pool.clone());
  let added = directory
    .add_user(add_request(proto::Role::Admin, "Sample User"))
    .await
    .unwrap();

  let deleted = directory
    .delete_user(proto::DeleteUserRequest { id: added.id.clone() })
    .await
    .unwrap();

  assert_eq!(deleted, added);
  assert_eq!(count_users(&pool).await, 0);

  let error = directory
    .delete_user(proto::DeleteUserRequest { id: added.id })
    .await
    .unwrap_err();
  assert_eq!(error.category(), &ErrorCategory::NotFound);
}

#[sqlx::test(migrator = "userdir::db::MIGRATOR")]
#[ignore = "needs a Postgres database in DATABASE_URL"]
async fn delete_user_rejects_invalid_id(pool: PgPool) {
  let directory = Directory::from_pool(pool.clone());
  directory.add_user(add_request(proto::Role::Guest, "a")).await.unwrap();

  let error = directory
    .delete_user(proto::DeleteUserRequest { id: "not_a_UUID".into() })
    .await
    .unwrap_err();

  assert!(error.is_invalid_argument());
  assert_eq!(count_users(&pool).await, 1);
}

#[sqlx::test(migrator = "userdir::db::MIGRATOR")]
#[ignore = "needs a Postgres database in DATABASE_URL"]
async fn list_users_without_filter_is_ordered(pool: PgPool) {
  let directory = Directory::from_pool(pool);

  let mut added = Vec::new();
  for name in ["a", "b", "c", "d"] {
    let user = directory.add_user(add_request(proto::Role::Guest, name)).await;
    added.push(user.unwrap());
  }

  let users = list(&directory, proto::ListUsersRequest::default()).await;
  assert_eq!(users, added);

  let times = users.iter().map(create_time).collect::<Vec<_>>();
  assert!(times.windows(2).all(|w| w[0] <= w[1]));
}

#[sqlx::test(migrator = "userdir::db::MIGRATOR")]
#[ignore = "needs a Postgres database in DATABASE_URL"]
async fn list_users_breaks_ties_by_id(pool: PgPool) {
  let directory = Directory::from_pool(pool.clone());

  // a single statement shares the same CURRENT_TIMESTAMP
  sqlx::query("INSERT INTO users (name) SELECT 'same' FROM generate_series(1, 5)")
    .execute(&pool)
    .await
    .unwrap();

  let users = list(&directory, proto::ListUsersRequest::default()).await;
  let ids = users
    .iter()
    .map(|u| uuid::Uuid::parse_str(&u.id).unwrap())
    .collect::<Vec<_>>();

  let mut sorted = ids.clone();
  sorted.sort();
  assert_eq!(ids, sorted);
}

#[sqlx::test(migrator = "userdir::db::MIGRATOR")]
#[ignore = "needs a Postgres database in DATABASE_URL"]
async fn list_users_filters(pool: PgPool) {
  let directory = Directory::from_pool(pool);
  let pause = Duration::from_millis(500);

  let a = directory.add_user(add_request(proto::Role::Guest, "A")).await.unwrap();
  tokio::time::sleep(pause).await;
  let b = directory.add_user(add_request(proto::Role::Member, "B")).await.unwrap();
  tokio::time::sleep(pause).await;
  let c = directory.add_user(add_request(proto::Role::Admin, "C")).await.unwrap();

  let since_a = proto::ListUsersRequest {
    created_since: a.create_time.clone(),
    older_than: None,
  };
  assert_eq!(list(&directory, since_a).await, vec![b.clone(), c.clone()]);

  // A is about one second old, B half a second and C brand new
  let older = proto::ListUsersRequest {
    created_since: None,
    older_than: Some(prost_types::Duration { seconds: 0, nanos: 750_000_000 }),
  };
  assert_eq!(list(&directory, older).await, vec![a.clone()]);

  let both = proto::ListUsersRequest {
    created_since: a.create_time.clone(),
    older_than: Some(prost_types::Duration { seconds: 0, nanos: 250_000_000 }),
  };
  assert_eq!(list(&directory, both).await, vec![b]);

  let none = proto::ListUsersRequest {
    created_since: c.create_time,
    older_than: None,
  };
  assert!(list(&directory, none).await.is_empty());
}

#[sqlx::test(migrator = "userdir::db::MIGRATOR")]
#[ignore = "needs a Postgres database in DATABASE_URL"]
async fn list_users_rejects_invalid_filter(pool: PgPool) {
  let directory = Directory::from_pool(pool);
  let request = proto::ListUsersRequest {
    created_since: Some(prost_types::Timestamp { seconds: 0, nanos: -5 }),
    older_than: None,
  };

  let mut users: Vec<proto::User> = Vec::new();
  let error = directory.list_users(request, &mut users).await.unwrap_err();
  assert!(error.is_invalid_argument());
}

#[sqlx::test(migrator = "userdir::db::MIGRATOR")]
#[ignore = "needs a Postgres database in DATABASE_URL"]
async fn list_users_fails_on_corrupt_role(pool: PgPool) {
  let directory = Directory::from_pool(pool.clone());
  directory.add_user(add_request(proto::Role::Guest, "fine")).await.unwrap();

  sqlx::query("ALTER TYPE role ADD VALUE 'owner'")
    .execute(&pool)
    .await
    .unwrap();
  sqlx::query("INSERT INTO users (role, name) VALUES ('owner', 'corrupt')")
    .execute(&pool)
    .await
    .unwrap();

  let mut users: Vec<proto::User> = Vec::new();
  let error = directory
    .list_users(proto::ListUsersRequest::default(), &mut users)
    .await
    .unwrap_err();

  assert_eq!(error.category(), &ErrorCategory::Internal);
  // rows sent before the corrupt one stay sent
  assert_eq!(users.len(), 1);
  assert_eq!(users[0].name, "fine");
}

/// Accepts a limited number of users, then behaves like a
/// client that went away.
struct ClosingSink {
  remaining: usize,
  received: Vec<proto::User>,
}

#[async_trait]
impl UserSink for ClosingSink {
  async fn send(&mut self, user: proto::User) -> userdir::Result<()> {
    if self.remaining == 0 {
      return Err(userdir::Error::new(ErrorCategory::Cancelled));
    }
    self.remaining -= 1;
    self.received.push(user);
    Ok(())
  }
}

#[sqlx::test(migrator = "userdir::db::MIGRATOR")]
#[ignore = "needs a Postgres database in DATABASE_URL"]
async fn list_users_stops_when_consumer_leaves(pool: PgPool) {
  let directory = Directory::from_pool(pool);
  for name in ["a", "b", "c"] {
    directory.add_user(add_request(proto::Role::Guest, name)).await.unwrap();
  }

  let mut sink = ClosingSink { remaining: 1, received: Vec::new() };
  let error = directory
    .list_users(proto::ListUsersRequest::default(), &mut sink)
    .await
    .unwrap_err();

  assert_eq!(error.category(), &ErrorCategory::Cancelled);
  assert_eq!(sink.received.len(), 1);
}

#[sqlx::test(migrator = "userdir::db::MIGRATOR")]
#[ignore = "needs a Postgres database in DATABASE_URL"]
async fn add_users_loads_every_request(pool: PgPool) {
  let directory = Directory::from_pool(pool);

  let names = [
    "plain", "", "with,comma", "with \"quotes\"", "multi\nline", "\\N",
    "trailing ", "ünïcödé", "a", "b",
  ];
  let mut requests = names
    .iter()
    .enumerate()
    .map(|(i, name)| {
      let role = [proto::Role::Guest, proto::Role::Member, proto::Role::Admin][i % 3];
      add_request(role, name)
    })
    .collect::<VecDeque<_>>();

  directory.add_users(&mut requests).await.unwrap();

  let users = list(&directory, proto::ListUsersRequest::default()).await;
  assert_eq!(users.len(), 10);

  let mut stored = users.iter().map(|u| u.name.as_str()).collect::<Vec<_>>();
  let mut expected = names.to_vec();
  stored.sort_unstable();
  expected.sort_unstable();
  assert_eq!(stored, expected);

  let admins = users
    .iter()
    .filter(|u| u.role == i32::from(proto::Role::Admin))
    .count();
  assert_eq!(admins, 3);
}

#[sqlx::test(migrator = "userdir::db::MIGRATOR")]
#[ignore = "needs a Postgres database in DATABASE_URL"]
async fn add_users_accepts_empty_batch(pool: PgPool) {
  let directory = Directory::from_pool(pool.clone());
  directory.add_users(&mut VecDeque::<proto::AddUserRequest>::new()).await.unwrap();
  assert_eq!(count_users(&pool).await, 0);
}

#[sqlx::test(migrator = "userdir::db::MIGRATOR")]
#[ignore = "needs a Postgres database in DATABASE_URL"]
async fn add_users_discards_batch_on_invalid_request(pool: PgPool) {
  let directory = Directory::from_pool(pool.clone());
  let mut requests = VecDeque::from([
    add_request(proto::Role::Guest, "a"),
    proto::AddUserRequest { role: 9, name: "b".into() },
    add_request(proto::Role::Guest, "c"),
  ]);

  let error = directory.add_users(&mut requests).await.unwrap_err();
  assert!(error.is_invalid_argument());
  assert_eq!(count_users(&pool).await, 0);

  // the connection is usable after the aborted copy
  directory.add_user(add_request(proto::Role::Guest, "d")).await.unwrap();
  assert_eq!(count_users(&pool).await, 1);
}

/// Yields its requests, then fails like a broken client stream.
struct FailingSource(VecDeque<proto::AddUserRequest>);

#[async_trait]
impl AddUserSource for FailingSource {
  async fn recv(&mut self) -> userdir::Result<Option<proto::AddUserRequest>> {
    match self.0.pop_front() {
      Some(request) => Ok(Some(request)),
      None => Err(userdir::Error::from(tonic::Status::unknown("stream reset"))),
    }
  }
}

#[sqlx::test(migrator = "userdir::db::MIGRATOR")]
#[ignore = "needs a Postgres database in DATABASE_URL"]
async fn add_users_discards_batch_on_stream_error(pool: PgPool) {
  let directory = Directory::from_pool(pool.clone());
  let mut source = FailingSource(VecDeque::from([
    add_request(proto::Role::Guest, "a"),
    add_request(proto::Role::Member, "b"),
  ]));

  let error = directory.add_users(&mut source).await.unwrap_err();
  assert_eq!(error.category(), &ErrorCategory::Internal);
  assert_eq!(count_users(&pool).await, 0);
}
