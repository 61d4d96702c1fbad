#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod client;
pub mod config;
pub mod db;
pub mod directory;
pub mod entity;
pub mod error;
pub mod grpc;
pub mod logging;
pub mod server;
pub mod util;

pub use self::directory::Directory;
pub use self::error::{Error, ErrorCategory, Result};
