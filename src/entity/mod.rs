mod role;
mod user;

pub use self::role::{Role, UnknownRole};
pub use self::user::{User, UserRow};
