mod url;
pub use self::url::{validate_pg_url, validate_url};
