use url::Url;

#[must_use]
pub fn validate_url(url: &str) -> bool {
  Url::parse(url).is_ok()
}

/// Accepts `postgres://`, `postgresql://` and `cockroachdb://` URLs.
///
/// The host may be left out, as in
/// `postgres:///users?host=/var/run/postgresql`, since libpq then
/// falls back to the `host` parameter or a local socket.
#[must_use]
pub fn validate_pg_url(url: &str) -> bool {
  Url::parse(url)
    .map(|v| matches!(v.scheme(), "postgres" | "postgresql" | "cockroachdb"))
    .unwrap_or_default()
}
