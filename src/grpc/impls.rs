use chrono::{DateTime, TimeZone, Utc};
use sqlx::postgres::types::PgInterval;
use uuid::Uuid;

use super::proto::{self, FromProto, ToProto};
use crate::entity::{Role, User};
use crate::error::Error;

/// `0001-01-01T00:00:00Z`
const MIN_TIMESTAMP_SECONDS: i64 = -62_135_596_800;
/// `9999-12-31T23:59:59Z`
const MAX_TIMESTAMP_SECONDS: i64 = 253_402_300_799;
/// About 10,000 years.
const MAX_DURATION_SECONDS: i64 = 315_576_000_000;

const NANOS_PER_SECOND: i32 = 1_000_000_000;
const NANOS_PER_MICRO: i32 = 1_000;
const MICROS_PER_SECOND: i64 = 1_000_000;

impl FromProto for Role {
  type ProtoType = i32;

  fn from_proto(proto: Self::ProtoType) -> crate::Result<Self>
  where
    Self: Sized,
  {
    match proto::Role::try_from(proto) {
      Ok(proto::Role::Guest) => Ok(Role::Guest),
      Ok(proto::Role::Member) => Ok(Role::Member),
      Ok(proto::Role::Admin) => Ok(Role::Admin),
      Err(..) => Err(Error::invalid_argument(format!("unknown role type {proto}"))),
    }
  }
}

impl ToProto for Role {
  type ProtoType = i32;

  fn to_proto(self) -> crate::Result<Self::ProtoType>
  where
    Self: Sized,
  {
    let role = match self {
      Role::Guest => proto::Role::Guest,
      Role::Member => proto::Role::Member,
      Role::Admin => proto::Role::Admin,
    };
    Ok(role.into())
  }
}

impl FromProto for DateTime<Utc> {
  type ProtoType = prost_types::Timestamp;

  fn from_proto(proto: Self::ProtoType) -> crate::Result<Self>
  where
    Self: Sized,
  {
    let invalid = || {
      Error::invalid_argument(format!(
        "invalid timestamp (seconds: {}, nanos: {})",
        proto.seconds, proto.nanos
      ))
    };

    if !(MIN_TIMESTAMP_SECONDS..=MAX_TIMESTAMP_SECONDS).contains(&proto.seconds)
    {
      return Err(invalid());
    }

    let nanos = u32::try_from(proto.nanos)
      .ok()
      .filter(|n| *n < 1_000_000_000)
      .ok_or_else(invalid)?;

    Utc.timestamp_opt(proto.seconds, nanos).single().ok_or_else(invalid)
  }
}

impl ToProto for DateTime<Utc> {
  type ProtoType = prost_types::Timestamp;

  #[allow(clippy::cast_possible_wrap)]
  fn to_proto(self) -> crate::Result<Self::ProtoType>
  where
    Self: Sized,
  {
    // Sub-second nanos never exceed 1,999,999,999 so they fit in i32
    Ok(prost_types::Timestamp {
      seconds: self.timestamp(),
      nanos: self.timestamp_subsec_nanos() as i32,
    })
  }
}

/// Sub-microsecond precision is truncated since Postgres intervals
/// only keep microseconds.
impl FromProto for PgInterval {
  type ProtoType = prost_types::Duration;

  fn from_proto(proto: Self::ProtoType) -> crate::Result<Self>
  where
    Self: Sized,
  {
    let invalid = || {
      Error::invalid_argument(format!(
        "invalid duration (seconds: {}, nanos: {})",
        proto.seconds, proto.nanos
      ))
    };

    let seconds = proto.seconds;
    let nanos = proto.nanos;

    if nanos <= -NANOS_PER_SECOND || nanos >= NANOS_PER_SECOND {
      return Err(invalid());
    }

    if (seconds > 0 && nanos < 0) || (seconds < 0 && nanos > 0) {
      return Err(invalid());
    }

    if !(-MAX_DURATION_SECONDS..=MAX_DURATION_SECONDS).contains(&seconds) {
      return Err(invalid());
    }

    let microseconds = seconds
      .checked_mul(MICROS_PER_SECOND)
      .and_then(|v| v.checked_add(i64::from(nanos / NANOS_PER_MICRO)))
      .ok_or_else(invalid)?;

    Ok(PgInterval { months: 0, days: 0, microseconds })
  }
}

impl FromProto for Uuid {
  type ProtoType = String;

  fn from_proto(proto: Self::ProtoType) -> crate::Result<Self>
  where
    Self: Sized,
  {
    Uuid::parse_str(&proto).map_err(|e| {
      Error::invalid_argument("invalid UUID provided")
        .attach_printable(format!("{proto:?}: {e}"))
    })
  }
}

impl ToProto for User {
  type ProtoType = proto::User;

  fn to_proto(self) -> crate::Result<Self::ProtoType>
  where
    Self: Sized,
  {
    Ok(proto::User {
      id: self.id.to_string(),
      role: self.role.to_proto()?,
      create_time: Some(self.create_time.to_proto()?),
      name: self.name,
    })
  }
}

impl FromProto for User {
  type ProtoType = proto::User;

  fn from_proto(proto: Self::ProtoType) -> crate::Result<Self>
  where
    Self: Sized,
  {
    let create_time = proto
      .create_time
      .ok_or_else(|| Error::invalid_argument("missing create_time"))?;

    Ok(Self {
      id: Uuid::from_proto(proto.id)?,
      role: Role::from_proto(proto.role)?,
      create_time: DateTime::<Utc>::from_proto(create_time)?,
      name: proto.name,
    })
  }
}
