//! Column conversions shared by the sqlite repository.

use chrono::{DateTime, Utc};
use diesel::result::{DatabaseErrorKind, Error};

/// Wrap a connection failure so it surfaces as a database error.
pub fn connection_error(e: impl std::fmt::Display) -> Error {
    Error::DatabaseError(
        DatabaseErrorKind::UnableToSendCommand,
        Box::new(format!("sqlite connection failed: {}", e)),
    )
}

/// Timestamps are stored as RFC 3339 text. Unreadable values become the epoch.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

pub fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.as_deref().map(parse_datetime)
}
