//! Shared types and result types for the database layer

pub mod errors;

use chrono::{DateTime, SecondsFormat, Utc};

pub use errors::DatabaseError;

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Render a timestamp the way every table stores it.
///
/// The format is fixed width (microseconds, `Z` suffix) so stored values
/// order lexicographically.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use storefront_database::types::format_timestamp;
///
/// let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
/// assert_eq!(format_timestamp(at), "2024-05-01T12:00:00.000000Z");
/// ```
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Parse a stored timestamp back into UTC.
pub fn parse_timestamp(value: &str) -> DatabaseResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|_| DatabaseError::InvalidData(format!("timestamp {value}")))
}
