//! Timestamp encodings shared by the row codec, the store, and the API.
//!
//! Rows carry `updatedAt` as epoch milliseconds in a plain numeric cell; the
//! API speaks ISO-8601 with millisecond precision and a `Z` suffix.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};

/// Render a timestamp as ISO-8601 with millisecond precision
/// (`2024-01-02T03:04:05.678Z`).
pub fn to_iso8601(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an ISO-8601 timestamp. Offset-less values are taken as UTC.
pub fn parse_iso8601(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(err) => value
            .parse::<NaiveDateTime>()
            .map(|naive| Utc.from_utc_datetime(&naive))
            .map_err(|_| err),
    }
}

/// Convert epoch milliseconds to a UTC timestamp.
///
/// `None` when the value falls outside chrono's representable range.
pub fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

/// Serde adapter for `DateTime<Utc>` fields using the ISO-8601-millis wire
/// form.
pub mod iso8601_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::to_iso8601(ts))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_iso8601(&raw).map_err(serde::de::Error::custom)
    }
}
