use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Offset form used by tracker change logs, e.g. `2024-03-04T09:15:00.000+0000`.
const TRACKER_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// Parses an RFC 3339 timestamp, falling back to the tracker's offset form.
pub fn parse(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, TRACKER_FORMAT))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

pub fn deserialize_option<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| {
            parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
        })
        .transpose()
}
