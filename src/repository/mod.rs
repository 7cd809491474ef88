//! Repository layer for database persistence.
//!
//! All database access uses Diesel ORM over async SQLite
//! (`SyncConnectionWrapper`). Datetimes are stored as RFC 3339 text; JSON
//! payloads as serialized text columns.

pub mod entities;
pub mod migrations;
pub mod pool;
pub mod records;
pub mod sessions;
pub mod users;

pub use entities::EntityRepository;
pub use pool::{DieselError, SqliteConn, SqlitePool};
pub use sessions::SessionRepository;
pub use users::UserRepository;

use chrono::{DateTime, Utc};

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Parse an optional datetime string.
pub fn parse_datetime_opt(s: Option<&str>) -> Option<DateTime<Utc>> {
    s.map(parse_datetime)
}

/// Current time in storage format.
pub fn now_str() -> String {
    Utc::now().to_rfc3339()
}

/// Serialize an optional JSON value for storage.
pub fn json_to_text(value: &Option<serde_json::Value>) -> Option<String> {
    value.as_ref().and_then(|v| serde_json::to_string(v).ok())
}

/// Parse an optional JSON text column.
pub fn text_to_json(text: Option<&str>) -> Option<serde_json::Value> {
    text.and_then(|t| serde_json::from_str(t).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_datetime_round_trip() {
        let now = Utc::now();
        let parsed = parse_datetime(&now.to_rfc3339());
        assert_eq!(parsed.timestamp(), now.timestamp());
    }

    #[test]
    fn test_parse_datetime_bad_input_is_epoch() {
        assert_eq!(parse_datetime("not a date"), DateTime::UNIX_EPOCH);
    }

    #[test]
    fn test_json_round_trip() {
        let value = Some(serde_json::json!({"a": [1, 2]}));
        let text = json_to_text(&value);
        assert_eq!(text_to_json(text.as_deref()), value);
    }
}
