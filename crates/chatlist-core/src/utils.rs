use chrono::{DateTime, Utc};

// ============== Timestamp Helpers ==============

/// Storage format for every timestamp column (UTC, comparable with SQLite `datetime()`).
pub const SQL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current UTC time in storage format.
pub fn sql_timestamp_now() -> String {
    sql_timestamp(Utc::now())
}

pub fn sql_timestamp(at: DateTime<Utc>) -> String {
    at.format(SQL_TIMESTAMP_FORMAT).to_string()
}

/// RFC3339 timestamp in UTC (for logs/exports).
pub fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_timestamp_has_sqlite_shape() {
        let at = DateTime::<Utc>::from_timestamp(1_767_225_600, 0).unwrap();
        assert_eq!(sql_timestamp(at), "2026-01-01 00:00:00");
        assert_eq!(sql_timestamp_now().len(), 19);
    }
}
