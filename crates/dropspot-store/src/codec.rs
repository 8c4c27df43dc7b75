//! Column encodings shared by the per-table helpers.
//!
//! Timestamps are stored as fixed-width RFC-3339 UTC text with microsecond
//! precision, so SQL string comparison and `ORDER BY` follow chronological
//! order. Values handed to the store should be passed through [`normalize`]
//! first so that what callers hold equals what a later read returns.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use uuid::Uuid;

use dropspot_shared::{ClaimCode, UserId};

/// Drop sub-microsecond precision, which the column format cannot hold.
pub fn normalize(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(6)
}

pub fn encode_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_ts(col: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(col, Type::Text, Box::new(e)))
}

pub fn decode_uuid(col: usize, raw: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(col, Type::Text, Box::new(e)))
}

pub fn decode_user_id(col: usize, raw: &str) -> rusqlite::Result<UserId> {
    decode_uuid(col, raw).map(UserId)
}

pub fn decode_claim_code(col: usize, raw: String) -> rusqlite::Result<ClaimCode> {
    ClaimCode::try_from(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(col, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_encoded_timestamps_sort_chronologically() {
        let early = Utc.with_ymd_and_hms(2025, 1, 17, 14, 30, 0).unwrap();
        let later = early + chrono::Duration::microseconds(1);

        let a = encode_ts(&early);
        let b = encode_ts(&later);
        assert_eq!(a, "2025-01-17T14:30:00.000000Z");
        assert_eq!(a.len(), b.len());
        assert!(a < b);
    }

    #[test]
    fn test_normalized_timestamp_survives_round_trip() {
        let now = normalize(Utc::now());
        let decoded = decode_ts(0, &encode_ts(&now)).unwrap();
        assert_eq!(decoded, now);
    }
}
