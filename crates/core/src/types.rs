use chrono::SubsecRound;

/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Calendar dates (period bounds, export ranges) are UTC dates.
pub type Date = chrono::NaiveDate;

/// Truncate a timestamp to the microsecond precision PostgreSQL stores.
///
/// Every timestamp must pass through this before it is hashed or written,
/// otherwise a value read back from `TIMESTAMPTZ` would fingerprint
/// differently from the one that was inserted.
pub fn to_storage_precision(ts: Timestamp) -> Timestamp {
    ts.trunc_subsecs(6)
}
