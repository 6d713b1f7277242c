pub mod scan_interval;

/// Current UTC time without offset, matching the `TIMESTAMP` columns.
pub fn utc_now() -> time::PrimitiveDateTime {
    let now = time::OffsetDateTime::now_utc();
    time::PrimitiveDateTime::new(now.date(), now.time())
}

/// Unix seconds of a stored `TIMESTAMP`.
pub fn unix_timestamp(at: time::PrimitiveDateTime) -> i64 {
    at.assume_utc().unix_timestamp()
}

/// Inverse of [`unix_timestamp`].
pub fn from_unix_timestamp(seconds: i64) -> Option<time::PrimitiveDateTime> {
    let at = time::OffsetDateTime::from_unix_timestamp(seconds).ok()?;
    Some(time::PrimitiveDateTime::new(at.date(), at.time()))
}
