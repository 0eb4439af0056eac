//! America/Asuncion wall clock (§9 — explicit offset, not system time zone).
//!
//! Paraguay has observed a fixed UTC−3 offset with no daylight saving since
//! 2013; we still resolve through `chrono-tz`'s IANA database rather than a
//! hand-rolled `FixedOffset` so a future tzdata change (should Paraguay ever
//! reintroduce DST) is picked up by a dependency bump, not a code change.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::America::Asuncion;

/// The current instant, expressed as a naive local timestamp in
/// America/Asuncion.
pub fn now_local() -> NaiveDateTime {
    Utc::now().with_timezone(&Asuncion).naive_local()
}

/// Interpret `naive` as a local America/Asuncion timestamp and return the
/// elapsed wall-clock duration since it, relative to now. Negative when
/// `naive` is in the future.
pub fn elapsed_since(naive: NaiveDateTime) -> chrono::Duration {
    let as_utc = naive_local_to_utc(naive);
    Utc::now().signed_duration_since(as_utc)
}

fn naive_local_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    Asuncion
        .from_local_datetime(&naive)
        .single()
        .unwrap_or_else(|| Asuncion.from_utc_datetime(&naive))
        .with_timezone(&Utc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn past_timestamp_has_positive_elapsed() {
        let past = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert!(elapsed_since(past) > chrono::Duration::zero());
    }

    #[test]
    fn future_timestamp_has_negative_elapsed() {
        let future = now_local() + chrono::Duration::days(3650);
        assert!(elapsed_since(future) < chrono::Duration::zero());
    }
}
