use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Wall-clock instant as transmitted on the wire: seconds and nanoseconds
/// since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl From<NaiveDateTime> for Timestamp {
    fn from(dt: NaiveDateTime) -> Self {
        let utc = dt.and_utc();
        Self {
            seconds: utc.timestamp(),
            nanos: utc.timestamp_subsec_nanos() as i32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    #[test]
    fn converts_epoch() {
        let dt = NaiveDate::from_ymd_opt(1970, 1, 1)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(0, 0, 0).unwrap());
        let ts = Timestamp::from(dt);
        assert_eq!(ts.seconds, 0);
        assert_eq!(ts.nanos, 0);
    }

    #[test]
    fn carries_subsecond_precision() {
        let dt = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_time(NaiveTime::from_hms_nano_opt(12, 30, 45, 123_456_789).unwrap());
        let ts = Timestamp::from(dt);
        assert_eq!(ts.seconds, dt.and_utc().timestamp());
        assert_eq!(ts.nanos, 123_456_789);
    }
}
