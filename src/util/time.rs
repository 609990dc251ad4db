use std::{fmt::Display, time::Instant};

use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone, Utc};

use crate::util::logging::{self, LogLevel};

pub struct DateTimeUtils;

impl DateTimeUtils {
    pub fn now_epoch_ms() -> i64 {
        Utc::now().timestamp_millis()
    }

    pub fn epoch_ms_to_str(epoch_ms: i64) -> String {
        match DateTime::<Utc>::from_timestamp_millis(epoch_ms) {
            Some(datetime) => datetime
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            None => format!("{epoch_ms}ms"),
        }
    }

    /// Local wall-clock `hour:00:00` on the day `days_back` days before `today`, in epoch ms.
    pub fn day_start_epoch_ms<Tz: TimeZone>(today: &DateTime<Tz>, days_back: i64, hour: u32) -> i64 {
        let date = today.date_naive() - Duration::days(days_back);
        let time = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
        let naive = date.and_time(time);

        // DST gaps have no local mapping; fall back to reading the wall clock as UTC
        match today.timezone().from_local_datetime(&naive).earliest() {
            Some(start) => start.timestamp_millis(),
            None => naive.and_utc().timestamp_millis(),
        }
    }
}

pub struct Benchmark {
    time: Instant,
    label: String,
}

impl Benchmark {
    const CC: &'static str = "Benchmark";

    pub fn start(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            time: Instant::now(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for Benchmark {
    fn drop(&mut self) {
        if logging::is_enabled(Self::CC) && logging::is_at_level(Self::CC, LogLevel::VERBOSE) {
            println!("{}: {}", self.label, self);
        }
    }
}

impl Display for Benchmark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let duration = self.time.elapsed();

        if duration.as_secs() > 60 {
            write!(f, "{:0>2}:{:0>2}min", duration.as_secs() / 60, duration.as_secs() % 60)
        } else {
            write!(f, "{}ms", duration.as_millis())
        }
    }
}

#[cfg(test)]
mod test {
    use chrono::{FixedOffset, Timelike};

    use super::*;

    #[test]
    fn day_start_goes_back_whole_days() {
        let cst = FixedOffset::east_opt(8 * 3600).unwrap();
        let today = cst.with_ymd_and_hms(2024, 3, 10, 21, 45, 12).unwrap();

        let yesterday = DateTimeUtils::day_start_epoch_ms(&today, 1, 8);
        let expected = cst.with_ymd_and_hms(2024, 3, 9, 8, 0, 0).unwrap();
        assert_eq!(yesterday, expected.timestamp_millis());

        let three_back = DateTimeUtils::day_start_epoch_ms(&today, 3, 8);
        assert_eq!(yesterday - three_back, 2 * 24 * 3600 * 1000);
    }

    #[test]
    fn day_start_clamps_hour() {
        let utc = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let ms = DateTimeUtils::day_start_epoch_ms(&utc, 1, 99);
        let start = DateTime::<Utc>::from_timestamp_millis(ms).unwrap();

        assert_eq!(start.hour(), 23);
    }

    #[test]
    fn benchmark_formats_millis() {
        let bench = Benchmark::start("generate");
        assert_eq!(bench.label(), "generate");
        assert!(bench.to_string().ends_with("ms"));
    }
}
