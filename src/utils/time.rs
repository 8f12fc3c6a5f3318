use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone, Timelike, Weekday};

use crate::model::attendance::AttendanceStatus;

/// Check-ins strictly after 09:30:00 local time are late.
const LATE_AFTER_SECS: u32 = 9 * 3600 + 30 * 60;

/// Source of "now" for the attendance lifecycle.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// `YYYY-MM-DD` in the instant's own time zone. Used as the per-day uniqueness key.
pub fn format_date<Tz: TimeZone>(instant: &DateTime<Tz>) -> String {
    instant.date_naive().format("%Y-%m-%d").to_string()
}

/// `HH:MM:SS`, 24-hour clock.
pub fn format_time<Tz: TimeZone>(instant: &DateTime<Tz>) -> String {
    instant.time().format("%H:%M:%S").to_string()
}

/// Hours between check-in and check-out, rounded to 2 decimals.
///
/// A check-out earlier than the check-in (clock skew) yields 0 rather than a negative value.
pub fn calculate_working_hours<Tz: TimeZone>(check_in: &DateTime<Tz>, check_out: &DateTime<Tz>) -> f64 {
    let millis = check_out
        .clone()
        .signed_duration_since(check_in.clone())
        .num_milliseconds()
        .max(0);

    let hours = millis as f64 / (1000.0 * 60.0 * 60.0);
    (hours * 100.0).round() / 100.0
}

pub fn derive_attendance_status<Tz: TimeZone>(check_in: &DateTime<Tz>) -> AttendanceStatus {
    let time = check_in.time();
    let secs = time.num_seconds_from_midnight();

    if secs > LATE_AFTER_SECS || (secs == LATE_AFTER_SECS && time.nanosecond() > 0) {
        AttendanceStatus::Late
    } else {
        AttendanceStatus::Present
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Parses a strict `YYYY-MM` month filter into the first day of that month.
pub fn parse_month(month: &str) -> Option<NaiveDate> {
    let bytes = month.as_bytes();
    if bytes.len() != 7 || bytes[4] != b'-' {
        return None;
    }
    if !bytes[..4].iter().chain(&bytes[5..]).all(u8::is_ascii_digit) {
        return None;
    }

    let year: i32 = month[..4].parse().ok()?;
    let month: u32 = month[5..].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(0)
}

#[cfg(test)]
pub mod testing {
    use super::Clock;
    use chrono::{DateTime, Duration, Local, TimeZone};
    use std::sync::Mutex;

    /// Clock pinned to a local wall-clock time; tests move it explicitly.
    pub struct FixedClock(Mutex<DateTime<Local>>);

    impl FixedClock {
        pub fn at(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
            Self(Mutex::new(local(year, month, day, hour, min, sec)))
        }

        pub fn set(&self, year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) {
            *self.0.lock().unwrap() = local(year, month, day, hour, min, sec);
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Local> {
            *self.0.lock().unwrap()
        }
    }

    pub fn local(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(year, month, day, hour, min, sec)
            .earliest()
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset, Utc};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, h, m, s).unwrap()
    }

    #[test]
    fn format_date_is_zero_padded() {
        let instant = Utc.with_ymd_and_hms(2026, 3, 7, 23, 59, 59).unwrap();
        assert_eq!(format_date(&instant), "2026-03-07");
        assert_eq!(format_time(&instant), "23:59:59");
    }

    #[test]
    fn format_date_uses_the_instant_offset() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let instant = Utc
            .with_ymd_and_hms(2026, 1, 31, 23, 30, 0)
            .unwrap()
            .with_timezone(&plus_two);
        assert_eq!(format_date(&instant), "2026-02-01");
    }

    #[test]
    fn full_day_with_half_hour() {
        assert_eq!(calculate_working_hours(&at(9, 0, 0), &at(17, 30, 0)), 8.5);
    }

    #[test]
    fn working_hours_round_to_two_decimals() {
        // 1h 20m = 1.333.. hours
        assert_eq!(calculate_working_hours(&at(9, 0, 0), &at(10, 20, 0)), 1.33);
        // 10 minutes = 0.1666.. hours
        assert_eq!(calculate_working_hours(&at(9, 0, 0), &at(9, 10, 0)), 0.17);
        assert_eq!(calculate_working_hours(&at(9, 0, 0), &at(9, 0, 0)), 0.0);
    }

    #[test]
    fn checkout_before_checkin_clamps_to_zero() {
        assert_eq!(calculate_working_hours(&at(17, 0, 0), &at(9, 0, 0)), 0.0);
    }

    #[test]
    fn working_hours_never_decrease_as_checkout_moves_later() {
        let check_in = at(8, 0, 0);
        let mut previous = 0.0;
        for minutes in (0..=12 * 60).step_by(7) {
            let hours = calculate_working_hours(&check_in, &(check_in + Duration::minutes(minutes)));
            assert!(hours >= 0.0);
            assert!(hours >= previous, "{hours} < {previous} at {minutes}m");
            previous = hours;
        }
    }

    #[test]
    fn half_past_nine_is_the_last_on_time_second() {
        assert_eq!(derive_attendance_status(&at(9, 30, 0)), AttendanceStatus::Present);
        assert_eq!(derive_attendance_status(&at(9, 30, 1)), AttendanceStatus::Late);
        assert_eq!(derive_attendance_status(&at(8, 0, 0)), AttendanceStatus::Present);
        assert_eq!(derive_attendance_status(&at(14, 0, 0)), AttendanceStatus::Late);
    }

    #[test]
    fn sub_second_past_cutoff_is_late() {
        let instant = at(9, 30, 0) + Duration::milliseconds(250);
        assert_eq!(derive_attendance_status(&instant), AttendanceStatus::Late);
    }

    #[test]
    fn weekend_detection() {
        // 2026-01-17 is a Saturday
        let saturday = NaiveDate::from_ymd_opt(2026, 1, 17).unwrap();
        assert!(is_weekend(saturday));
        assert!(is_weekend(saturday.succ_opt().unwrap()));
        assert!(!is_weekend(NaiveDate::from_ymd_opt(2026, 1, 19).unwrap()));
        assert!(!is_weekend(NaiveDate::from_ymd_opt(2026, 1, 16).unwrap()));
    }

    #[test]
    fn month_filter_parsing() {
        assert_eq!(parse_month("2026-01"), NaiveDate::from_ymd_opt(2026, 1, 1));
        assert_eq!(parse_month("2025-12"), NaiveDate::from_ymd_opt(2025, 12, 1));
        assert_eq!(parse_month("2026-13"), None);
        assert_eq!(parse_month("2026-1"), None);
        assert_eq!(parse_month("2026/01"), None);
        assert_eq!(parse_month("2026-01-01"), None);
        assert_eq!(parse_month("20a6-01"), None);
        assert_eq!(parse_month(""), None);
    }

    #[test]
    fn month_lengths() {
        assert_eq!(days_in_month(2026, 1), 31);
        assert_eq!(days_in_month(2026, 2), 28);
        assert_eq!(days_in_month(2028, 2), 29);
        assert_eq!(days_in_month(2026, 4), 30);
        assert_eq!(days_in_month(2026, 12), 31);
    }
}
