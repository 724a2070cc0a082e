//! IST wall-clock and trading-calendar predicates (spec §4.1).
//!
//! Every timestamp that escapes this process is normalised to IST before
//! it is persisted, published, or compared; this crate is the single place
//! that knows the offset.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike, Weekday};
use chrono_tz::Asia::Kolkata;
use chrono_tz::Tz;
use kernel_common::constants::{EOD_FORCE_EXIT_HHMM, MARKET_CLOSE_HHMM, MARKET_OPEN_HHMM};
use kernel_common::instrument::Underlying;

pub const IST: Tz = Kolkata;

/// Current instant, expressed in IST. Thin wrapper so call sites never
/// reach for `Utc::now()` directly and drift the timezone convention.
#[must_use]
pub fn now_ist() -> DateTime<Tz> {
    chrono::Utc::now().with_timezone(&IST)
}

/// Monday through Friday. Exchange holiday calendars are out of scope
/// (spec Non-goals) — callers that need holiday awareness supply their
/// own list and combine it with this predicate.
#[must_use]
pub fn is_trading_day(d: NaiveDate) -> bool {
    !matches!(d.weekday(), Weekday::Sat | Weekday::Sun)
}

/// 09:15–15:30 IST, inclusive of both bounds.
#[must_use]
pub fn is_market_hours(t: DateTime<Tz>) -> bool {
    let (open_h, open_m) = MARKET_OPEN_HHMM;
    let (close_h, close_m) = MARKET_CLOSE_HHMM;
    let minutes = t.hour() * 60 + t.minute();
    let open = open_h * 60 + open_m;
    let close = close_h * 60 + close_m;
    minutes >= open && minutes <= close
}

/// True from 15:29 IST onward; the trading loop treats this as a forced
/// exit signal for every still-open position (spec §4.9).
#[must_use]
pub fn should_force_eod_exit(t: DateTime<Tz>) -> bool {
    let (h, m) = EOD_FORCE_EXIT_HHMM;
    t.hour() * 60 + t.minute() >= h * 60 + m
}

/// The next date on or after `today` that falls on `underlying`'s expiry
/// weekday, at IST market close (15:30).
#[must_use]
pub fn current_weekly_expiry(underlying: Underlying, today: NaiveDate) -> DateTime<Tz> {
    let target = underlying.expiry_weekday();
    let mut d = today;
    while d.weekday() != target {
        d = d.succ_opt().expect("NaiveDate overflow before reaching expiry weekday");
    }
    let (close_h, close_m) = MARKET_CLOSE_HHMM;
    IST.with_ymd_and_hms(d.year(), d.month(), d.day(), close_h, close_m, 0)
        .single()
        .expect("market close is an unambiguous local time")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(2026, 7, 25, false)] // Saturday
    #[case(2026, 7, 26, false)] // Sunday
    #[case(2026, 7, 27, true)] // Monday
    fn weekend_is_not_a_trading_day(#[case] y: i32, #[case] m: u32, #[case] d: u32, #[case] expected: bool) {
        let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(is_trading_day(date), expected);
    }

    #[rstest]
    #[case(9, 14, false)]
    #[case(9, 15, true)]
    #[case(15, 30, true)]
    #[case(15, 31, false)]
    fn market_hours_bounds_are_inclusive(#[case] h: u32, #[case] m: u32, #[case] expected: bool) {
        let t = IST.with_ymd_and_hms(2026, 7, 28, h, m, 0).unwrap();
        assert_eq!(is_market_hours(t), expected);
    }

    #[test]
    fn force_eod_exit_triggers_at_fifteen_twenty_nine() {
        let before = IST.with_ymd_and_hms(2026, 7, 28, 15, 28, 59).unwrap();
        let after = IST.with_ymd_and_hms(2026, 7, 28, 15, 29, 0).unwrap();
        assert!(!should_force_eod_exit(before));
        assert!(should_force_eod_exit(after));
    }

    #[test]
    fn nifty_expires_on_tuesday() {
        // 2026-07-28 is a Tuesday.
        let today = NaiveDate::from_ymd_opt(2026, 7, 28).unwrap();
        let expiry = current_weekly_expiry(Underlying::Nifty, today);
        assert_eq!(expiry.weekday(), Weekday::Tue);
        assert_eq!(expiry.date_naive(), today);
    }

    #[test]
    fn expiry_rolls_forward_when_today_is_past_the_weekday() {
        // 2026-07-30 is a Thursday; BANKNIFTY expires Wednesday, so it must
        // roll to the following week rather than returning a past date.
        let today = NaiveDate::from_ymd_opt(2026, 7, 30).unwrap();
        let expiry = current_weekly_expiry(Underlying::BankNifty, today);
        assert!(expiry.date_naive() >= today);
        assert_eq!(expiry.weekday(), Weekday::Wed);
    }
}
