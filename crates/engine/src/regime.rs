use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};

use common::MarketRegime;

/// Reference exchange timezone for the peak-hours window, as a fixed
/// offset from UTC.
const EXCHANGE_OFFSET_HOURS: i32 = -4;

/// Classify market timing from the clock alone.
///
/// Precedence: LowVol > HighVol > Peak > Normal. The high-volatility
/// window overlaps exchange hours, so it must win over Peak to ever be
/// observable.
pub fn classify(now: DateTime<Utc>) -> MarketRegime {
    if is_low_volatility(now) {
        return MarketRegime::LowVol;
    }
    if is_high_volatility(now) {
        return MarketRegime::HighVol;
    }
    if is_peak_hours(now) {
        return MarketRegime::Peak;
    }
    MarketRegime::Normal
}

/// Peak liquidity: 08:00–16:00 exchange-local.
fn is_peak_hours(now: DateTime<Utc>) -> bool {
    let local_hour = (now.hour() as i32 + EXCHANGE_OFFSET_HOURS).rem_euclid(24);
    (8..16).contains(&local_hour)
}

/// Monday 08:00–10:00 UTC: the post-weekend liquidity trough.
fn is_low_volatility(now: DateTime<Utc>) -> bool {
    now.weekday() == Weekday::Mon && (8..10).contains(&now.hour())
}

/// Wednesday 16:00 UTC hour: the recurring macro-release window.
fn is_high_volatility(now: DateTime<Utc>) -> bool {
    now.weekday() == Weekday::Wed && now.hour() == 16
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
    }

    #[test]
    fn monday_morning_utc_is_low_vol() {
        // 2024-01-01 was a Monday
        assert_eq!(classify(at(2024, 1, 1, 8, 0)), MarketRegime::LowVol);
        assert_eq!(classify(at(2024, 1, 1, 9, 59)), MarketRegime::LowVol);
        // Window closes at 10:00; 10:00 UTC is 06:00 local, pre-peak
        assert_eq!(classify(at(2024, 1, 1, 10, 0)), MarketRegime::Normal);
    }

    #[test]
    fn wednesday_sixteen_utc_is_high_vol() {
        // 2024-01-03 was a Wednesday; 16:00 UTC falls inside exchange
        // hours, and HighVol takes precedence
        assert_eq!(classify(at(2024, 1, 3, 16, 0)), MarketRegime::HighVol);
        assert_eq!(classify(at(2024, 1, 3, 16, 59)), MarketRegime::HighVol);
        assert_eq!(classify(at(2024, 1, 3, 17, 0)), MarketRegime::Peak);
    }

    #[test]
    fn exchange_hours_are_peak() {
        // Tuesday 14:00 UTC = 10:00 exchange-local
        assert_eq!(classify(at(2024, 1, 2, 14, 0)), MarketRegime::Peak);
        // 12:00 UTC = 08:00 local, the window opens
        assert_eq!(classify(at(2024, 1, 2, 12, 0)), MarketRegime::Peak);
        // 20:00 UTC = 16:00 local, the window has closed
        assert_eq!(classify(at(2024, 1, 2, 20, 0)), MarketRegime::Normal);
    }

    #[test]
    fn overnight_is_normal() {
        // Saturday 02:00 UTC = Friday 22:00 local
        assert_eq!(classify(at(2024, 1, 6, 2, 0)), MarketRegime::Normal);
    }
}
