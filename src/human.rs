//! Human-readable renderings of times, dates and quantities.
//!
//! Dates are seconds since the J2000 epoch (2000-01-01 12:00). Kerbal
//! clocks run on six-hour days and 426-day years.

use chrono::{Duration, NaiveDate, NaiveDateTime};

fn j2000() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 1, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

/// Convert a timespan in seconds into a human-readable format, like
/// `3 days, 4:05:06.7`.
pub fn to_human_time(seconds: f64) -> String {
    let sign = if seconds < 0.0 { "-" } else { "" };
    let mut seconds = seconds.abs();

    let mut div_mod = |divisor: f64| {
        let quotient = (seconds / divisor).floor();
        seconds -= quotient * divisor;
        quotient
    };
    let days = div_mod(86_400.0);
    let hours = div_mod(3_600.0);
    let minutes = div_mod(60.0);

    let day_part = match days {
        d if d == 0.0 => String::new(),
        d if d == 1.0 => "1 day, ".to_owned(),
        d => format!("{} days, ", d),
    };

    if seconds == seconds.floor() {
        format!("{}{}{}:{:02}:{:02}", sign, day_part, hours, minutes, seconds)
    } else {
        format!("{}{}{}:{:02}:{:04.1}", sign, day_part, hours, minutes, seconds)
    }
}

/// Convert a timespan in a human-readable format into seconds.
///
/// Accepts what [to_human_time] produces: an optional day count, then
/// `H:MM:SS` with an optional fraction. `None` when the string does not
/// parse.
pub fn from_human_time(formatted_time: &str) -> Option<f64> {
    let negative = formatted_time.starts_with('-');
    let unsigned = formatted_time.trim_start_matches('-');

    let (days, clock) = match unsigned.split_once(", ") {
        Some((day_part, clock)) => {
            let count = day_part
                .strip_suffix(" days")
                .or_else(|| day_part.strip_suffix(" day"))?;
            (count.trim().parse::<f64>().ok()?, clock)
        }
        None => (0.0, unsigned),
    };

    let mut seconds = 0.0;
    for field in clock.split(':') {
        seconds = seconds * 60.0 + field.trim().parse::<f64>().ok()?;
    }
    seconds += days * 86_400.0;

    Some(if negative { -seconds } else { seconds })
}

/// Convert a date from seconds since J2000 into a human-readable format,
/// like `2007-04-05 14:30:00`.
pub fn to_human_date(seconds: f64) -> String {
    let microseconds = (seconds * 1e6).round() as i64;
    let whole = microseconds.div_euclid(1_000_000);
    let fraction = microseconds.rem_euclid(1_000_000);

    let date = j2000() + Duration::seconds(whole);
    let mut formatted = date.format("%Y-%m-%d %H:%M:%S").to_string();
    if fraction != 0 {
        formatted.push_str(&format!(".{:06}", fraction));
    }
    formatted
}

/// Convert a date from a human-readable format into seconds since J2000.
/// `None` when the string does not parse.
pub fn from_human_date(formatted_date: &str) -> Option<f64> {
    let (truncated, fraction) = match formatted_date.split_once('.') {
        Some((whole, fraction)) => (whole, format!("0.{}", fraction).parse::<f64>().ok()?),
        None => (formatted_date, 0.0),
    };

    let date = NaiveDateTime::parse_from_str(truncated, "%Y-%m-%d %H:%M:%S").ok()?;
    let seconds = (date - j2000()).num_seconds() as f64;
    Some(seconds + fraction)
}

/// Convert a timespan in seconds into a kerbal-readable format, like
/// `+1y, 23d, 3:04:05.6`.
pub fn to_kerbal_time(seconds: f64) -> String {
    let sign = if seconds < 0.0 { "-" } else { "+" };
    let mut seconds = seconds.abs();

    let mut div_mod = |divisor: f64| {
        let quotient = (seconds / divisor).floor();
        seconds -= quotient * divisor;
        quotient
    };
    // six-hour days, 426-day years
    let years = div_mod(426.0 * 6.0 * 3_600.0);
    let days = div_mod(6.0 * 3_600.0);
    let hours = div_mod(3_600.0);
    let minutes = div_mod(60.0);

    format!(
        "{}{}y, {}d, {}:{:02}:{:04.1}",
        sign, years, days, hours, minutes, seconds
    )
}

/// Convert a timespan from a kerbal-readable format to seconds. `None`
/// when the string does not parse.
pub fn from_kerbal_time(formatted_time: &str) -> Option<f64> {
    let negative = formatted_time.starts_with('-');
    let unsigned = formatted_time.trim_start_matches(['+', '-']);

    let mut seconds = 0.0;
    for token in unsigned.split(", ") {
        if let Some(years) = token.strip_suffix('y') {
            seconds += years.trim().parse::<f64>().ok()? * 426.0 * 6.0 * 3_600.0;
        } else if let Some(days) = token.strip_suffix('d') {
            seconds += days.trim().parse::<f64>().ok()? * 6.0 * 3_600.0;
        } else {
            let mut value = 0.0;
            for field in token.split(':') {
                value = value * 60.0 + field.trim().parse::<f64>().ok()?;
            }
            seconds += value;
        }
    }

    Some(if negative { -seconds } else { seconds })
}

/// Format a quantity with an SI prefix, like `1.34 Mm`.
pub fn to_si_prefix(value: f64, unit: &str) -> String {
    const PREFIXES: [&str; 7] = ["", "k", "M", "G", "T", "P", "E"];

    let mut scaled = value;
    let mut index = 0;
    while scaled.abs() >= 1000.0 && index < PREFIXES.len() - 1 {
        scaled /= 1000.0;
        index += 1;
    }
    format!("{:.4} {}{}", scaled, PREFIXES[index], unit)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_human_time() {
        assert_eq!(to_human_time(100.0), "0:01:40");
        assert_eq!(to_human_time(86_401.0), "1 day, 0:00:01");
        assert_eq!(to_human_time(2.0 * 86_400.0 + 3_723.4), "2 days, 1:02:03.4");
        assert_eq!(to_human_time(-100.0), "-0:01:40");

        for &span in &[0.0, 100.0, 3_599.9, 86_401.0, 2.5e7, -90_000.0] {
            let parsed = from_human_time(&to_human_time(span)).unwrap();
            assert_relative_eq!(parsed, span, epsilon = 0.1);
        }
        assert_eq!(from_human_time("not a time"), None);
    }

    #[test]
    fn test_human_date() {
        // J2000 itself
        assert_eq!(to_human_date(0.0), "2000-01-01 12:00:00");
        assert_eq!(from_human_date("2000-01-01 12:00:00").unwrap(), 0.0);

        // a day later, with a fraction
        assert_eq!(to_human_date(86_400.5), "2000-01-02 12:00:00.500000");

        for &date in &[0.0, 1.0, 86_400.5, 2.2e8, -3.1e7] {
            let parsed = from_human_date(&to_human_date(date)).unwrap();
            assert_relative_eq!(parsed, date, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_kerbal_time() {
        // a kerbal year is 426 six-hour days
        let year = 426.0 * 6.0 * 3_600.0;
        assert_eq!(to_kerbal_time(0.0), "+0y, 0d, 0:00:00.0");
        assert_eq!(to_kerbal_time(year + 6.0 * 3_600.0 + 61.5), "+1y, 1d, 0:01:01.5");

        for &span in &[0.0, 61.5, year * 3.25, -year] {
            let parsed = from_kerbal_time(&to_kerbal_time(span)).unwrap();
            assert_relative_eq!(parsed, span, epsilon = 0.1);
        }
    }

    #[test]
    fn test_si_prefix() {
        assert_eq!(to_si_prefix(1_340_000.0, "m"), "1.3400 Mm");
        assert_eq!(to_si_prefix(700.0, "m"), "700.0000 m");
        assert_eq!(to_si_prefix(-8.4e9, "m"), "-8.4000 Gm");
    }
}
