//! Timestamp rendering with .NET-style custom date patterns.
//!
//! Output templates written for the original host use patterns such as
//! `yyyy-MM-dd HH:mm:ss.fff zzz`. They are interpreted directly against the
//! chrono date parts rather than translated to strftime, since strftime has
//! no equivalent for several of them (`ff`, `F`, `z`, `t`).

use std::fmt::Write as _;

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc};

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const DAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Round-trip pattern used for `o` and for JSON output.
pub const ROUND_TRIP_PATTERN: &str = "yyyy-MM-ddTHH:mm:ss.fffffffzzz";

/// Format `ts` with a standard (`o`, `s`, `u`) or custom pattern.
pub fn format_timestamp(ts: &DateTime<FixedOffset>, pattern: &str) -> String {
    match pattern {
        "o" | "O" => format_custom(ts, ROUND_TRIP_PATTERN),
        "s" => format_custom(ts, "yyyy-MM-ddTHH:mm:ss"),
        "u" => format_custom(&ts.with_timezone(&Utc).fixed_offset(), "yyyy-MM-dd HH:mm:ss'Z'"),
        _ => format_custom(ts, pattern),
    }
}

fn format_custom(ts: &DateTime<FixedOffset>, pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];

        match ch {
            '\'' | '"' => {
                i += 1;
                while i < chars.len() && chars[i] != ch {
                    out.push(chars[i]);
                    i += 1;
                }
                i += 1;
                continue;
            }
            '\\' => {
                if let Some(next) = chars.get(i + 1) {
                    out.push(*next);
                }
                i += 2;
                continue;
            }
            '%' => {
                // `%d` means the single-letter custom specifier `d`.
                i += 1;
                if let Some(next) = chars.get(i) {
                    write_part(&mut out, ts, *next, 1);
                    i += 1;
                }
                continue;
            }
            _ => {}
        }

        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == ch {
            run += 1;
        }
        write_part(&mut out, ts, ch, run);
        i += run;
    }
    out
}

fn write_part(out: &mut String, ts: &DateTime<FixedOffset>, ch: char, run: usize) {
    match ch {
        'y' => {
            let year = ts.year();
            if run <= 2 {
                let _ = write!(out, "{:0width$}", year.rem_euclid(100), width = run);
            } else {
                let _ = write!(out, "{:0width$}", year, width = run);
            }
        }
        'M' => match run {
            1 | 2 => pad(out, ts.month(), run),
            3 => out.push_str(&MONTHS[ts.month0() as usize][..3]),
            _ => out.push_str(MONTHS[ts.month0() as usize]),
        },
        'd' => match run {
            1 | 2 => pad(out, ts.day(), run),
            3 => out.push_str(&DAYS[ts.weekday().num_days_from_monday() as usize][..3]),
            _ => out.push_str(DAYS[ts.weekday().num_days_from_monday() as usize]),
        },
        'H' => pad(out, ts.hour(), run.min(2)),
        'h' => pad(out, ts.hour12().1, run.min(2)),
        'm' => pad(out, ts.minute(), run.min(2)),
        's' => pad(out, ts.second(), run.min(2)),
        'f' | 'F' => {
            let digits = run.min(9);
            let nanos = ts.nanosecond() % 1_000_000_000;
            let scaled = nanos / 10u32.pow(9 - digits as u32);
            let mut text = format!("{:0width$}", scaled, width = digits);
            if ch == 'F' {
                while text.ends_with('0') {
                    text.pop();
                }
            }
            out.push_str(&text);
        }
        't' => {
            let marker = if ts.hour12().0 { "PM" } else { "AM" };
            if run == 1 {
                out.push_str(&marker[..1]);
            } else {
                out.push_str(marker);
            }
        }
        'z' | 'K' => {
            let secs = ts.offset().local_minus_utc();
            let sign = if secs < 0 { '-' } else { '+' };
            let hours = secs.abs() / 3600;
            let minutes = (secs.abs() % 3600) / 60;
            match (ch, run) {
                ('z', 1) => {
                    let _ = write!(out, "{}{}", sign, hours);
                }
                ('z', 2) => {
                    let _ = write!(out, "{}{:02}", sign, hours);
                }
                _ => {
                    let _ = write!(out, "{}{:02}:{:02}", sign, hours, minutes);
                }
            }
        }
        other => {
            for _ in 0..run {
                out.push(other);
            }
        }
    }
}

fn pad(out: &mut String, n: u32, width: usize) {
    let _ = write!(out, "{:0width$}", n, width = width);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 7, 14, 5, 9)
            .unwrap()
            + chrono::Duration::microseconds(123_450)
    }

    #[test]
    fn test_original_host_pattern() {
        assert_eq!(
            format_timestamp(&sample(), "yyyy-MM-dd HH:mm:ss.fff"),
            "2024-03-07 14:05:09.123"
        );
    }

    #[test]
    fn test_round_trip() {
        assert_eq!(
            format_timestamp(&sample(), "o"),
            "2024-03-07T14:05:09.1234500+02:00"
        );
    }

    #[test]
    fn test_names_twelve_hour_and_offsets() {
        let ts = sample();
        assert_eq!(format_timestamp(&ts, "ddd, dd MMM yyyy"), "Thu, 07 Mar 2024");
        assert_eq!(format_timestamp(&ts, "dddd MMMM"), "Thursday March");
        assert_eq!(format_timestamp(&ts, "h:mm tt"), "2:05 PM");
        assert_eq!(format_timestamp(&ts, "z zz zzz"), "+2 +02 +02:00");
    }

    #[test]
    fn test_quoted_literals_and_escapes() {
        let ts = sample();
        assert_eq!(format_timestamp(&ts, "'day' d"), "day 7");
        assert_eq!(format_timestamp(&ts, "\\d%d"), "d7");
        assert_eq!(format_timestamp(&ts, "HH:mm:ss.FFFFFF"), "14:05:09.12345");
    }

    #[test]
    fn test_universal_sortable() {
        assert_eq!(format_timestamp(&sample(), "u"), "2024-03-07 12:05:09Z");
        assert_eq!(format_timestamp(&sample(), "s"), "2024-03-07T14:05:09");
    }
}
