//! ISO-8601 <-> epoch-second conversions (peripheral plumbing per §6/§9).
//!
//! Accepts, in order: the literal `now` (current wall-clock time), a bare
//! decimal Unix timestamp, an ISO-8601 date (`YYYY-MM-DD`), or an ISO-8601
//! date-time (`YYYY-MM-DDTHH:MM:SS`) — mirroring the original's `sscantime`,
//! which tries `strptime` with a datetime format, then a date-only format,
//! then falls back to a raw integer.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::model::Ts;

const SECS_PER_DAY: i64 = 86_400;

/// Days since the Unix epoch for a given proleptic-Gregorian (y, m, d).
/// Based on Howard Hinnant's `days_from_civil` algorithm (public domain).
fn days_from_civil(y: i64, m: u32, d: u32) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as i64; // [0, 399]
    let mp = ((m as i64 + 9) % 12) as i64; // [0, 11] -> Mar=0 .. Feb=11
    let doy = (153 * mp + 2) / 5 + d as i64 - 1; // [0, 365]
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy; // [0, 146096]
    era * 146097 + doe - 719468
}

fn parse_date(s: &str) -> Option<(i64, u32, u32)> {
    let (y, rest) = s.split_once('-')?;
    let (m, d) = rest.split_once('-')?;
    Some((y.parse().ok()?, m.parse().ok()?, d.parse().ok()?))
}

/// Parse `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM:SS` into Unix seconds (UTC).
fn parse_iso8601(s: &str) -> Option<Ts> {
    let (date_part, time_part) = match s.split_once('T') {
        Some((d, t)) => (d, Some(t)),
        None => (s, None),
    };
    let (y, m, d) = parse_date(date_part)?;
    if !(1..=12).contains(&m) || !(1..=31).contains(&d) {
        return None;
    }
    let days = days_from_civil(y, m, d);

    let secs_of_day = match time_part {
        None => 0,
        Some(t) => {
            let mut it = t.splitn(3, ':');
            let h: i64 = it.next()?.parse().ok()?;
            let mi: i64 = it.next()?.parse().ok()?;
            let s: i64 = it.next().unwrap_or("0").parse().ok()?;
            if !(0..24).contains(&h) || !(0..60).contains(&mi) || !(0..60).contains(&s) {
                return None;
            }
            h * 3600 + mi * 60 + s
        }
    };

    Some(days * SECS_PER_DAY + secs_of_day)
}

fn current_unix_time() -> Ts {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as Ts)
        .unwrap_or(0)
}

/// Parse a timestamp token into Unix seconds: `now`, a bare integer, or an
/// ISO-8601 date/date-time. Returns `None` for anything else (the caller
/// drops the whole record, per §7).
pub fn parse_ts(token: &str) -> Option<Ts> {
    if token == "now" {
        return Some(current_unix_time());
    }
    if let Ok(v) = token.parse::<Ts>() {
        return Some(v);
    }
    parse_iso8601(token)
}

/// Render a Unix timestamp back to ISO-8601, for debugging/round-trip use.
/// Sentinels render as `-inf`/`inf`. Time-of-day is omitted when it's
/// midnight, matching the original `printtime`.
pub fn format_ts(ts: Ts) -> String {
    use crate::model::{TS_MAX, TS_MIN};
    if ts == TS_MIN {
        return "-inf".to_string();
    }
    if ts == TS_MAX {
        return "inf".to_string();
    }

    let mut days = ts.div_euclid(SECS_PER_DAY);
    let mut secs_of_day = ts.rem_euclid(SECS_PER_DAY);
    if secs_of_day < 0 {
        secs_of_day += SECS_PER_DAY;
        days -= 1;
    }

    // Inverse of days_from_civil (Hinnant's civil_from_days).
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = z - era * 146097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let y = if m <= 2 { y + 1 } else { y };

    let h = secs_of_day / 3600;
    let mi = (secs_of_day % 3600) / 60;
    let s = secs_of_day % 60;

    if h == 0 && mi == 0 && s == 0 {
        format!("{y:04}-{m:02}-{d:02}")
    } else {
        format!("{y:04}-{m:02}-{d:02}T{h:02}:{mi:02}:{s:02}")
    }
}
