//! Human-readable durations, times and status lines, plus duration parsing.

use chrono::{DateTime, Duration, Local, TimeZone, Timelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{CoffeeError, Result};
use crate::schedule::TimeOfDay;
use crate::types::{CaffeinationInfo, CaffeinationKind};

/// `1h30m`, `45m`, `2h`, `90s`, `1d 2h`; units in descending order.
static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(\d+)d)?(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s)?$").expect("duration pattern")
});

const UNITS: [(&str, u64); 4] = [("d", 86_400), ("h", 3_600), ("m", 60), ("s", 1)];

/// "1d 2h 3m 4s" with zero units left out.
pub fn format_duration(secs: u64) -> String {
    if secs == 0 {
        return "0s".to_string();
    }
    let mut rest = secs;
    let mut parts = Vec::new();
    for (label, size) in UNITS {
        let amount = rest / size;
        rest %= size;
        if amount > 0 {
            parts.push(format!("{}{}", amount, label));
        }
    }
    parts.join(" ")
}

pub fn format_time_remaining(end: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let remaining = end.signed_duration_since(now).num_seconds().max(0);
    if remaining == 0 {
        return "ending soon".to_string();
    }
    let hours = remaining / 3600;
    let minutes = (remaining % 3600) / 60;
    if hours > 0 {
        format!("{}h {}m remaining", hours, minutes)
    } else if minutes > 0 {
        format!("{}m remaining", minutes)
    } else {
        format!("{}s remaining", remaining)
    }
}

/// 12-hour clock, e.g. "5:30 PM".
pub fn format_end_time<Tz: TimeZone>(end: &DateTime<Tz>) -> String {
    let (pm, hour) = end.hour12();
    format!("{}:{:02} {}", hour, end.minute(), if pm { "PM" } else { "AM" })
}

/// One-line description of the session, as shown in the menu bar.
pub fn status_text(info: Option<&CaffeinationInfo>, active: bool, now: DateTime<Utc>) -> String {
    if !active {
        return "Decaffeinated".to_string();
    }
    let Some(info) = info else {
        return "Caffeinated".to_string();
    };
    match info.kind {
        CaffeinationKind::Manual => "Caffeinated".to_string(),
        CaffeinationKind::Timed => match info.end_time {
            Some(end) => format!("Until {}", format_time_remaining(end, now)),
            None => "Timed".to_string(),
        },
        CaffeinationKind::Until => match info.end_time {
            Some(end) => format!("Until {}", format_end_time(&end.with_timezone(&Local))),
            None => "Until".to_string(),
        },
        CaffeinationKind::WhileAppRuns => match &info.watched_app {
            Some(app) => format!("While {} runs", app.name),
            None => "While app runs".to_string(),
        },
        CaffeinationKind::Scheduled => "Scheduled".to_string(),
    }
}

/// Emoji pair for each icon set: (caffeinated, decaffeinated).
fn icon_pair(set: &str) -> (&'static str, &'static str) {
    match set {
        "mug" => ("☕", "🍵"),
        "cup" => ("☕", "🥤"),
        "paper-cup" => ("☕", "🥛"),
        _ => ("☕", "🫖"),
    }
}

/// Icon for `set`; unknown sets fall back to `pot`.
pub fn icon(set: &str, active: bool) -> &'static str {
    let (on, off) = icon_pair(set);
    if active {
        on
    } else {
        off
    }
}

/// Parses a CLI duration into seconds. Bare digits are minutes.
pub fn parse_duration(input: &str) -> Result<u64> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let compact = compact.to_lowercase();
    let invalid = || CoffeeError::InvalidDuration(input.to_string());

    if compact.is_empty() {
        return Err(invalid());
    }

    let secs = if compact.chars().all(|c| c.is_ascii_digit()) {
        compact
            .parse::<u64>()
            .map_err(|_| invalid())?
            .checked_mul(60)
            .ok_or_else(invalid)?
    } else {
        let caps = DURATION_RE.captures(&compact).ok_or_else(invalid)?;
        let mut total: u64 = 0;
        for (index, (_, size)) in UNITS.iter().enumerate() {
            if let Some(amount) = caps.get(index + 1) {
                let amount: u64 = amount.as_str().parse().map_err(|_| invalid())?;
                total = amount
                    .checked_mul(*size)
                    .and_then(|secs| total.checked_add(secs))
                    .ok_or_else(invalid)?;
            }
        }
        total
    };

    if secs == 0 {
        return Err(invalid());
    }
    Ok(secs)
}

/// Seconds from `now` until the next wall-clock `target`, tomorrow if it
/// has already passed today.
pub fn seconds_until<Tz: TimeZone>(target: TimeOfDay, now: &DateTime<Tz>) -> u64 {
    let local = now.naive_local();
    let mut at = local.date().and_time(target.to_naive());
    if at <= local {
        at = at + Duration::days(1);
    }
    at.signed_duration_since(local).num_seconds().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CaffeinationIntent, WatchedApp};
    use chrono::FixedOffset;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(59), "59s");
        assert_eq!(format_duration(3_600), "1h");
        assert_eq!(format_duration(93_784), "1d 2h 3m 4s");
    }

    #[test]
    fn formats_time_remaining() {
        let end = t0() + Duration::seconds(2 * 3600 + 5 * 60 + 30);
        assert_eq!(format_time_remaining(end, t0()), "2h 5m remaining");
        assert_eq!(
            format_time_remaining(t0() + Duration::seconds(300), t0()),
            "5m remaining"
        );
        assert_eq!(
            format_time_remaining(t0() + Duration::seconds(42), t0()),
            "42s remaining"
        );
        assert_eq!(format_time_remaining(t0(), t0() + Duration::seconds(9)), "ending soon");
    }

    #[test]
    fn formats_end_time_on_twelve_hour_clock() {
        let offset = FixedOffset::east_opt(0).unwrap();
        let evening = offset.with_ymd_and_hms(2026, 3, 2, 17, 30, 0).unwrap();
        let midnight = offset.with_ymd_and_hms(2026, 3, 2, 0, 5, 0).unwrap();
        assert_eq!(format_end_time(&evening), "5:30 PM");
        assert_eq!(format_end_time(&midnight), "12:05 AM");
    }

    #[test]
    fn status_text_per_kind() {
        let timed = CaffeinationIntent::timed().into_info(t0(), Some(3_900));
        let watching =
            CaffeinationIntent::while_app(WatchedApp::new("Notes", 1)).into_info(t0(), None);
        let scheduled = CaffeinationIntent::scheduled().into_info(t0(), Some(60));
        let manual = CaffeinationIntent::manual().into_info(t0(), None);

        assert_eq!(status_text(Some(&manual), true, t0()), "Caffeinated");
        assert_eq!(
            status_text(Some(&timed), true, t0()),
            "Until 1h 5m remaining"
        );
        assert_eq!(status_text(Some(&watching), true, t0()), "While Notes runs");
        assert_eq!(status_text(Some(&scheduled), true, t0()), "Scheduled");
        assert_eq!(status_text(None, true, t0()), "Caffeinated");
        assert_eq!(status_text(Some(&manual), false, t0()), "Decaffeinated");
    }

    #[test]
    fn until_status_names_end_time() {
        let until = CaffeinationIntent::until().into_info(t0(), Some(60));
        assert!(status_text(Some(&until), true, t0()).starts_with("Until "));
    }

    #[test]
    fn icons_fall_back_to_pot() {
        assert_eq!(icon("mug", false), "🍵");
        assert_eq!(icon("unknown", false), icon("pot", false));
        assert_eq!(icon("paper-cup", true), "☕");
    }

    #[test]
    fn parses_durations() {
        assert_eq!(parse_duration("45").unwrap(), 2_700);
        assert_eq!(parse_duration("45m").unwrap(), 2_700);
        assert_eq!(parse_duration("1h30m").unwrap(), 5_400);
        assert_eq!(parse_duration("1h 30m").unwrap(), 5_400);
        assert_eq!(parse_duration("2H").unwrap(), 7_200);
        assert_eq!(parse_duration("90s").unwrap(), 90);
        assert_eq!(parse_duration("1d").unwrap(), 86_400);
    }

    #[test]
    fn rejects_bad_durations() {
        for input in ["", "0", "0m", "abc", "30m1h", "1.5h", "-5m"] {
            assert!(
                matches!(parse_duration(input), Err(CoffeeError::InvalidDuration(_))),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn seconds_until_rolls_over_midnight() {
        let offset = FixedOffset::east_opt(3_600).unwrap();
        let now = offset.with_ymd_and_hms(2026, 3, 2, 16, 0, 0).unwrap();
        assert_eq!(seconds_until("17:30".parse().unwrap(), &now), 5_400);
        assert_eq!(seconds_until("16:00".parse().unwrap(), &now), 86_400);
        assert_eq!(seconds_until("09:00".parse().unwrap(), &now), 17 * 3_600);
    }
}
