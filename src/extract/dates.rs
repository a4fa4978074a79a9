use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;

pub const DEFAULT_MAX_AGE_DAYS: i64 = 365;

/// How far ahead of a literal date we look for a classifying keyword.
const KEYWORD_WINDOW: usize = 50;

static RELATIVE_PAST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+)\+?\s*(minute|hour|day|week|month)s?\s+ago\b").unwrap()
});
static RELATIVE_FUTURE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bin\s+(\d+)\s*(day|week|month)s?\b").unwrap());
static POSTED_NOW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(just\s+now|just\s+posted|recently\s+posted|posted\s+now|posted\s+today|today)\b")
        .unwrap()
});
static YESTERDAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\byesterday\b").unwrap());

// Literal date shapes, tried in order. Later patterns skip text already
// claimed by an earlier one.
static ISO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})(?:[T ](\d{2}):(\d{2}):(\d{2}))?").unwrap()
});
static MDY4_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b").unwrap());
static MDY2_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{2})\b").unwrap());
static MONTH_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|jun(?:e)?|jul(?:y)?|aug(?:ust)?|sep(?:tember|t)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?\s+(\d{1,2})(?:st|nd|rd|th)?(?:,?\s+(\d{4}))?\b",
    )
    .unwrap()
});

// JSON-LD structured data embedded in scraped HTML, e.g.
// "datePosted":"2026-01-16T22:02:28.162Z"
static DATE_POSTED_JSON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""datePosted"\s*:\s*"([^"]+)""#).unwrap());
static VALID_THROUGH_JSON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""validThrough"\s*:\s*"([^"]+)""#).unwrap());

// Longer phrases first: "posting end date" must beat a bare "end date"
// ending at the same spot.
const EXPIRATION_PHRASES: &[&str] = &[
    "job posting end date",
    "posting end date",
    "last day to apply",
    "application deadline",
    "valid through",
    "validthrough",
    "apply before",
    "apply by",
    "closing date",
    "close date",
    "end date",
    "expiration date",
    "expires",
    "expiry",
    "deadline",
    "closes",
];
const POSTED_PHRASES: &[&str] = &[
    "posting date",
    "date posted",
    "dateposted",
    "posted on",
    "posted",
    "published",
    "listed",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateKind {
    Posted,
    Expiration,
}

/// Scan free text for posting and expiration timestamps.
///
/// Every date-like fragment is classified independently (relative patterns,
/// literal tokens, then literal dates via keyword proximity with a time-based
/// fallback), the classified sets are reduced to the latest posted / earliest
/// expiration, and both survivors must pass the sanity windows. Unparsable
/// fragments are skipped, never an error.
pub fn extract_all_dates(
    text: &str,
    now: DateTime<Utc>,
    max_age_days: i64,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    if text.trim().is_empty() {
        return (None, None);
    }

    let mut posted: Vec<DateTime<Utc>> = Vec::new();
    let mut expiration: Vec<DateTime<Utc>> = Vec::new();

    // Relative-past ("3 days ago", "30+ days ago") is always a posting date.
    for caps in RELATIVE_PAST_RE.captures_iter(text) {
        if let Ok(n) = caps[1].parse::<i64>() {
            if let Some(d) = duration_for(n, &caps[2]) {
                posted.push(now - d);
            }
        }
    }

    // "today" / "just posted" / "yesterday" literal tokens.
    if POSTED_NOW_RE.is_match(text) {
        posted.push(now);
    }
    if YESTERDAY_RE.is_match(text) {
        posted.push(now - Duration::days(1));
    }

    // Relative-future ("in 2 weeks") is always an expiration.
    for caps in RELATIVE_FUTURE_RE.captures_iter(text) {
        if let Ok(n) = caps[1].parse::<i64>() {
            if let Some(d) = duration_for(n, &caps[2]) {
                expiration.push(now + d);
            }
        }
    }

    // Remaining literal dates: classify by keyword proximity, falling back
    // to "more than a day out means expiration".
    for (dt, start) in scan_literal_dates(text, now) {
        let kind = classify_by_keywords(text, start).unwrap_or_else(|| {
            if dt > now + Duration::days(1) {
                DateKind::Expiration
            } else {
                DateKind::Posted
            }
        });
        match kind {
            DateKind::Posted => posted.push(dt),
            DateKind::Expiration => expiration.push(dt),
        }
    }

    // Latest posting signal, soonest deadline.
    let best_posted = posted.into_iter().max();
    let best_expiration = expiration.into_iter().min();

    (
        best_posted.and_then(|dt| sanitize_posted(dt, now, max_age_days)),
        best_expiration.and_then(|dt| sanitize_expiration(dt, now)),
    )
}

/// Extract datePosted/validThrough from JSON-LD fragments in scraped text.
pub fn extract_json_ld_dates(text: &str) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let posted = DATE_POSTED_JSON_RE
        .captures(text)
        .and_then(|c| parse_iso(&c[1]));
    let expiration = VALID_THROUGH_JSON_RE
        .captures(text)
        .and_then(|c| parse_iso(&c[1]));
    (posted, expiration)
}

/// Parse an ISO 8601 timestamp or bare date, normalized to UTC.
pub fn parse_iso(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&dt));
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0)?));
    }
    None
}

/// A posting date must be neither older than `max_age_days` nor more than
/// 30 days in the future.
pub fn sanitize_posted(
    dt: DateTime<Utc>,
    now: DateTime<Utc>,
    max_age_days: i64,
) -> Option<DateTime<Utc>> {
    if dt < now - Duration::days(max_age_days) {
        return None;
    }
    if dt > now + Duration::days(30) {
        return None;
    }
    Some(dt)
}

/// An expiration already in the past cannot describe an open listing.
pub fn sanitize_expiration(dt: DateTime<Utc>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if dt < now {
        None
    } else {
        Some(dt)
    }
}

fn duration_for(n: i64, unit: &str) -> Option<Duration> {
    match unit.to_ascii_lowercase().as_str() {
        "minute" => Some(Duration::minutes(n)),
        "hour" => Some(Duration::hours(n)),
        "day" => Some(Duration::days(n)),
        "week" => Some(Duration::days(7 * n)),
        // months approximated as 30 days
        "month" => Some(Duration::days(30 * n)),
        _ => None,
    }
}

/// Find all literal dates with their byte offsets. Patterns run in order and
/// a span claimed by one pattern is invisible to the rest, so "01/15/2025"
/// never re-matches as a two-digit-year date.
fn scan_literal_dates(text: &str, now: DateTime<Utc>) -> Vec<(DateTime<Utc>, usize)> {
    let mut taken: Vec<(usize, usize)> = Vec::new();
    let mut found: Vec<(DateTime<Utc>, usize)> = Vec::new();

    let mut claim =
        |start: usize, end: usize, dt: Option<DateTime<Utc>>, taken: &mut Vec<(usize, usize)>| {
            if taken.iter().any(|&(s, e)| start < e && end > s) {
                return;
            }
            taken.push((start, end));
            if let Some(dt) = dt {
                found.push((dt, start));
            }
        };

    for caps in ISO_RE.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let dt = parse_ymd_hms(
            caps[1].parse().ok(),
            caps[2].parse().ok(),
            caps[3].parse().ok(),
            caps.get(4).and_then(|h| h.as_str().parse().ok()),
            caps.get(5).and_then(|m| m.as_str().parse().ok()),
            caps.get(6).and_then(|s| s.as_str().parse().ok()),
        );
        claim(m.start(), m.end(), dt, &mut taken);
    }

    for caps in MDY4_RE.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let dt = parse_ymd_hms(
            caps[3].parse().ok(),
            caps[1].parse().ok(),
            caps[2].parse().ok(),
            None,
            None,
            None,
        );
        claim(m.start(), m.end(), dt, &mut taken);
    }

    for caps in MDY2_RE.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let year = caps[3].parse::<i32>().ok().map(|y| 2000 + y);
        let dt = parse_ymd_hms(year, caps[1].parse().ok(), caps[2].parse().ok(), None, None, None);
        claim(m.start(), m.end(), dt, &mut taken);
    }

    for caps in MONTH_NAME_RE.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let month = month_from_name(&caps[1]);
        let day = caps[2].parse::<u32>().ok();
        let dt = match caps.get(3) {
            Some(y) => parse_ymd_hms(y.as_str().parse().ok(), month, day, None, None, None),
            // No year: assume the current one, stepping back a year if that
            // lands more than 7 days in the future.
            None => parse_ymd_hms(Some(now.year()), month, day, None, None, None).map(|dt| {
                if dt > now + Duration::days(7) {
                    parse_ymd_hms(Some(now.year() - 1), month, day, None, None, None).unwrap_or(dt)
                } else {
                    dt
                }
            }),
        };
        claim(m.start(), m.end(), dt, &mut taken);
    }

    found.sort_by_key(|&(_, start)| start);
    found
}

fn parse_ymd_hms(
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    hour: Option<u32>,
    minute: Option<u32>,
    second: Option<u32>,
) -> Option<DateTime<Utc>> {
    let date = NaiveDate::from_ymd_opt(year?, month?, day?)?;
    let time = date.and_hms_opt(hour.unwrap_or(0), minute.unwrap_or(0), second.unwrap_or(0))?;
    Some(Utc.from_utc_datetime(&time))
}

fn month_from_name(name: &str) -> Option<u32> {
    let prefix: String = name.to_ascii_lowercase().chars().take(3).collect();
    match prefix.as_str() {
        "jan" => Some(1),
        "feb" => Some(2),
        "mar" => Some(3),
        "apr" => Some(4),
        "may" => Some(5),
        "jun" => Some(6),
        "jul" => Some(7),
        "aug" => Some(8),
        "sep" => Some(9),
        "oct" => Some(10),
        "nov" => Some(11),
        "dec" => Some(12),
        _ => None,
    }
}

/// Look back up to 50 chars before a literal date for the closest expiration
/// or posted keyword. Both families present: the nearer one wins, expiration
/// on a tie.
fn classify_by_keywords(text: &str, date_start: usize) -> Option<DateKind> {
    let mut window_start = date_start.saturating_sub(KEYWORD_WINDOW);
    while window_start < date_start && !text.is_char_boundary(window_start) {
        window_start += 1;
    }
    let window = text[window_start..date_start].to_lowercase();

    let expiration = closest_phrase(&window, EXPIRATION_PHRASES);
    let posted = closest_phrase(&window, POSTED_PHRASES);

    match (expiration, posted) {
        (Some(e), Some(p)) => Some(if e <= p {
            DateKind::Expiration
        } else {
            DateKind::Posted
        }),
        (Some(_), None) => Some(DateKind::Expiration),
        (None, Some(_)) => Some(DateKind::Posted),
        (None, None) => None,
    }
}

/// Distance from the end of the window to the rightmost occurrence of any
/// phrase. Phrase lists are ordered longest-first and ties keep the first
/// hit, so more specific phrases win.
fn closest_phrase(window: &str, phrases: &[&str]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for phrase in phrases {
        if let Some(pos) = window.rfind(phrase) {
            let dist = window.len() - (pos + phrase.len());
            if best.map_or(true, |b| dist < b) {
                best = Some(dist);
            }
        }
    }
    best
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap()
    }

    fn days(n: i64) -> Duration {
        Duration::days(n)
    }

    #[test]
    fn empty_text() {
        assert_eq!(extract_all_dates("", fixed_now(), 365), (None, None));
        assert_eq!(extract_all_dates("   ", fixed_now(), 365), (None, None));
    }

    #[test]
    fn relative_past_is_posted() {
        let now = fixed_now();
        let (posted, exp) = extract_all_dates("Posted 3 days ago", now, 365);
        assert_eq!(posted, Some(now - days(3)));
        assert_eq!(exp, None);
    }

    #[test]
    fn relative_past_with_plus() {
        let now = fixed_now();
        let (posted, _) = extract_all_dates("Posted 30+ Days Ago", now, 365);
        assert_eq!(posted, Some(now - days(30)));
    }

    #[test]
    fn relative_hours_and_weeks() {
        let now = fixed_now();
        let (posted, _) = extract_all_dates("5 hours ago", now, 365);
        assert_eq!(posted, Some(now - Duration::hours(5)));
        let (posted, _) = extract_all_dates("2 weeks ago", now, 365);
        assert_eq!(posted, Some(now - days(14)));
    }

    #[test]
    fn today_and_yesterday_tokens() {
        let now = fixed_now();
        assert_eq!(extract_all_dates("Posted Today", now, 365).0, Some(now));
        assert_eq!(extract_all_dates("just posted", now, 365).0, Some(now));
        assert_eq!(
            extract_all_dates("Posted Yesterday", now, 365).0,
            Some(now - days(1))
        );
    }

    #[test]
    fn relative_future_is_expiration() {
        let now = fixed_now();
        let (posted, exp) = extract_all_dates("Applications close in 2 weeks", now, 365);
        assert_eq!(posted, None);
        assert_eq!(exp, Some(now + days(14)));
    }

    #[test]
    fn relative_beats_literal_for_posted() {
        // Spec scenario: the relative pattern supplies the posting date, the
        // keyword-classified literal supplies the expiration.
        let now = fixed_now();
        let (posted, exp) = extract_all_dates("Posted 3 days ago. Deadline: 2099-01-01", now, 365);
        assert_eq!(posted, Some(now - days(3)));
        assert_eq!(exp, Some(Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn proximity_beats_global_keywords() {
        // Both keyword families appear in the text; each date takes the
        // family closest to it.
        let now = fixed_now();
        let text = "Job Posting End Date: 01/15/2025 for this role. Posted: 01/01/2025";
        let (posted, exp) = extract_all_dates(text, now, 365);
        assert_eq!(exp, Some(Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap()));
        assert_eq!(posted, Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn unkeyworded_future_date_is_expiration() {
        let now = fixed_now();
        let (posted, exp) = extract_all_dates("01/20/2025", now, 365);
        assert_eq!(posted, None);
        assert_eq!(exp, Some(Utc.with_ymd_and_hms(2025, 1, 20, 0, 0, 0).unwrap()));
    }

    #[test]
    fn unkeyworded_past_date_is_posted() {
        let now = fixed_now();
        let (posted, exp) = extract_all_dates("01/05/2025", now, 365);
        assert_eq!(posted, Some(Utc.with_ymd_and_hms(2025, 1, 5, 0, 0, 0).unwrap()));
        assert_eq!(exp, None);
    }

    #[test]
    fn latest_posted_earliest_expiration() {
        let now = fixed_now();
        let text = "Published 2025-01-02. Published 2025-01-06. Expires 2025-03-01. Expires 2025-02-01.";
        let (posted, exp) = extract_all_dates(text, now, 365);
        assert_eq!(posted, Some(Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap()));
        assert_eq!(exp, Some(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn month_name_formats() {
        let now = fixed_now();
        let (posted, _) = extract_all_dates("Posted on January 5, 2025", now, 365);
        assert_eq!(posted, Some(Utc.with_ymd_and_hms(2025, 1, 5, 0, 0, 0).unwrap()));
        let (posted, _) = extract_all_dates("Posted on Jan 5th, 2025", now, 365);
        assert_eq!(posted, Some(Utc.with_ymd_and_hms(2025, 1, 5, 0, 0, 0).unwrap()));
    }

    #[test]
    fn month_day_without_year_assumes_previous_year_when_far_future() {
        let now = fixed_now(); // 2025-01-10
        let (posted, _) = extract_all_dates("Posted on March 5", now, 365);
        assert_eq!(posted, Some(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()));
    }

    #[test]
    fn month_day_without_year_keeps_near_future() {
        let now = fixed_now();
        // Jan 12 is 2 days out, within the 7-day allowance: stays 2025 and
        // classifies as posted (not more than a day... it is 2 days out, so
        // the fallback calls it expiration).
        let (_, exp) = extract_all_dates("January 12", now, 365);
        assert_eq!(exp, Some(Utc.with_ymd_and_hms(2025, 1, 12, 0, 0, 0).unwrap()));
    }

    #[test]
    fn two_digit_year() {
        let now = fixed_now();
        let (posted, _) = extract_all_dates("Posted 1/5/25", now, 365);
        assert_eq!(posted, Some(Utc.with_ymd_and_hms(2025, 1, 5, 0, 0, 0).unwrap()));
    }

    #[test]
    fn invalid_calendar_date_skipped() {
        let now = fixed_now();
        assert_eq!(extract_all_dates("13/45/2025", now, 365), (None, None));
        assert_eq!(extract_all_dates("2025-99-99", now, 365), (None, None));
    }

    #[test]
    fn stale_posted_discarded() {
        let now = fixed_now();
        let (posted, _) = extract_all_dates("Posted 01/01/2020", now, 365);
        assert_eq!(posted, None);
    }

    #[test]
    fn far_future_posted_discarded() {
        let now = fixed_now();
        let (posted, _) = extract_all_dates("Posted 2026-06-01", now, 365);
        assert_eq!(posted, None);
    }

    #[test]
    fn past_expiration_discarded() {
        let now = fixed_now();
        let (_, exp) = extract_all_dates("Deadline: 01/01/2024", now, 365);
        assert_eq!(exp, None);
    }

    #[test]
    fn iso_with_time_component() {
        let now = fixed_now();
        let (posted, _) = extract_all_dates("Published 2025-01-05T08:30:00", now, 365);
        assert_eq!(posted, Some(Utc.with_ymd_and_hms(2025, 1, 5, 8, 30, 0).unwrap()));
    }

    #[test]
    fn json_ld_dates() {
        let text = r#"{"datePosted":"2026-01-16T22:02:28.162Z","validThrough":"2026-05-21T00:27:38.974Z"}"#;
        let (posted, exp) = extract_json_ld_dates(text);
        assert_eq!(
            posted.map(|d| d.date_naive()),
            Some(NaiveDate::from_ymd_opt(2026, 1, 16).unwrap())
        );
        assert_eq!(
            exp.map(|d| d.date_naive()),
            Some(NaiveDate::from_ymd_opt(2026, 5, 21).unwrap())
        );
    }

    #[test]
    fn parse_iso_variants() {
        assert!(parse_iso("2025-01-05").is_some());
        assert!(parse_iso("2025-01-05T10:00:00").is_some());
        assert!(parse_iso("2025-01-05T10:00:00Z").is_some());
        assert!(parse_iso("2025-01-05T10:00:00+02:00").is_some());
        assert!(parse_iso("not a date").is_none());
        assert!(parse_iso("").is_none());
    }

    #[test]
    fn sanity_windows() {
        let now = fixed_now();
        assert!(sanitize_posted(now - days(364), now, 365).is_some());
        assert!(sanitize_posted(now - days(366), now, 365).is_none());
        assert!(sanitize_posted(now + days(29), now, 365).is_some());
        assert!(sanitize_posted(now + days(31), now, 365).is_none());
        assert!(sanitize_expiration(now + days(1), now).is_some());
        assert!(sanitize_expiration(now - days(1), now).is_none());
    }
}
