use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;

use crate::config::FilterConfig;
use crate::extract::location;
use crate::model::JobRecord;

static HOURLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)per\s+hour|/\s*hr\b|/\s*hour\b|\bhourly\b").unwrap());
static REMOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(remote|work\s+from\s+home|telecommute)\b").unwrap());
static US_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(us|usa|united\s+states)\b").unwrap());

pub fn normalize_keywords(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

// Substring containment on purpose, not word-boundary matching: short
// keywords can hit inside longer words. Known false-positive source kept for
// compatibility with the sources this feeds on.
fn contains_any(haystack_lower: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| haystack_lower.contains(k.as_str()))
}

/// Date-window predicate. Unknown posting dates pass: a job without a date
/// is not penalized.
pub fn filter_by_date(posted: Option<DateTime<Utc>>, days_back: u32, now: DateTime<Utc>) -> bool {
    match posted {
        None => true,
        Some(dt) => dt >= now - Duration::days(i64::from(days_back)),
    }
}

/// Keep records whose location resolves into one of the target states.
///
/// Candidates come from the record's own location field plus labelled
/// mentions in the description. A record with no candidates at all is still
/// accepted when the description reads like a US remote role.
pub fn filter_by_location(
    records: Vec<JobRecord>,
    target_states: &BTreeSet<String>,
) -> (Vec<JobRecord>, usize) {
    let mut kept = Vec::with_capacity(records.len());
    let mut rejected = 0usize;
    for record in records {
        if in_target_states(&record, target_states) {
            kept.push(record);
        } else {
            rejected += 1;
        }
    }
    (kept, rejected)
}

fn in_target_states(record: &JobRecord, target_states: &BTreeSet<String>) -> bool {
    let mut candidates: Vec<String> = Vec::new();
    if let Some(loc) = record.location.as_deref() {
        if !loc.trim().is_empty() {
            candidates.push(loc.to_string());
        }
    }
    candidates.extend(location::labelled_locations(&record.description));

    if candidates.is_empty() {
        return REMOTE_RE.is_match(&record.description) && US_RE.is_match(&record.description);
    }

    candidates.iter().any(|loc| {
        location::extract_state(Some(loc))
            .map_or(false, |code| target_states.contains(code.as_str()))
    })
}

/// Rejection tally per chain stage, threaded back to the caller instead of
/// logged from inside the predicates.
#[derive(Debug, Default, Clone)]
pub struct FilterStats {
    pub input: usize,
    pub stale_date: usize,
    pub title_allow: usize,
    pub title_required: usize,
    pub title_excluded: usize,
    pub include_miss: usize,
    pub exclude_hit: usize,
    pub hourly_pay: usize,
    pub kept: usize,
}

/// The keyword filter chain: seven predicates applied in order, a record is
/// dropped at the first failure.
pub struct KeywordFilters {
    days_back: u32,
    job_titles: Vec<String>,
    title_must_contain: Vec<String>,
    title_exclude: Vec<String>,
    include_keywords: Vec<String>,
    exclude_keywords: Vec<String>,
    now: DateTime<Utc>,
}

impl KeywordFilters {
    pub fn new(config: &FilterConfig, extra_keywords: &[String], now: DateTime<Utc>) -> Self {
        let mut include = config.include_keywords.clone();
        include.extend(extra_keywords.iter().cloned());
        Self {
            days_back: config.days_back,
            job_titles: normalize_keywords(&config.job_titles),
            title_must_contain: normalize_keywords(&config.title_must_contain),
            title_exclude: normalize_keywords(&config.title_exclude),
            include_keywords: normalize_keywords(&include),
            exclude_keywords: normalize_keywords(&config.exclude_keywords),
            now,
        }
    }

    pub fn apply(&self, records: Vec<JobRecord>) -> (Vec<JobRecord>, FilterStats) {
        let mut stats = FilterStats {
            input: records.len(),
            ..FilterStats::default()
        };
        let mut kept = Vec::with_capacity(records.len());

        for record in records {
            let title = record.title.to_lowercase();
            let combined = record.combined_text().to_lowercase();

            if !filter_by_date(record.date_posted, self.days_back, self.now) {
                stats.stale_date += 1;
                continue;
            }
            if !self.job_titles.is_empty() && !contains_any(&combined, &self.job_titles) {
                stats.title_allow += 1;
                continue;
            }
            if !self.title_must_contain.is_empty()
                && !contains_any(&title, &self.title_must_contain)
            {
                stats.title_required += 1;
                continue;
            }
            if contains_any(&title, &self.title_exclude) {
                stats.title_excluded += 1;
                continue;
            }
            if !self.include_keywords.is_empty() && !contains_any(&combined, &self.include_keywords)
            {
                stats.include_miss += 1;
                continue;
            }
            if contains_any(&combined, &self.exclude_keywords) {
                stats.exclude_hit += 1;
                continue;
            }
            if HOURLY_RE.is_match(&combined) {
                stats.hourly_pay += 1;
                continue;
            }
            kept.push(record);
        }

        stats.kept = kept.len();
        (kept, stats)
    }

    /// How many distinct title keywords the combined text contains. Records
    /// with two or more form the high-confidence subset.
    pub fn title_keyword_matches(&self, record: &JobRecord) -> usize {
        let combined = record.combined_text().to_lowercase();
        self.job_titles
            .iter()
            .filter(|k| combined.contains(k.as_str()))
            .count()
    }
}

// ── Tests ──
