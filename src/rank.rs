use chrono::{DateTime, Utc};

use crate::extract::salary;
use crate::model::JobRecord;

const STATE_PRIORITY: &[(&str, u8)] = &[("NY", 0), ("NJ", 1), ("PA", 2), ("MA", 3), ("CA", 4)];
const STATE_PRIORITY_OTHER: u8 = 5;

/// Stable composite ordering: fresher postings first, preferred states next,
/// then salary buckets (low / unknown / high) with higher pay first inside a
/// bucket. Ties keep their input order.
pub fn rank(mut records: Vec<JobRecord>, now: DateTime<Utc>) -> Vec<JobRecord> {
    records.sort_by_key(|record| sort_key(record, now));
    records
}

fn sort_key(record: &JobRecord, now: DateTime<Utc>) -> (i64, u8, u8, i64) {
    let (salary_bucket, salary_order) = salary_key(record.salary.as_deref());
    (
        recency_bucket(record.date_posted, now),
        state_rank(record.state.as_deref()),
        salary_bucket,
        salary_order,
    )
}

// 0 = today, 1 = yesterday, 2 = two days ago, 3 = unknown, then N+1 for
// N days old; unknown dates land between two and three days old.
fn recency_bucket(posted: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    match posted {
        None => 3,
        Some(dt) => {
            let days = (now.date_naive() - dt.date_naive()).num_days().max(0);
            if days <= 2 {
                days
            } else {
                days + 1
            }
        }
    }
}

fn state_rank(state: Option<&str>) -> u8 {
    state
        .and_then(|code| {
            STATE_PRIORITY
                .iter()
                .find(|(c, _)| *c == code)
                .map(|(_, rank)| *rank)
        })
        .unwrap_or(STATE_PRIORITY_OTHER)
}

// Bucket 0: parseable salary up to $50k. Bucket 1: no parseable salary.
// Bucket 2: above $50k. The second component is negated cents so larger
// amounts sort first within a bucket.
fn salary_key(raw: Option<&str>) -> (u8, i64) {
    match raw.and_then(salary::salary_value) {
        Some(v) if v <= 50_000.0 => (0, -((v * 100.0) as i64)),
        None => (1, 0),
        Some(v) => (2, -((v * 100.0) as i64)),
    }
}

// ── Tests ──
