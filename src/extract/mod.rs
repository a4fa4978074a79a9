pub mod dates;
pub mod location;
pub mod salary;

use chrono::{DateTime, Utc};

use crate::model::JobRecord;

/// Recompute the derived fields of a record and repair missing dates.
///
/// `state` and `salary` are never trusted from the acquisition layer; they
/// are rebuilt here from `location`/`description` so every source gets the
/// same treatment. Dates already attached by an adapter are kept but still
/// pass the sanity windows; missing ones are recovered from embedded JSON-LD
/// first, then from a free-text scan.
pub fn enrich(record: JobRecord, now: DateTime<Utc>, max_age_days: i64) -> JobRecord {
    let state = location::extract_state(record.location.as_deref()).or_else(|| {
        location::labelled_locations(&record.description)
            .iter()
            .find_map(|loc| location::extract_state(Some(loc)))
    });

    let salary = salary::extract_salary(&record.description);

    let mut date_posted = record.date_posted;
    let mut expiration_date = record.expiration_date;

    if date_posted.is_none() || expiration_date.is_none() {
        let (ld_posted, ld_expiration) = dates::extract_json_ld_dates(&record.description);
        date_posted = date_posted.or(ld_posted);
        expiration_date = expiration_date.or(ld_expiration);
    }

    if date_posted.is_none() || expiration_date.is_none() {
        let (text_posted, text_expiration) =
            dates::extract_all_dates(&record.description, now, max_age_days);
        date_posted = date_posted.or(text_posted);
        expiration_date = expiration_date.or(text_expiration);
    }

    JobRecord {
        date_posted: date_posted.and_then(|dt| dates::sanitize_posted(dt, now, max_age_days)),
        expiration_date: expiration_date.and_then(|dt| dates::sanitize_expiration(dt, now)),
        state,
        salary,
        ..record
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_record;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn derives_state_and_salary() {
        let mut record = test_record("u");
        record.location = Some("Boston, MA".to_string());
        record.description = "Great role. $90,000 base.".to_string();
        let enriched = enrich(record, fixed_now(), 365);
        assert_eq!(enriched.state.as_deref(), Some("MA"));
        assert_eq!(enriched.salary.as_deref(), Some("$90,000"));
    }

    #[test]
    fn state_from_labelled_description_when_location_missing() {
        let mut record = test_record("u");
        record.description = "Location: Princeton, NJ. On site.".to_string();
        let enriched = enrich(record, fixed_now(), 365);
        assert_eq!(enriched.state.as_deref(), Some("NJ"));
    }

    #[test]
    fn stale_adapter_date_discarded() {
        let now = fixed_now();
        let mut record = test_record("u");
        record.date_posted = Some(now - chrono::Duration::days(400));
        let enriched = enrich(record, now, 365);
        assert_eq!(enriched.date_posted, None);
    }

    #[test]
    fn missing_dates_recovered_from_text() {
        let now = fixed_now();
        let mut record = test_record("u");
        record.description = "Posted 2 days ago. Deadline: 2025-02-01".to_string();
        let enriched = enrich(record, now, 365);
        assert_eq!(enriched.date_posted, Some(now - chrono::Duration::days(2)));
        assert_eq!(
            enriched.expiration_date,
            Some(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn json_ld_wins_over_free_text() {
        let now = fixed_now();
        let mut record = test_record("u");
        record.description =
            r#"Posted 5 days ago. "datePosted":"2025-01-09T00:00:00Z""#.to_string();
        let enriched = enrich(record, now, 365);
        assert_eq!(
            enriched.date_posted,
            Some(Utc.with_ymd_and_hms(2025, 1, 9, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn adapter_dates_kept_when_sane() {
        let now = fixed_now();
        let mut record = test_record("u");
        record.date_posted = Some(now - chrono::Duration::days(1));
        record.description = "Posted 9 days ago.".to_string();
        let enriched = enrich(record, now, 365);
        assert_eq!(enriched.date_posted, Some(now - chrono::Duration::days(1)));
    }
}
