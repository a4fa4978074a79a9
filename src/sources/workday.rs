use std::collections::HashSet;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::WorkdaySite;
use crate::extract::dates;
use crate::fetch::Fetcher;
use crate::model::JobRecord;

const PAGE_SIZE: usize = 20;
const MAX_RETRIES: u32 = 3;
const MAX_CONSECUTIVE_ERRORS: u32 = 3;

// JSON fields probed for a posting date; Workday tenants are not consistent.
const POSTED_FIELDS: &[&str] = &[
    "postedOn",
    "postedDate",
    "postingDate",
    "datePosted",
    "publishedDate",
    "startDate",
    "createdDate",
];
const EXPIRATION_FIELDS: &[&str] = &[
    "endDate",
    "closingDate",
    "expirationDate",
    "applicationDeadline",
    "postingEndDate",
];
const DESCRIPTION_FIELDS: &[&str] = &[
    "jobDescription",
    "description",
    "jobPostingDescription",
    "summary",
    "jobSummary",
    "overview",
];
const CATEGORY_FIELDS: &[&str] = &["jobCategory", "jobType", "jobFamily", "timeType"];
const SALARY_FIELDS: &[&str] = &["salary", "compensation", "payRange", "salaryRange", "pay", "wage"];

/// Scrape a Workday career portal through its JSON search API. All remote
/// failures degrade to whatever was collected so far.
pub async fn fetch(fetcher: &Fetcher, site: &WorkdaySite, source: &str) -> Vec<JobRecord> {
    let api_url = match api_url(&site.url) {
        Ok(url) => url,
        Err(e) => {
            warn!("{}: {}", source, e);
            return Vec::new();
        }
    };
    debug!("{}: api endpoint {}", source, api_url);

    let terms: Vec<String> = if site.search_terms.is_empty() {
        vec![String::new()]
    } else {
        site.search_terms.clone()
    };

    let mut seen: HashSet<String> = HashSet::new();
    let mut records = Vec::new();
    for term in &terms {
        for job in fetch_term(fetcher, &api_url, &site.url, term, site.max_results, source).await {
            if seen.insert(job.url.clone()) {
                records.push(job);
            }
        }
    }

    info!("{}: {} unique jobs", source, records.len());
    records
}

/// Derive the search endpoint from a career-site URL:
/// https://{tenant}.wd{N}.myworkdayjobs.com/{site}
///   -> https://{tenant}.wd{N}.myworkdayjobs.com/wday/cxs/{tenant}/{site}/jobs
fn api_url(career_url: &str) -> Result<String> {
    let parts: Vec<&str> = career_url.trim_end_matches('/').split('/').collect();
    if parts.len() < 4 || !parts[0].starts_with("http") {
        return Err(anyhow!("Unrecognized Workday URL: {}", career_url));
    }
    let domain = parts[..3].join("/");

    // The career-site segment is the last one that is not a language code.
    let mut career_site = parts[parts.len() - 1];
    if matches!(
        career_site.to_ascii_lowercase().as_str(),
        "en" | "en-us" | "en-gb" | "de" | "fr"
    ) && parts.len() > 4
    {
        career_site = parts[parts.len() - 2];
    }

    let tenant = parts[2].split('.').next().unwrap_or_default();
    if tenant.is_empty() || career_site.is_empty() {
        return Err(anyhow!("Unrecognized Workday URL: {}", career_url));
    }

    Ok(format!("{}/wday/cxs/{}/{}/jobs", domain, tenant, career_site))
}

async fn fetch_term(
    fetcher: &Fetcher,
    api_url: &str,
    base_url: &str,
    term: &str,
    max_results: usize,
    source: &str,
) -> Vec<JobRecord> {
    let now = Utc::now();
    let mut jobs = Vec::new();

    let Some(first) = post_page(fetcher, api_url, term, 0, source).await else {
        return jobs;
    };
    let total = first.get("total").and_then(Value::as_u64).unwrap_or(0) as usize;
    info!("{}: {} total jobs for '{}'", source, total, term);
    if total == 0 {
        return jobs;
    }
    collect_postings(&first, base_url, source, now, &mut jobs);

    let mut offset = PAGE_SIZE;
    let mut consecutive_errors = 0u32;
    while offset < total.min(max_results) {
        match post_page(fetcher, api_url, term, offset, source).await {
            Some(data) => {
                consecutive_errors = 0;
                let before = jobs.len();
                collect_postings(&data, base_url, source, now, &mut jobs);
                if jobs.len() == before {
                    break;
                }
                debug!("{}: fetched {}/{} jobs", source, jobs.len(), total);
                offset += PAGE_SIZE;
            }
            None => {
                consecutive_errors += 1;
                if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                    warn!("{}: too many consecutive errors, stopping pagination", source);
                    break;
                }
            }
        }
    }

    jobs
}

/// One paginated search request, retried with backoff. 4xx means the tenant
/// rejected us: give up on this page rather than hammer it.
async fn post_page(
    fetcher: &Fetcher,
    api_url: &str,
    term: &str,
    offset: usize,
    source: &str,
) -> Option<Value> {
    let payload = json!({
        "appliedFacets": {},
        "limit": PAGE_SIZE,
        "offset": offset,
        "searchText": term,
    });

    for attempt in 0..=MAX_RETRIES {
        match fetcher
            .client()
            .post(api_url)
            .header("Accept", "application/json")
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => {
                let status = response.status();
                if status.is_client_error() {
                    warn!("{}: {} -> {}, skipping", source, api_url, status);
                    return None;
                }
                if status.is_success() {
                    match response.json::<Value>().await {
                        Ok(value) => return Some(value),
                        Err(e) => {
                            warn!("{}: bad JSON at offset {}: {}", source, offset, e);
                            return None;
                        }
                    }
                }
            }
            Err(e) => {
                if attempt == MAX_RETRIES {
                    warn!("{}: request failed at offset {}: {}", source, offset, e);
                    return None;
                }
            }
        }
        tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
    }
    None
}

fn collect_postings(
    data: &Value,
    base_url: &str,
    source: &str,
    now: DateTime<Utc>,
    out: &mut Vec<JobRecord>,
) {
    let Some(postings) = data.get("jobPostings").and_then(Value::as_array) else {
        return;
    };
    for posting in postings {
        if let Some(job) = parse_posting(posting, base_url, source, now) {
            out.push(job);
        }
    }
}

/// Parse one posting object. Anything without a usable title is skipped.
fn parse_posting(
    posting: &Value,
    base_url: &str,
    source: &str,
    now: DateTime<Utc>,
) -> Option<JobRecord> {
    let title = posting.get("title")?.as_str()?.trim().to_string();
    if title.is_empty() {
        return None;
    }

    let url = match posting.get("externalPath").and_then(Value::as_str) {
        Some(path) if !path.trim().is_empty() => format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        ),
        _ => base_url.to_string(),
    };

    let location = posting
        .get("locationsText")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    // Posted values are either phrases ("Posted Today", "Posted 30+ Days
    // Ago") or ISO dates; the free-text scanner covers the former.
    let mut date_posted = None;
    for field in POSTED_FIELDS {
        let Some(raw) = posting.get(*field).and_then(Value::as_str) else {
            continue;
        };
        let parsed = dates::parse_iso(raw)
            .or_else(|| dates::extract_all_dates(raw, now, dates::DEFAULT_MAX_AGE_DAYS).0);
        if let Some(dt) =
            parsed.and_then(|dt| dates::sanitize_posted(dt, now, dates::DEFAULT_MAX_AGE_DAYS))
        {
            date_posted = Some(dt);
            break;
        }
    }

    let mut expiration_date = None;
    for field in EXPIRATION_FIELDS {
        let Some(raw) = posting.get(*field).and_then(Value::as_str) else {
            continue;
        };
        if let Some(dt) = dates::parse_iso(raw).and_then(|dt| dates::sanitize_expiration(dt, now)) {
            expiration_date = Some(dt);
            break;
        }
    }

    let mut description_parts: Vec<String> = Vec::new();
    for field in DESCRIPTION_FIELDS {
        if let Some(text) = posting.get(*field).and_then(Value::as_str) {
            if !text.trim().is_empty() {
                description_parts.push(text.trim().to_string());
            }
        }
    }
    if let Some(bullets) = posting.get("bulletFields").and_then(Value::as_array) {
        for bullet in bullets {
            if let Some(text) = bullet.as_str() {
                if !text.trim().is_empty() {
                    description_parts.push(text.trim().to_string());
                }
            }
        }
    }
    for field in CATEGORY_FIELDS {
        if let Some(text) = posting.get(*field).and_then(Value::as_str) {
            if !text.trim().is_empty() {
                description_parts.push(text.trim().to_string());
            }
        }
    }
    // Dollar-marked pay fields ride along in the description so the salary
    // extractor sees them like any other source's text.
    for field in SALARY_FIELDS {
        if let Some(text) = posting.get(*field).and_then(Value::as_str) {
            if text.contains('$') {
                description_parts.push(format!("Salary: {}", text.trim()));
                break;
            }
        }
    }
    let description = description_parts.join(" | ");

    Some(JobRecord {
        title,
        company: company_from_source(source),
        url,
        description,
        date_posted,
        expiration_date,
        source: format!("{}_workday", source),
        location,
        state: None,
        salary: None,
    })
}

fn company_from_source(source: &str) -> String {
    source
        .trim_end_matches("_careers")
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn api_url_simple() {
        assert_eq!(
            api_url("https://pfizer.wd1.myworkdayjobs.com/PfizerCareers").unwrap(),
            "https://pfizer.wd1.myworkdayjobs.com/wday/cxs/pfizer/PfizerCareers/jobs"
        );
    }

    #[test]
    fn api_url_with_language_segment() {
        assert_eq!(
            api_url("https://lilly.wd5.myworkdayjobs.com/en-US/LLY").unwrap(),
            "https://lilly.wd5.myworkdayjobs.com/wday/cxs/lilly/LLY/jobs"
        );
    }

    #[test]
    fn api_url_rejects_garbage() {
        assert!(api_url("not a url").is_err());
        assert!(api_url("https://example.com").is_err());
    }

    #[test]
    fn parse_posting_relative_date_and_path() {
        let now = fixed_now();
        let posting = json!({
            "title": "Senior Scientist",
            "externalPath": "/job/Boston/Senior-Scientist_R-123",
            "locationsText": "Boston, MA",
            "postedOn": "Posted 3 Days Ago",
            "bulletFields": ["R-123"],
        });
        let job = parse_posting(
            &posting,
            "https://acme.wd1.myworkdayjobs.com/Careers",
            "acme",
            now,
        )
        .unwrap();
        assert_eq!(
            job.url,
            "https://acme.wd1.myworkdayjobs.com/Careers/job/Boston/Senior-Scientist_R-123"
        );
        assert_eq!(job.date_posted, Some(now - Duration::days(3)));
        assert_eq!(job.location.as_deref(), Some("Boston, MA"));
        assert_eq!(job.source, "acme_workday");
    }

    #[test]
    fn parse_posting_iso_dates_with_sanity() {
        let now = fixed_now();
        let posting = json!({
            "title": "Scientist",
            "externalPath": "/job/x",
            "postedOn": "2025-01-08",
            "endDate": "2025-03-01",
        });
        let job = parse_posting(&posting, "https://a.wd1.myworkdayjobs.com/C", "a", now).unwrap();
        assert_eq!(
            job.date_posted,
            Some(Utc.with_ymd_and_hms(2025, 1, 8, 0, 0, 0).unwrap())
        );
        assert_eq!(
            job.expiration_date,
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap())
        );

        // An already-passed end date is discarded, not kept.
        let stale = json!({"title": "T", "endDate": "2024-01-01"});
        let job = parse_posting(&stale, "https://a.wd1.myworkdayjobs.com/C", "a", now).unwrap();
        assert_eq!(job.expiration_date, None);
    }

    #[test]
    fn parse_posting_salary_field_lands_in_description() {
        let now = fixed_now();
        let posting = json!({
            "title": "Scientist",
            "payRange": "$95,000 - $120,000",
        });
        let job = parse_posting(&posting, "https://a.wd1.myworkdayjobs.com/C", "a", now).unwrap();
        assert!(job.description.contains("Salary: $95,000 - $120,000"));
    }

    #[test]
    fn untitled_posting_skipped() {
        let now = fixed_now();
        assert!(parse_posting(&json!({"title": "  "}), "https://b", "a", now).is_none());
        assert!(parse_posting(&json!({}), "https://b", "a", now).is_none());
    }

    #[test]
    fn company_names() {
        assert_eq!(company_from_source("pfizer_careers"), "Pfizer");
        assert_eq!(company_from_source("bristol_myers"), "Bristol Myers");
    }
}
