use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::info;

use crate::config::{AppConfig, FilterConfig};
use crate::extract;
use crate::fetch::Fetcher;
use crate::filters::{self, FilterStats, KeywordFilters};
use crate::model::JobRecord;
use crate::rank;
use crate::sources;

/// The three ordered result sets of a run plus its statistics.
pub struct PipelineOutput {
    pub unfiltered: Vec<JobRecord>,
    pub filtered: Vec<JobRecord>,
    pub high_confidence: Vec<JobRecord>,
    pub stats: RunStats,
}

/// Per-run counters, threaded back to the caller rather than logged from
/// inside the stages.
#[derive(Debug, Default)]
pub struct RunStats {
    pub fetched: usize,
    pub invalid: usize,
    pub duplicates: usize,
    pub outside_target: usize,
    pub filter: FilterStats,
}

impl RunStats {
    pub fn print(&self) {
        println!(
            "Fetched {} records: {} invalid, {} duplicates, {} outside target states.",
            self.fetched, self.invalid, self.duplicates, self.outside_target
        );
        let f = &self.filter;
        println!(
            "Keyword chain on {}: -{} stale, -{} title allow-list, -{} title required, -{} title excluded, -{} include miss, -{} exclude hit, -{} hourly; kept {}.",
            f.input,
            f.stale_date,
            f.title_allow,
            f.title_required,
            f.title_excluded,
            f.include_miss,
            f.exclude_hit,
            f.hourly_pay,
            f.kept
        );
    }
}

/// Fetch every enabled source and run the batch through the full pipeline.
pub async fn run(
    config: &AppConfig,
    extra_keywords: &[String],
    now: DateTime<Utc>,
) -> Result<PipelineOutput> {
    let fetcher = Fetcher::new(config.fetch.sleep_seconds)?;

    let mut all: Vec<JobRecord> = Vec::new();
    for site in config.sites.iter().filter(|s| s.enabled) {
        let records = sources::fetch_site(&fetcher, site).await?;
        info!("{}: {} records", site.name, records.len());
        all.extend(records);
    }

    Ok(process(all, &config.filters, extra_keywords, now))
}

/// The synchronous core: dedupe, enrich, filter and rank one merged batch.
pub fn process(
    records: Vec<JobRecord>,
    filters_config: &FilterConfig,
    extra_keywords: &[String],
    now: DateTime<Utc>,
) -> PipelineOutput {
    let fetched = records.len();

    let valid: Vec<JobRecord> = records.into_iter().filter(JobRecord::is_valid).collect();
    let invalid = fetched - valid.len();

    let before_dedupe = valid.len();
    let unique = dedupe(valid);
    let duplicates = before_dedupe - unique.len();

    let max_age_days = filters_config.max_age_days;
    let enriched: Vec<JobRecord> = unique
        .into_par_iter()
        .map(|record| extract::enrich(record, now, max_age_days))
        .collect();

    let unfiltered = rank::rank(enriched.clone(), now);

    let (located, outside_target) =
        filters::filter_by_location(enriched, &filters_config.target_states);
    let keyword_filters = KeywordFilters::new(filters_config, extra_keywords, now);
    let (kept, filter_stats) = keyword_filters.apply(located);

    let high_confidence: Vec<JobRecord> = kept
        .iter()
        .filter(|record| keyword_filters.title_keyword_matches(record) >= 2)
        .cloned()
        .collect();

    PipelineOutput {
        unfiltered,
        filtered: rank::rank(kept, now),
        high_confidence: rank::rank(high_confidence, now),
        stats: RunStats {
            fetched,
            invalid,
            duplicates,
            outside_target,
            filter: filter_stats,
        },
    }
}

/// Drop records whose url was already seen, keeping first-seen order.
pub fn dedupe(records: Vec<JobRecord>) -> Vec<JobRecord> {
    let mut seen: HashSet<String> = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.url.clone()))
        .collect()
}

// ── Tests ──
