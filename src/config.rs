use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::extract::dates;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub filters: FilterConfig,
    pub sites: Vec<SiteConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FetchConfig {
    /// Pause between requests to the same run's sites, in seconds.
    #[serde(default)]
    pub sleep_seconds: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "default_days_back")]
    pub days_back: u32,
    #[serde(default)]
    pub include_keywords: Vec<String>,
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
    #[serde(default)]
    pub job_titles: Vec<String>,
    #[serde(default)]
    pub title_must_contain: Vec<String>,
    #[serde(default)]
    pub title_exclude: Vec<String>,
    #[serde(default = "default_target_states")]
    pub target_states: BTreeSet<String>,
    #[serde(default = "default_max_age_days")]
    pub max_age_days: i64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            days_back: default_days_back(),
            include_keywords: Vec::new(),
            exclude_keywords: Vec::new(),
            job_titles: Vec::new(),
            title_must_contain: Vec::new(),
            title_exclude: Vec::new(),
            target_states: default_target_states(),
            max_age_days: default_max_age_days(),
        }
    }
}

fn default_days_back() -> u32 {
    1
}

fn default_target_states() -> BTreeSet<String> {
    ["NY", "NJ", "PA", "MA"].iter().map(|s| s.to_string()).collect()
}

fn default_max_age_days() -> i64 {
    dates::DEFAULT_MAX_AGE_DAYS
}

#[derive(Debug, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(flatten)]
    pub kind: SiteKind,
}

fn default_enabled() -> bool {
    true
}

/// One variant per source family, selected by the `type` field. An unknown
/// type fails deserialization outright: that is a configuration error, not
/// noisy input.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SiteKind {
    Generic(GenericSite),
    Workday(WorkdaySite),
}

/// Static HTML list pages parsed with CSS selectors.
#[derive(Debug, Deserialize)]
pub struct GenericSite {
    #[serde(default)]
    pub base_url: Option<String>,
    pub start_urls: Vec<String>,
    pub selectors: Selectors,
    #[serde(default)]
    pub detail_page: DetailPage,
}

#[derive(Debug, Deserialize)]
pub struct Selectors {
    pub list_item: String,
    pub title: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    /// Attribute to read the date from; element text when absent.
    #[serde(default)]
    pub date_attr: Option<String>,
    pub url: String,
    /// Attribute holding the job link, "href" when absent.
    #[serde(default)]
    pub url_attr: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DetailPage {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub description_selector: Option<String>,
}

/// A Workday career portal, scraped through its JSON search API.
#[derive(Debug, Deserialize)]
pub struct WorkdaySite {
    pub url: String,
    #[serde(default)]
    pub search_terms: Vec<String>,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_max_results() -> usize {
    10_000
}

pub fn load(path: &Path) -> Result<AppConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let mut config: AppConfig = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    if config.sites.is_empty() {
        bail!("Config must include at least one site");
    }
    config.filters.target_states = config
        .filters
        .target_states
        .iter()
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
        .collect();
    Ok(config)
}

// ── Tests ──
