use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use scraper::{ElementRef, Html, Selector};
use tracing::info;

use crate::config::{GenericSite, Selectors};
use crate::extract::dates;
use crate::fetch::Fetcher;
use crate::model::JobRecord;

/// Scrape a static-HTML job board: CSS-selected list items from each start
/// URL, then an optional detail pass filling empty descriptions.
pub async fn fetch(fetcher: &Fetcher, site: &GenericSite, source: &str) -> Result<Vec<JobRecord>> {
    let selectors = CompiledSelectors::compile(&site.selectors)?;
    let detail_selector = match &site.detail_page.description_selector {
        Some(css) if site.detail_page.enabled => Some(parse_selector(css)?),
        _ => None,
    };

    let now = Utc::now();
    let mut records = Vec::new();
    for url in &site.start_urls {
        let html = fetcher.get(url).await;
        if html.is_empty() {
            continue;
        }
        records.extend(parse_list_page(
            &html,
            &selectors,
            site.base_url.as_deref(),
            source,
            now,
        ));
    }
    info!("{}: {} records from {} pages", source, records.len(), site.start_urls.len());

    if let Some(selector) = detail_selector {
        records = deepen(fetcher, records, &selector).await;
    }

    Ok(records)
}

/// Parse one list page into records. Items without a title or link are
/// skipped.
pub fn parse_list_page(
    html: &str,
    selectors: &CompiledSelectors,
    base_url: Option<&str>,
    source: &str,
    now: DateTime<Utc>,
) -> Vec<JobRecord> {
    let document = Html::parse_document(html);
    let mut records = Vec::new();

    for node in document.select(&selectors.list_item) {
        let title = select_text(node, Some(&selectors.title));
        let url_raw = select_attr(node, Some(&selectors.url), selectors.url_attr.as_deref());
        if title.is_empty() || url_raw.is_empty() {
            continue;
        }

        let company = select_text(node, selectors.company.as_ref());
        let description = select_text(node, selectors.description.as_ref());
        let location = select_text(node, selectors.location.as_ref());

        let date_raw = match (&selectors.date, &selectors.date_attr) {
            (Some(sel), Some(attr)) => select_attr(node, Some(sel), Some(attr)),
            (Some(sel), None) => select_text(node, Some(sel)),
            _ => String::new(),
        };
        let (date_posted, expiration_date) =
            dates::extract_all_dates(&date_raw, now, dates::DEFAULT_MAX_AGE_DAYS);

        records.push(JobRecord {
            title,
            company: if company.is_empty() {
                "Unknown".to_string()
            } else {
                company
            },
            url: join_url(base_url, &url_raw),
            description,
            date_posted,
            expiration_date,
            source: source.to_string(),
            location: Some(location).filter(|l| !l.is_empty()),
            state: None,
            salary: None,
        });
    }

    records
}

/// Fetch detail pages for records the list view left without a description.
async fn deepen(fetcher: &Fetcher, records: Vec<JobRecord>, selector: &Selector) -> Vec<JobRecord> {
    let missing = records.iter().filter(|r| r.description.is_empty()).count();
    if missing == 0 {
        return records;
    }

    let pb = ProgressBar::new(missing as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} detail pages")
            .unwrap()
            .progress_chars("=> "),
    );

    let mut deepened = Vec::with_capacity(records.len());
    for record in records {
        if !record.description.is_empty() {
            deepened.push(record);
            continue;
        }
        let html = fetcher.get(&record.url).await;
        let description = if html.is_empty() {
            String::new()
        } else {
            extract_detail_description(&html, selector)
        };
        deepened.push(JobRecord {
            description,
            ..record
        });
        pb.inc(1);
    }
    pb.finish_and_clear();
    deepened
}

pub fn extract_detail_description(html: &str, selector: &Selector) -> String {
    let document = Html::parse_document(html);
    document
        .select(selector)
        .next()
        .map(element_text)
        .unwrap_or_default()
}

pub struct CompiledSelectors {
    list_item: Selector,
    title: Selector,
    company: Option<Selector>,
    date: Option<Selector>,
    date_attr: Option<String>,
    url: Selector,
    url_attr: Option<String>,
    description: Option<Selector>,
    location: Option<Selector>,
}

impl CompiledSelectors {
    pub fn compile(selectors: &Selectors) -> Result<Self> {
        Ok(Self {
            list_item: parse_selector(&selectors.list_item)?,
            title: parse_selector(&selectors.title)?,
            company: selectors.company.as_deref().map(parse_selector).transpose()?,
            date: selectors.date.as_deref().map(parse_selector).transpose()?,
            date_attr: selectors.date_attr.clone(),
            url: parse_selector(&selectors.url)?,
            url_attr: selectors.url_attr.clone(),
            description: selectors
                .description
                .as_deref()
                .map(parse_selector)
                .transpose()?,
            location: selectors.location.as_deref().map(parse_selector).transpose()?,
        })
    }
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid CSS selector '{}': {}", css, e))
}

fn element_text(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn select_text(node: ElementRef, selector: Option<&Selector>) -> String {
    let Some(selector) = selector else {
        return String::new();
    };
    node.select(selector).next().map(element_text).unwrap_or_default()
}

fn select_attr(node: ElementRef, selector: Option<&Selector>, attr: Option<&str>) -> String {
    let Some(selector) = selector else {
        return String::new();
    };
    node.select(selector)
        .next()
        .and_then(|el| el.value().attr(attr.unwrap_or("href")))
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn join_url(base_url: Option<&str>, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    let Some(base) = base_url else {
        return href.to_string();
    };
    match reqwest::Url::parse(base).and_then(|b| b.join(href)) {
        Ok(joined) => joined.to_string(),
        Err(_) => href.to_string(),
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Selectors;
    use chrono::TimeZone;

    const LIST_HTML: &str = r#"
        <html><body>
        <div class="job">
            <h2 class="title">Research Scientist</h2>
            <span class="company">Helix Bio</span>
            <span class="date">2 days ago</span>
            <span class="loc">Boston, MA</span>
            <a class="link" href="/jobs/42">view</a>
            <p class="desc">CRISPR work. $95,000</p>
        </div>
        <div class="job">
            <h2 class="title"></h2>
            <a class="link" href="/jobs/untitled">view</a>
        </div>
        </body></html>
    "#;

    fn selectors() -> CompiledSelectors {
        CompiledSelectors::compile(&Selectors {
            list_item: "div.job".to_string(),
            title: "h2.title".to_string(),
            company: Some("span.company".to_string()),
            date: Some("span.date".to_string()),
            date_attr: None,
            url: "a.link".to_string(),
            url_attr: None,
            description: Some("p.desc".to_string()),
            location: Some("span.loc".to_string()),
        })
        .unwrap()
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn parses_items_and_skips_untitled() {
        let now = fixed_now();
        let records = parse_list_page(
            LIST_HTML,
            &selectors(),
            Some("https://example.com"),
            "board",
            now,
        );
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.title, "Research Scientist");
        assert_eq!(record.company, "Helix Bio");
        assert_eq!(record.url, "https://example.com/jobs/42");
        assert_eq!(record.location.as_deref(), Some("Boston, MA"));
        assert_eq!(record.date_posted, Some(now - chrono::Duration::days(2)));
    }

    #[test]
    fn absolute_urls_left_alone() {
        assert_eq!(
            join_url(Some("https://example.com"), "https://other.com/j/1"),
            "https://other.com/j/1"
        );
        assert_eq!(
            join_url(Some("https://example.com"), "/j/1"),
            "https://example.com/j/1"
        );
        assert_eq!(join_url(None, "/j/1"), "/j/1");
    }

    #[test]
    fn invalid_selector_is_a_config_error() {
        let mut bad = Selectors {
            list_item: ":::not a selector".to_string(),
            title: "h2".to_string(),
            company: None,
            date: None,
            date_attr: None,
            url: "a".to_string(),
            url_attr: None,
            description: None,
            location: None,
        };
        assert!(CompiledSelectors::compile(&bad).is_err());
        bad.list_item = "div".to_string();
        assert!(CompiledSelectors::compile(&bad).is_ok());
    }

    #[test]
    fn detail_description_extraction() {
        let selector = parse_selector("div.posting").unwrap();
        let html = "<html><body><div class='posting'><p>Line one</p><p>Line two</p></div></body></html>";
        assert_eq!(extract_detail_description(html, &selector), "Line one Line two");
    }
}
