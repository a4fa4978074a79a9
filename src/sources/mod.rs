pub mod generic;
pub mod workday;

use anyhow::Result;

use crate::config::{SiteConfig, SiteKind};
use crate::fetch::Fetcher;
use crate::model::JobRecord;

/// Fetch one configured site through its adapter.
///
/// Remote failures degrade to an empty batch inside the adapters; the only
/// errors surfaced here are configuration contract violations such as an
/// invalid CSS selector.
pub async fn fetch_site(fetcher: &Fetcher, site: &SiteConfig) -> Result<Vec<JobRecord>> {
    match &site.kind {
        SiteKind::Generic(cfg) => generic::fetch(fetcher, cfg, &site.name).await,
        SiteKind::Workday(cfg) => Ok(workday::fetch(fetcher, cfg, &site.name).await),
    }
}
