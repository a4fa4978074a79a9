use chrono::{DateTime, Utc};
use serde::Serialize;

/// A single job posting, as produced by a source adapter and refined by the
/// pipeline. Every refinement step builds a new record via struct update;
/// nothing mutates an existing one.
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub title: String,
    pub company: String,
    /// Dedup identity. Opaque, compared by exact string equality.
    pub url: String,
    pub description: String,
    pub date_posted: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub source: String,
    pub location: Option<String>,
    /// Two-letter US state code. Derived, never taken from a source as-is.
    pub state: Option<String>,
    /// Raw matched salary substring. Derived, never taken from a source as-is.
    pub salary: Option<String>,
}

impl JobRecord {
    /// Title and description joined for keyword matching.
    pub fn combined_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }

    /// A record is ingestable only with a non-empty title and url.
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty() && !self.url.trim().is_empty()
    }
}

#[cfg(test)]
pub(crate) fn test_record(url: &str) -> JobRecord {
    JobRecord {
        title: "Scientist".to_string(),
        company: "Acme".to_string(),
        url: url.to_string(),
        description: String::new(),
        date_posted: None,
        expiration_date: None,
        source: "test".to_string(),
        location: None,
        state: None,
        salary: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_requires_title_and_url() {
        let mut r = test_record("https://example.com/jobs/1");
        assert!(r.is_valid());
        r.title = "   ".to_string();
        assert!(!r.is_valid());
        r.title = "Scientist".to_string();
        r.url = String::new();
        assert!(!r.is_valid());
    }

    #[test]
    fn combined_text_joins_title_and_description() {
        let mut r = test_record("u");
        r.description = "CRISPR lab".to_string();
        assert_eq!(r.combined_text(), "Scientist CRISPR lab");
    }
}
