use std::fs;
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};

use crate::model::JobRecord;

const CSV_HEADER: &[&str] = &[
    "#",
    "title",
    "company",
    "url",
    "location",
    "state",
    "salary",
    "date_posted",
    "expiration_date",
    "source",
];

pub fn write_csv(path: &Path, records: &[JobRecord]) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(CSV_HEADER)?;
    for (i, record) in records.iter().enumerate() {
        writer.write_record(&[
            (i + 1).to_string(),
            record.title.clone(),
            record.company.clone(),
            record.url.clone(),
            record.location.clone().unwrap_or_else(|| "N/A".to_string()),
            record.state.clone().unwrap_or_else(|| "N/A".to_string()),
            record.salary.clone().unwrap_or_else(|| "N/A".to_string()),
            format_date(record.date_posted),
            format_date(record.expiration_date),
            record.source.clone(),
        ])?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn write_json(path: &Path, records: &[JobRecord]) -> Result<()> {
    ensure_parent(path)?;
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, records)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    Ok(())
}

fn format_date(date: Option<chrono::DateTime<chrono::Utc>>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_record;
    use chrono::TimeZone;

    #[test]
    fn csv_has_header_and_rows() {
        let dir = std::env::temp_dir().join("jobscout_csv_test");
        let path = dir.join("out.csv");
        let mut record = test_record("https://example.com/jobs/1");
        record.state = Some("MA".to_string());
        record.date_posted = Some(chrono::Utc.with_ymd_and_hms(2025, 1, 5, 0, 0, 0).unwrap());
        write_csv(&path, &[record]).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let mut lines = raw.lines();
        assert!(lines.next().unwrap().starts_with("#,title,company"));
        let row = lines.next().unwrap();
        assert!(row.contains("https://example.com/jobs/1"));
        assert!(row.contains("2025-01-05"));
        assert!(row.contains("N/A"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn json_roundtrips_as_array() {
        let dir = std::env::temp_dir().join("jobscout_json_test");
        let path = dir.join("out.json");
        write_json(&path, &[test_record("u1"), test_record("u2")]).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
        assert_eq!(value[0]["url"], "u1");
        std::fs::remove_dir_all(&dir).ok();
    }
}
