//! Read-only inspection of a recording's sidecar document

use crate::document;
use crate::error::{Error, Result};
use crate::layout::RecordingLayout;
use crate::model::MarkerRecord;
use lrmm_common::time;
use serde::Serialize;
use std::path::PathBuf;

/// Decode the document of `layout` without touching anything
pub fn load_records(layout: &RecordingLayout) -> Result<Vec<MarkerRecord>> {
    let path = layout.document_path();
    if !path.is_file() {
        return Err(Error::NotFound(path.display().to_string()));
    }
    Ok(document::load(&path)?)
}

/// A file referenced by a record that does not exist
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingFile {
    pub label: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub records: usize,
    pub missing: Vec<MissingFile>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Verify that every image and drawing referenced by the document exists
pub fn check(layout: &RecordingLayout) -> Result<CheckReport> {
    let records = load_records(layout)?;
    let mut missing = Vec::new();

    for record in &records {
        let referenced = record
            .image_path
            .as_deref()
            .into_iter()
            .chain(record.draw_path.path());
        for stored in referenced {
            let path = layout.resolve(stored);
            if !path.is_file() {
                missing.push(MissingFile {
                    label: record.label.clone(),
                    path,
                });
            }
        }
    }

    Ok(CheckReport {
        records: records.len(),
        missing,
    })
}

/// One line per record for listings
pub fn summary_line(record: &MarkerRecord) -> String {
    format!(
        "#{:<4} {:<16} {:<24} {:<12} {}",
        record.index,
        record.label,
        time::format_utc_millis(record.timestamp_millis).unwrap_or_default(),
        record.classification,
        record.annotation.lines().next().unwrap_or_default()
    )
}

pub fn detail(record: &MarkerRecord) -> String {
    let mut lines = vec![
        format!("Marker #{} {}", record.index, record.label),
        format!(
            "  Time:           {}",
            time::format_utc_millis(record.timestamp_millis).unwrap_or_default()
        ),
        format!("  Location:       {}", record.location_text()),
        format!("  Altitude:       {} m", record.altitude_m),
        format!("  Depth:          {} m", record.depth_m),
        format!("  Range:          {} m", record.range_m),
        format!("  Height:         {} m", record.height_m),
        format!("  Classification: {}", record.classification),
        format!(
            "  Image:          {}",
            record.image_path.as_deref().unwrap_or("none")
        ),
        format!("  Drawing:        {}", record.draw_path.as_str()),
        "  Annotation:".to_string(),
    ];
    lines.extend(record.annotation.lines().map(|l| format!("    {}", l)));
    lines.join("\n")
}
