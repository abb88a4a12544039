//! Source marker set vs. sidecar document reconciliation
//!
//! ```text
//! open ─┬─ no source markers ──────────────────────────────▶ Empty
//!       ├─ no document ──▶ NoDocument ──▶ Creating ─────────▶ Ready
//!       └─ document ─────▶ DocumentPresent
//!                            ├─ decode error ─▶ Corrupt ─▶ Creating ─▶ Ready
//!                            ├─ labels differ ▶ Stale ───▶ Creating ─▶ Ready
//!                            └─ labels match ─────────────────────────▶ Loaded
//! ```

use crate::artifacts::ArtifactStore;
use crate::collaborators::Collaborators;
use crate::document;
use crate::error::DecodeError;
use crate::layout::RecordingLayout;
use crate::metrics::MetricDeriver;
use crate::model::{CopyIdentity, MarkerRecord, SourceMarker};
use lrmm_common::config::RenderConfig;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Lifecycle state of a marker session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not reconciled yet
    Pending,
    /// No source markers; document and artifacts removed, feature disabled
    Empty,
    NoDocument,
    DocumentPresent,
    /// Document reused as-is
    Loaded,
    Stale,
    Corrupt,
    Creating,
    /// Records (re)generated
    Ready,
}

impl SessionState {
    /// Records are available and mutations are meaningful
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Loaded | SessionState::Ready)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Pending => "pending",
            SessionState::Empty => "empty",
            SessionState::NoDocument => "no document",
            SessionState::DocumentPresent => "document present",
            SessionState::Loaded => "loaded",
            SessionState::Stale => "stale",
            SessionState::Corrupt => "corrupt",
            SessionState::Creating => "creating",
            SessionState::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// Result of comparing the source set with the persisted document
#[derive(Debug)]
pub enum Assessment {
    Empty,
    NoDocument,
    /// Document matches the source set and can be reused
    Loaded(Vec<MarkerRecord>),
    /// Document decoded but describes a different marker set
    Stale { persisted: usize },
    Corrupt(DecodeError),
}

impl Assessment {
    pub fn state(&self) -> SessionState {
        match self {
            Assessment::Empty => SessionState::Empty,
            Assessment::NoDocument => SessionState::NoDocument,
            Assessment::Loaded(_) => SessionState::Loaded,
            Assessment::Stale { .. } => SessionState::Stale,
            Assessment::Corrupt(_) => SessionState::Corrupt,
        }
    }
}

/// Decide how a session opens
pub fn assess(source: &[SourceMarker], document_path: &Path) -> Assessment {
    if source.is_empty() {
        return Assessment::Empty;
    }
    if !document_path.is_file() {
        return Assessment::NoDocument;
    }

    match document::load(document_path) {
        Ok(records) if labels_match(source, &records) => Assessment::Loaded(records),
        Ok(records) => Assessment::Stale {
            persisted: records.len(),
        },
        Err(e) => Assessment::Corrupt(e),
    }
}

/// Same count and every source label present in the document
pub fn labels_match(source: &[SourceMarker], persisted: &[MarkerRecord]) -> bool {
    if source.len() != persisted.len() {
        return false;
    }
    let labels: HashSet<&str> = persisted.iter().map(|r| r.label.as_str()).collect();
    source.iter().all(|m| labels.contains(m.label.as_str()))
}

/// What building a record needs from the session
pub struct EngineContext {
    pub layout: RecordingLayout,
    pub collaborators: Collaborators,
    pub render: RenderConfig,
}

impl EngineContext {
    /// Derive metrics, render artifacts and assemble the record for `marker`
    pub fn build_record(&self, marker: &SourceMarker, index: u32) -> MarkerRecord {
        let c = &self.collaborators;
        let metrics = MetricDeriver::new(c.samples.as_ref(), c.vehicle.as_ref()).derive(marker);
        let subsystems = c.samples.subsystems();
        let image_path = ArtifactStore::new(&self.layout, c.renderer.as_ref(), &self.render)
            .render(marker, &subsystems);

        debug!(
            "Marker {} -> #{} (image: {})",
            marker.label,
            index,
            image_path.as_deref().unwrap_or("none")
        );
        MarkerRecord::from_source(marker, index, metrics, image_path)
    }
}

/// Build records for the whole source set, indices ascending from 1
///
/// A repeated label overwrites the earlier record's contents.
pub fn create_records(ctx: &EngineContext, source: &[SourceMarker]) -> Vec<MarkerRecord> {
    let mut records: Vec<MarkerRecord> = Vec::with_capacity(source.len());
    let mut next_index = 1;

    for marker in source {
        let record = ctx.build_record(marker, next_index);
        match records.iter_mut().find(|r| r.is_same_marker(&record)) {
            Some(existing) => existing.copy_from(&record, CopyIdentity::Preserve),
            None => {
                records.push(record);
                next_index += 1;
            }
        }
    }

    records
}
