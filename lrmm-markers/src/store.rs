//! Synchronous marker engine for one recording
//!
//! [`MarkerStore`] owns the working list, the artifacts and the sidecar
//! document. Every mutation updates the list, touches the affected artifacts
//! and rewrites the document from the list.
//!
//! A mutation is not atomic across the three stores: a crash between the
//! artifact and document steps can leave them out of step until the next
//! reconciliation, which regenerates whatever no longer matches.

use crate::artifacts;
use crate::collaborators::Collaborators;
use crate::document;
use crate::error::{Error, Result};
use crate::layout::RecordingLayout;
use crate::model::{CopyIdentity, MarkerRecord, MarkerUpdate, SourceMarker};
use crate::reconcile::{self, Assessment, EngineContext, SessionState};
use lrmm_common::config::TomlConfig;
use lrmm_common::{files, time, SessionOutcome};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Outcome of one mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub index: u32,
    pub label: String,
    /// The document reflects the mutation (false: write failed, list updated anyway)
    pub persisted: bool,
    /// The last marker was removed and the session is now empty
    pub emptied: bool,
}

pub struct MarkerStore {
    ctx: EngineContext,
    /// Sidescan markers of the recording, as last seen
    source: Vec<SourceMarker>,
    records: Vec<MarkerRecord>,
    /// Largest index handed out in this session
    highest_index: u32,
    state: SessionState,
}

impl MarkerStore {
    pub fn new(
        recording_dir: impl Into<PathBuf>,
        collaborators: Collaborators,
        config: &TomlConfig,
    ) -> Self {
        Self {
            ctx: EngineContext {
                layout: RecordingLayout::new(recording_dir, &config.layout),
                collaborators,
                render: config.render.clone(),
            },
            source: Vec::new(),
            records: Vec::new(),
            highest_index: 0,
            state: SessionState::Pending,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn recording_dir(&self) -> &Path {
        self.ctx.layout.recording_dir()
    }

    pub fn layout(&self) -> &RecordingLayout {
        &self.ctx.layout
    }

    /// Bring the working list, artifacts and document in line with the source set
    pub fn reconcile(&mut self) -> SessionOutcome {
        self.source = self.snapshot_source();
        self.records.clear();

        let document_path = self.ctx.layout.document_path();
        let assessment = reconcile::assess(&self.source, &document_path);
        self.transition(assessment.state());

        let outcome = match assessment {
            Assessment::Empty => {
                info!("No markers in recording {}", self.recording_dir().display());
                self.discard_files();
                SessionOutcome::Empty
            }
            Assessment::Loaded(records) => {
                info!("Loading markers... {} from {}", records.len(), document_path.display());
                self.records = records;
                SessionOutcome::Loaded
            }
            Assessment::NoDocument => {
                artifacts::purge(&self.ctx.layout);
                self.create();
                SessionOutcome::Created
            }
            Assessment::Stale { persisted } => {
                info!(
                    "Markers document is out of date ({} stored, {} in recording), regenerating",
                    persisted,
                    self.source.len()
                );
                self.discard_files();
                self.create();
                SessionOutcome::Stale
            }
            Assessment::Corrupt(e) => {
                error!("Markers document {} is corrupt: {}", document_path.display(), e);
                artifacts::purge(&self.ctx.layout);
                self.create();
                SessionOutcome::Corrupt
            }
        };

        self.highest_index = self
            .records
            .iter()
            .map(|r| r.index)
            .max()
            .unwrap_or(0)
            .max(self.highest_index);
        outcome
    }

    fn snapshot_source(&self) -> Vec<SourceMarker> {
        let all = self.ctx.collaborators.source.markers();
        let total = all.len();
        let managed: Vec<SourceMarker> = all
            .into_iter()
            .filter(|m| m.is_sidescan() && has_storable_timestamp(m))
            .collect();
        if managed.len() < total {
            debug!("Ignoring {} unmanaged markers", total - managed.len());
        }
        managed
    }

    fn create(&mut self) {
        self.transition(SessionState::Creating);
        info!("Creating markers... {} in recording", self.source.len());

        self.records = reconcile::create_records(&self.ctx, &self.source);
        self.persist();
        self.transition(SessionState::Ready);
    }

    fn transition(&mut self, next: SessionState) {
        debug!("Marker session {} -> {}", self.state, next);
        self.state = next;
    }

    /// Rewrite the document from the working list
    fn persist(&self) -> bool {
        let path = self.ctx.layout.document_path();
        match document::save(&path, &self.records) {
            Ok(()) => {
                info!("Markers document saved - {}", path.display());
                true
            }
            Err(e) => {
                error!("{}", e);
                false
            }
        }
    }

    fn discard_files(&self) {
        files::remove_file_quietly(&self.ctx.layout.document_path());
        artifacts::purge(&self.ctx.layout);
    }

    // ---- Read accessors -------------------------------------------------

    pub fn list_markers(&self) -> &[MarkerRecord] {
        &self.records
    }

    pub fn find_by_label(&self, label: &str) -> Option<&MarkerRecord> {
        self.records.iter().find(|r| r.label == label)
    }

    pub fn find_by_index(&self, index: u32) -> Option<&MarkerRecord> {
        self.records.iter().find(|r| r.index == index)
    }

    /// Position of `label` in the working list
    pub fn position_of(&self, label: &str) -> Option<usize> {
        self.records.iter().position(|r| r.label == label)
    }

    /// Record before `label` in list order
    pub fn previous_marker(&self, label: &str) -> Option<&MarkerRecord> {
        let position = self.position_of(label)?;
        position.checked_sub(1).and_then(|p| self.records.get(p))
    }

    /// Record after `label` in list order
    pub fn next_marker(&self, label: &str) -> Option<&MarkerRecord> {
        let position = self.position_of(label)?;
        self.records.get(position + 1)
    }

    // ---- Mutations ------------------------------------------------------

    /// Add a marker created in the recording
    ///
    /// Only sidescan markers are managed; others return `None`. A label that
    /// already has a record is rebuilt in place under its existing index.
    pub fn add_marker(&mut self, marker: SourceMarker) -> Option<Mutation> {
        if !marker.is_sidescan() {
            debug!("Ignoring non-sidescan marker {}", marker.label);
            return None;
        }
        if !has_storable_timestamp(&marker) {
            return None;
        }

        let label = marker.label.clone();
        let existing = self.position_of(&label);
        let index = match existing {
            Some(position) => self.records[position].index,
            None => self.highest_index + 1,
        };
        let record = self.ctx.build_record(&marker, index);

        match self.source.iter_mut().find(|m| m.label == label) {
            Some(slot) => *slot = marker,
            None => self.source.push(marker),
        }
        match existing {
            Some(position) => {
                warn!("Marker {} already exists, replacing #{}", label, index);
                self.records[position].copy_from(&record, CopyIdentity::Preserve);
            }
            None => {
                info!("Marker {} added as #{}", label, index);
                self.records.push(record);
                self.highest_index = index;
            }
        }
        if !self.state.is_active() {
            self.transition(SessionState::Ready);
        }

        Some(Mutation {
            index,
            label,
            persisted: self.persist(),
            emptied: false,
        })
    }

    /// Apply the user-editable fields of `update` to the record for `label`
    pub fn update_marker(&mut self, label: &str, update: &MarkerUpdate) -> Result<Mutation> {
        let position = self
            .position_of(label)
            .ok_or_else(|| Error::NotFound(label.to_string()))?;

        let record = &mut self.records[position];
        if update.draw_path.is_not_applicable() {
            if let Some(previous) = record.draw_path.path() {
                artifacts::delete(&self.ctx.layout, previous);
            }
        }
        record.apply(update);
        let index = record.index;
        debug!("Marker {} updated ({})", label, record.classification);

        self.ctx
            .collaborators
            .source
            .set_description(label, &update.annotation);
        if let Some(marker) = self.source.iter_mut().find(|m| m.label == label) {
            marker.description = Some(update.annotation.clone());
        }

        Ok(Mutation {
            index,
            label: label.to_string(),
            persisted: self.persist(),
            emptied: false,
        })
    }

    /// Delete the marker for `label`, here and in the recording
    pub fn remove_marker(&mut self, label: &str) -> Result<Mutation> {
        let mutation = self.remove(label)?;
        self.ctx.collaborators.source.remove_marker(label);
        Ok(mutation)
    }

    /// The recording deleted the marker for `label`; drop its record
    pub fn source_marker_removed(&mut self, label: &str) -> Result<Mutation> {
        self.remove(label)
    }

    fn remove(&mut self, label: &str) -> Result<Mutation> {
        let position = self
            .position_of(label)
            .ok_or_else(|| Error::NotFound(label.to_string()))?;

        let record = self.records.remove(position);
        if let Some(image) = record.image_path.as_deref() {
            artifacts::delete_image(&self.ctx.layout, &record.label, image);
        }
        if let Some(drawing) = record.draw_path.path() {
            artifacts::delete(&self.ctx.layout, drawing);
        }
        self.source.retain(|m| m.label != label);
        info!("Marker {} (#{}) removed", record.label, record.index);

        if self.records.is_empty() {
            self.empty_session();
            return Ok(Mutation {
                index: record.index,
                label: record.label,
                persisted: true,
                emptied: true,
            });
        }

        Ok(Mutation {
            index: record.index,
            label: record.label,
            persisted: self.persist(),
            emptied: false,
        })
    }

    fn empty_session(&mut self) {
        info!("Last marker removed, clearing markers of {}", self.recording_dir().display());
        self.discard_files();
        self.transition(SessionState::Empty);
    }

    /// Drop the working and source lists; files are left as they are
    pub fn close(&mut self) {
        self.records.clear();
        self.source.clear();
        self.transition(SessionState::Pending);
        info!("Marker session closed - {}", self.recording_dir().display());
    }
}

/// The document can only hold timestamps chrono can represent
fn has_storable_timestamp(marker: &SourceMarker) -> bool {
    if time::millis_to_datetime(marker.timestamp_millis).is_some() {
        return true;
    }
    warn!(
        "Ignoring marker {}: timestamp {} ms is out of range",
        marker.label, marker.timestamp_millis
    );
    false
}
