//! Rendered marker images
//!
//! Every subsystem render for a marker targets the same `<label>.png`; the
//! last successful render is the one kept.

use crate::collaborators::ArtifactRenderer;
use crate::error::RenderFailure;
use crate::layout::{is_safe_file_stem, RecordingLayout};
use crate::model::SourceMarker;
use image::{ImageFormat, RgbaImage};
use lrmm_common::config::RenderConfig;
use lrmm_common::files;
use std::fs;
use tracing::{debug, info, warn};

/// Writes and deletes marker artifacts below a recording's artifact directory
pub struct ArtifactStore<'a> {
    layout: &'a RecordingLayout,
    renderer: &'a dyn ArtifactRenderer,
    config: &'a RenderConfig,
}

impl<'a> ArtifactStore<'a> {
    pub fn new(
        layout: &'a RecordingLayout,
        renderer: &'a dyn ArtifactRenderer,
        config: &'a RenderConfig,
    ) -> Self {
        Self {
            layout,
            renderer,
            config,
        }
    }

    /// Render `marker` on each of `subsystems`
    ///
    /// Returns the stored (recording-relative) image path if at least one
    /// render was written. Failures are logged; they never abort the caller.
    pub fn render(&self, marker: &SourceMarker, subsystems: &[u32]) -> Option<String> {
        if !is_safe_file_stem(&marker.label) {
            warn!(
                "Marker label {:?} is not usable as a file name, no image rendered",
                marker.label
            );
            return None;
        }

        let mut written = false;

        for &subsystem in subsystems {
            match self.render_one(marker, subsystem) {
                Ok(()) => written = true,
                Err(RenderFailure::NoImage { label, subsystem }) => {
                    warn!("Oops, no image available for marker {} on subsystem {}", label, subsystem);
                }
                Err(e) => {
                    warn!("Artifact for marker {} not created: {}", marker.label, e);
                }
            }
        }

        if written {
            Some(self.layout.artifact_relative_path(&marker.label))
        } else {
            None
        }
    }

    fn render_one(&self, marker: &SourceMarker, subsystem: u32) -> Result<(), RenderFailure> {
        let image = self.renderer.render(marker, subsystem, self.config)?;
        self.write(&marker.label, &image)?;
        debug!(
            "Rendered marker {} on subsystem {} ({}x{})",
            marker.label,
            subsystem,
            image.width(),
            image.height()
        );
        Ok(())
    }

    fn write(&self, label: &str, image: &RgbaImage) -> Result<(), RenderFailure> {
        let path = self.layout.artifact_path(label);
        let write_failure = |message: String| RenderFailure::Write {
            path: path.clone(),
            message,
        };

        fs::create_dir_all(self.layout.artifact_dir()).map_err(|e| write_failure(e.to_string()))?;
        image
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| write_failure(e.to_string()))
    }
}

/// Delete the file behind a stored artifact path, if any
pub fn delete(layout: &RecordingLayout, stored: &str) -> bool {
    if stored.is_empty() {
        return false;
    }
    files::remove_file_quietly(&layout.resolve(stored))
}

/// Delete the image of `label` if `stored` is the path rendering produced
///
/// Any other path (absolute, elsewhere in the recording, from another
/// machine) is logged and left alone.
pub fn delete_image(layout: &RecordingLayout, label: &str, stored: &str) -> bool {
    if !layout.is_own_artifact(label, stored) {
        warn!(
            "Image {} of marker {} was not produced here, not deleting it",
            stored, label
        );
        return false;
    }
    files::remove_file_quietly(&layout.artifact_path(label))
}

/// Delete the whole artifact directory
pub fn purge(layout: &RecordingLayout) {
    let dir = layout.artifact_dir();
    if files::remove_dir_quietly(&dir) {
        info!("Marker images removed - {}", dir.display());
    }
}
