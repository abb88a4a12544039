//! On-disk layout of the marker data of one recording

use lrmm_common::config::LayoutConfig;
use std::path::{Path, PathBuf};

/// Extension of rendered marker images
pub const ARTIFACT_EXTENSION: &str = "png";

/// Whether `label` can name a file directly inside the artifact directory
///
/// Rejects empty labels, `.`/`..` and anything containing a path separator.
pub fn is_safe_file_stem(label: &str) -> bool {
    !label.is_empty()
        && label != "."
        && label != ".."
        && !label.chars().any(|c| matches!(c, '/' | '\\' | '\0'))
}

/// Paths of the sidecar document and artifact directory of a recording
///
/// ```text
/// <recording>/<data_dir>/<document_name>      e.g. mra/marks.xml
/// <recording>/<data_dir>/<artifact_dir>/      e.g. mra/markers/
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingLayout {
    recording_dir: PathBuf,
    data_dir: String,
    document_name: String,
    artifact_dir: String,
}

impl RecordingLayout {
    pub fn new(recording_dir: impl Into<PathBuf>, config: &LayoutConfig) -> Self {
        Self {
            recording_dir: recording_dir.into(),
            data_dir: config.data_dir.clone(),
            document_name: config.document_name.clone(),
            artifact_dir: config.artifact_dir.clone(),
        }
    }

    pub fn recording_dir(&self) -> &Path {
        &self.recording_dir
    }

    pub fn data_dir(&self) -> PathBuf {
        self.recording_dir.join(&self.data_dir)
    }

    pub fn document_path(&self) -> PathBuf {
        self.data_dir().join(&self.document_name)
    }

    pub fn artifact_dir(&self) -> PathBuf {
        self.data_dir().join(&self.artifact_dir)
    }

    /// Value stored in a record's `image_path` for `label`
    pub fn artifact_relative_path(&self, label: &str) -> String {
        format!(
            "{}/{}/{}.{}",
            self.data_dir, self.artifact_dir, label, ARTIFACT_EXTENSION
        )
    }

    /// Absolute location of the artifact for `label`
    pub fn artifact_path(&self, label: &str) -> PathBuf {
        self.recording_dir.join(self.artifact_relative_path(label))
    }

    /// Whether `stored` is the image path this layout produces for `label`
    ///
    /// Older documents store the same path with a leading `/`.
    pub fn is_own_artifact(&self, label: &str, stored: &str) -> bool {
        is_safe_file_stem(label)
            && stored.trim_start_matches('/') == self.artifact_relative_path(label)
    }

    /// Absolute location of a path stored in the document
    ///
    /// Older documents store paths with a leading `/` that are still relative
    /// to the recording; those resolve under the recording unless only the
    /// absolute file exists.
    pub fn resolve(&self, stored: &str) -> PathBuf {
        let trimmed = stored.trim_start_matches(&['/', '\\'][..]);
        if trimmed.len() == stored.len() {
            return self.recording_dir.join(stored);
        }

        let under_recording = self.recording_dir.join(trimmed);
        if under_recording.exists() {
            return under_recording;
        }
        let absolute = PathBuf::from(stored);
        if absolute.exists() {
            return absolute;
        }
        under_recording
    }
}
