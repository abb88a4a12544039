//! Marker record model
//!
//! Two records are the same marker iff their labels are equal (exact,
//! case-sensitive). The index is a display-oriented secondary key.

use crate::error::DecodeError;
use crate::metrics::MarkerMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Annotation given to new records whose source marker has no description
pub const PLACEHOLDER_ANNOTATION: &str = "<Your annotation here.>";

/// Persisted text of [`DrawPath::NotApplicable`]
pub const NOT_APPLICABLE: &str = "N/A";

/// Marker classification tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    #[default]
    Undefined,
    None,
    Cable,
    Pipe,
    Rock,
    Wreck,
    Unknown,
}

impl Classification {
    pub const ALL: [Classification; 7] = [
        Classification::Undefined,
        Classification::None,
        Classification::Cable,
        Classification::Pipe,
        Classification::Rock,
        Classification::Wreck,
        Classification::Unknown,
    ];

    /// Persisted enum name
    pub fn name(&self) -> &'static str {
        match self {
            Classification::Undefined => "UNDEFINED",
            Classification::None => "NONE",
            Classification::Cable => "CABLE",
            Classification::Pipe => "PIPE",
            Classification::Rock => "ROCK",
            Classification::Wreck => "WRECK",
            Classification::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Classification {
    type Err = DecodeError;

    /// Exact, case-sensitive match on the persisted name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Classification::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| DecodeError::InvalidClassification(s.to_string()))
    }
}

/// Free-hand drawing overlay of a marker
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DrawPath {
    #[default]
    NotApplicable,
    Path(String),
}

impl DrawPath {
    /// Interpret persisted text; empty and `N/A` both mean no drawing
    pub fn from_text(text: &str) -> Self {
        if text.is_empty() || text == NOT_APPLICABLE {
            DrawPath::NotApplicable
        } else {
            DrawPath::Path(text.to_string())
        }
    }

    /// Persisted text (`N/A` when there is no drawing)
    pub fn as_str(&self) -> &str {
        match self {
            DrawPath::NotApplicable => NOT_APPLICABLE,
            DrawPath::Path(p) => p,
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            DrawPath::NotApplicable => None,
            DrawPath::Path(p) => Some(p),
        }
    }

    pub fn is_not_applicable(&self) -> bool {
        matches!(self, DrawPath::NotApplicable)
    }
}

impl From<String> for DrawPath {
    fn from(text: String) -> Self {
        DrawPath::from_text(&text)
    }
}

impl From<DrawPath> for String {
    fn from(draw: DrawPath) -> Self {
        draw.as_str().to_string()
    }
}

/// Kind of a source marker; only sidescan markers are managed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerKind {
    Sidescan,
    Generic,
}

/// Raw marker owned by the recording session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMarker {
    pub label: String,
    pub timestamp_millis: i64,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    /// Configured width of the marked area, reported as the record's range
    pub width_meters: f64,
    /// Sensor subsystem the marker was placed on (`None`: use the first one)
    pub subsystem: Option<u32>,
    pub description: Option<String>,
    pub kind: MarkerKind,
}

impl SourceMarker {
    /// Sidescan marker with no subsystem or description
    pub fn sidescan(
        label: impl Into<String>,
        timestamp_millis: i64,
        latitude_deg: f64,
        longitude_deg: f64,
        width_meters: f64,
    ) -> Self {
        Self {
            label: label.into(),
            timestamp_millis,
            latitude_deg,
            longitude_deg,
            width_meters,
            subsystem: None,
            description: None,
            kind: MarkerKind::Sidescan,
        }
    }

    pub fn with_subsystem(mut self, subsystem: u32) -> Self {
        self.subsystem = Some(subsystem);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_kind(mut self, kind: MarkerKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn is_sidescan(&self) -> bool {
        self.kind == MarkerKind::Sidescan
    }
}

/// Which identity fields [`MarkerRecord::copy_from`] may overwrite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyIdentity {
    /// Keep the target's label and index
    Preserve,
    /// Take label and index from the source as well
    Overwrite,
}

/// One managed marker, as held in the working list and the sidecar document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerRecord {
    pub index: u32,
    pub label: String,
    pub timestamp_millis: i64,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    /// Rendered image, relative to the recording directory
    pub image_path: Option<String>,
    pub draw_path: DrawPath,
    pub annotation: String,
    pub altitude_m: f64,
    pub depth_m: f64,
    pub range_m: f64,
    /// Always zero: box height is not derived
    pub height_m: f64,
    pub classification: Classification,
}

impl MarkerRecord {
    /// New record for a source marker
    pub fn from_source(
        marker: &SourceMarker,
        index: u32,
        metrics: MarkerMetrics,
        image_path: Option<String>,
    ) -> Self {
        let annotation = match marker.description.as_deref() {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => PLACEHOLDER_ANNOTATION.to_string(),
        };

        Self {
            index,
            label: marker.label.clone(),
            timestamp_millis: marker.timestamp_millis,
            latitude_deg: marker.latitude_deg,
            longitude_deg: marker.longitude_deg,
            image_path,
            draw_path: DrawPath::NotApplicable,
            annotation,
            altitude_m: metrics.altitude_m,
            depth_m: metrics.depth_m,
            range_m: metrics.range_m,
            height_m: metrics.height_m,
            classification: Classification::Undefined,
        }
    }

    /// Same marker iff labels match
    pub fn is_same_marker(&self, other: &MarkerRecord) -> bool {
        self.label == other.label
    }

    /// Overwrite every mutable field from `source`
    pub fn copy_from(&mut self, source: &MarkerRecord, identity: CopyIdentity) {
        if identity == CopyIdentity::Overwrite {
            self.index = source.index;
            self.label = source.label.clone();
        }
        self.timestamp_millis = source.timestamp_millis;
        self.latitude_deg = source.latitude_deg;
        self.longitude_deg = source.longitude_deg;
        self.image_path = source.image_path.clone();
        self.draw_path = source.draw_path.clone();
        self.annotation = source.annotation.clone();
        self.altitude_m = source.altitude_m;
        self.depth_m = source.depth_m;
        self.range_m = source.range_m;
        self.height_m = source.height_m;
        self.classification = source.classification;
    }

    /// Apply the user-editable fields of `update`
    pub fn apply(&mut self, update: &MarkerUpdate) {
        self.annotation = update.annotation.clone();
        self.classification = update.classification;
        self.draw_path = update.draw_path.clone();
    }

    /// Location as degrees, minutes and seconds, e.g. `41°09'30.00"N 8°37'12.00"W`
    pub fn location_text(&self) -> String {
        format!(
            "{} {}",
            dms(self.latitude_deg, 'N', 'S'),
            dms(self.longitude_deg, 'E', 'W')
        )
    }
}

fn dms(value: f64, positive: char, negative: char) -> String {
    let hemisphere = if value < 0.0 { negative } else { positive };
    let abs = value.abs();

    let mut degrees = abs.trunc();
    let minutes_f = (abs - degrees) * 60.0;
    let mut minutes = minutes_f.trunc();
    let mut seconds = ((minutes_f - minutes) * 60.0 * 100.0).round() / 100.0;

    // Carry rounding overflow (59.999 s -> 60.00 s)
    if seconds >= 60.0 {
        seconds -= 60.0;
        minutes += 1.0;
    }
    if minutes >= 60.0 {
        minutes -= 60.0;
        degrees += 1.0;
    }

    format!(
        "{}°{:02}'{:05.2}\"{}",
        degrees as u32, minutes as u32, seconds, hemisphere
    )
}

/// Fields the presentation layer may edit on an existing record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarkerUpdate {
    pub annotation: String,
    pub classification: Classification,
    pub draw_path: DrawPath,
}

impl MarkerUpdate {
    /// Start from the record's current values
    pub fn from_record(record: &MarkerRecord) -> Self {
        Self {
            annotation: record.annotation.clone(),
            classification: record.classification,
            draw_path: record.draw_path.clone(),
        }
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = annotation.into();
        self
    }

    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = classification;
        self
    }

    pub fn with_draw_path(mut self, draw_path: DrawPath) -> Self {
        self.draw_path = draw_path;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(label: &str, index: u32) -> MarkerRecord {
        MarkerRecord::from_source(
            &SourceMarker::sidescan(label, 1000, 41.0, -8.0, 10.0),
            index,
            MarkerMetrics {
                altitude_m: 5.25,
                depth_m: 2.0,
                range_m: 10.0,
                height_m: 0.0,
            },
            Some(format!("mra/markers/{}.png", label)),
        )
    }

    #[test]
    fn test_classification_names_round_trip() {
        for classification in Classification::ALL {
            let parsed: Classification = classification.name().parse().unwrap();
            assert_eq!(parsed, classification);
        }
    }

    #[test]
    fn test_classification_is_case_sensitive() {
        assert!("wreck".parse::<Classification>().is_err());
        assert!(matches!(
            "BOULDER".parse::<Classification>(),
            Err(DecodeError::InvalidClassification(name)) if name == "BOULDER"
        ));
    }

    #[test]
    fn test_default_classification_is_undefined() {
        assert_eq!(Classification::default(), Classification::Undefined);
    }

    #[test]
    fn test_draw_path_text() {
        assert_eq!(DrawPath::from_text("N/A"), DrawPath::NotApplicable);
        assert_eq!(DrawPath::from_text(""), DrawPath::NotApplicable);
        assert_eq!(
            DrawPath::from_text("mra/draw/M1.png"),
            DrawPath::Path("mra/draw/M1.png".to_string())
        );
        assert_eq!(DrawPath::NotApplicable.as_str(), "N/A");
        assert_eq!(DrawPath::Path("x.png".into()).path(), Some("x.png"));
    }

    #[test]
    fn test_from_source_uses_placeholder_annotation() {
        let r = record("M1", 1);
        assert_eq!(r.index, 1);
        assert_eq!(r.label, "M1");
        assert_eq!(r.annotation, PLACEHOLDER_ANNOTATION);
        assert_eq!(r.classification, Classification::Undefined);
        assert_eq!(r.draw_path, DrawPath::NotApplicable);
        assert_eq!(r.range_m, 10.0);
    }

    #[test]
    fn test_from_source_keeps_description() {
        let marker = SourceMarker::sidescan("M2", 0, 0.0, 0.0, 5.0).with_description("tyre");
        let r = MarkerRecord::from_source(&marker, 2, MarkerMetrics::default(), None);
        assert_eq!(r.annotation, "tyre");

        let blank = SourceMarker::sidescan("M3", 0, 0.0, 0.0, 5.0).with_description("");
        let r = MarkerRecord::from_source(&blank, 3, MarkerMetrics::default(), None);
        assert_eq!(r.annotation, PLACEHOLDER_ANNOTATION);
    }

    #[test]
    fn test_same_marker_by_label_only() {
        let a = record("M1", 1);
        let mut b = record("M1", 7);
        b.latitude_deg = 12.0;
        assert!(a.is_same_marker(&b));
        assert!(!a.is_same_marker(&record("m1", 1)));
    }

    #[test]
    fn test_copy_from_preserves_identity() {
        let mut target = record("M1", 1);
        let mut source = record("M9", 9);
        source.annotation = "pipe section".to_string();
        source.classification = Classification::Pipe;
        source.latitude_deg = 40.5;

        target.copy_from(&source, CopyIdentity::Preserve);

        assert_eq!(target.label, "M1");
        assert_eq!(target.index, 1);
        assert_eq!(target.annotation, "pipe section");
        assert_eq!(target.classification, Classification::Pipe);
        assert_eq!(target.latitude_deg, 40.5);
    }

    #[test]
    fn test_copy_from_overwrite_identity() {
        let mut target = record("M1", 1);
        let source = record("M9", 9);

        target.copy_from(&source, CopyIdentity::Overwrite);

        assert_eq!(target, source);
    }

    #[test]
    fn test_apply_update_touches_only_editable_fields() {
        let mut r = record("M1", 1);
        let before = r.clone();
        let update = MarkerUpdate::from_record(&r)
            .with_annotation("new text")
            .with_classification(Classification::Rock)
            .with_draw_path(DrawPath::Path("mra/draw/M1.png".into()));

        r.apply(&update);

        assert_eq!(r.annotation, "new text");
        assert_eq!(r.classification, Classification::Rock);
        assert_eq!(r.draw_path.path(), Some("mra/draw/M1.png"));
        assert_eq!(r.index, before.index);
        assert_eq!(r.label, before.label);
        assert_eq!(r.latitude_deg, before.latitude_deg);
        assert_eq!(r.longitude_deg, before.longitude_deg);
        assert_eq!(r.image_path, before.image_path);
    }

    #[test]
    fn test_location_text() {
        let mut r = record("M1", 1);
        assert_eq!(r.location_text(), "41°00'00.00\"N 8°00'00.00\"W");

        r.latitude_deg = 41.5125;
        r.longitude_deg = 8.5;
        assert_eq!(r.location_text(), "41°30'45.00\"N 8°30'00.00\"E");

        r.latitude_deg = -0.25;
        assert_eq!(r.location_text(), "0°15'00.00\"S 8°30'00.00\"E");
    }

    #[test]
    fn test_location_text_carries_rounded_seconds() {
        let mut r = record("M1", 1);
        r.latitude_deg = 10.0 + 59.0 / 60.0 + 59.9999 / 3600.0;
        r.longitude_deg = 0.0;
        assert_eq!(r.location_text(), "11°00'00.00\"N 0°00'00.00\"E");
    }
}
