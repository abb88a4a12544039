//! Interfaces to the recording session, recording reader and renderer
//!
//! The engine never reads raw recording data or draws images itself; it
//! consumes these traits and decides when to call them.

use crate::error::RenderFailure;
use crate::model::SourceMarker;
use image::RgbaImage;
use lrmm_common::config::RenderConfig;
use std::sync::Arc;

/// One sensor line sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    pub timestamp_millis: i64,
    /// Vehicle altitude above the bottom when the line was recorded
    pub altitude_m: f64,
}

/// Time window covered by a marker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerWindow {
    pub center_millis: i64,
    pub width_meters: f64,
}

impl MarkerWindow {
    pub fn of(marker: &SourceMarker) -> Self {
        Self {
            center_millis: marker.timestamp_millis,
            width_meters: marker.width_meters,
        }
    }
}

/// Owner of the live marker set of the recording
pub trait MarkerSource: Send + Sync {
    /// Current markers, all kinds
    fn markers(&self) -> Vec<SourceMarker>;

    /// A marker was deleted through the engine
    fn remove_marker(&self, label: &str);

    /// A marker's annotation was edited through the engine
    fn set_description(&self, label: &str, description: &str);
}

/// Sensor-line reader of the recording
pub trait SampleReader: Send + Sync {
    /// Available sensor subsystems, in recording order
    fn subsystems(&self) -> Vec<u32>;

    /// Ordered samples of `subsystem` inside `window`
    fn samples(&self, subsystem: u32, window: &MarkerWindow) -> Vec<SensorSample>;
}

/// Estimated vehicle state over time
pub trait VehicleStateSource: Send + Sync {
    /// Vehicle depth at the given instant
    fn depth_at(&self, timestamp_millis: i64) -> f64;
}

/// Image pipeline producing a marker artifact
pub trait ArtifactRenderer: Send + Sync {
    fn render(
        &self,
        marker: &SourceMarker,
        subsystem: u32,
        config: &RenderConfig,
    ) -> Result<RgbaImage, RenderFailure>;
}

/// Everything the engine needs from the host application
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn MarkerSource>,
    pub samples: Arc<dyn SampleReader>,
    pub vehicle: Arc<dyn VehicleStateSource>,
    pub renderer: Arc<dyn ArtifactRenderer>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
