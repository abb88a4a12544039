//! Metric derivation for a marker
//!
//! - Altitude: sample at position `count / 2` of the marker window (not an
//!   average), rounded to two decimals
//! - Depth: vehicle depth at that sample's timestamp
//! - Range: the marker's configured width, verbatim
//! - Height: not derived, always 0

use crate::collaborators::{MarkerWindow, SampleReader, SensorSample, VehicleStateSource};
use crate::model::SourceMarker;
use tracing::{debug, warn};

/// Derived metrics stored on a record
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MarkerMetrics {
    pub altitude_m: f64,
    pub depth_m: f64,
    pub range_m: f64,
    pub height_m: f64,
}

/// Round half away from zero to two decimals
pub fn round_two_decimals(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Sample used for altitude and depth
pub fn midpoint(samples: &[SensorSample]) -> Option<&SensorSample> {
    samples.get(samples.len() / 2)
}

/// Subsystem a marker's metrics come from: its own, else the first available
pub fn resolve_subsystem(marker: &SourceMarker, reader: &dyn SampleReader) -> Option<u32> {
    marker
        .subsystem
        .or_else(|| reader.subsystems().first().copied())
}

/// Derives [`MarkerMetrics`] from the recording collaborators
pub struct MetricDeriver<'a> {
    samples: &'a dyn SampleReader,
    vehicle: &'a dyn VehicleStateSource,
}

impl<'a> MetricDeriver<'a> {
    pub fn new(samples: &'a dyn SampleReader, vehicle: &'a dyn VehicleStateSource) -> Self {
        Self { samples, vehicle }
    }

    pub fn derive(&self, marker: &SourceMarker) -> MarkerMetrics {
        let mut metrics = MarkerMetrics {
            range_m: marker.width_meters,
            ..MarkerMetrics::default()
        };

        let Some(subsystem) = resolve_subsystem(marker, self.samples) else {
            warn!("No sensor subsystem for marker {}, altitude and depth set to 0", marker.label);
            return metrics;
        };

        let lines = self.samples.samples(subsystem, &MarkerWindow::of(marker));
        match midpoint(&lines) {
            Some(sample) => {
                metrics.altitude_m = round_two_decimals(sample.altitude_m);
                metrics.depth_m = self.vehicle.depth_at(sample.timestamp_millis);
                debug!(
                    "Marker {}: {} lines on subsystem {}, altitude {} m, depth {} m",
                    marker.label,
                    lines.len(),
                    subsystem,
                    metrics.altitude_m,
                    metrics.depth_m
                );
            }
            None => {
                warn!(
                    "No sensor lines for marker {} on subsystem {}, altitude and depth set to 0",
                    marker.label, subsystem
                );
            }
        }

        metrics
    }
}
