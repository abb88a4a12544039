//! Fake recording collaborators shared by the integration tests

#![allow(dead_code)]

use image::{Rgba, RgbaImage};
use lrmm_common::config::{RenderConfig, TomlConfig};
use lrmm_markers::collaborators::{
    ArtifactRenderer, MarkerSource, MarkerWindow, SampleReader, SensorSample, VehicleStateSource,
};
use lrmm_markers::{Collaborators, MarkerStore, RecordingLayout, RenderFailure, SourceMarker};
use std::collections::HashSet;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Vehicle depth reported for every instant
pub const DEPTH: f64 = 12.5;

/// Subsystems reported by the fake reader
pub const SUBSYSTEMS: [u32; 2] = [100, 200];

pub fn marker(label: &str, timestamp_millis: i64) -> SourceMarker {
    SourceMarker::sidescan(label, timestamp_millis, 41.0, -8.0, 10.0)
}

/// Marker set of the recording, recording every call made by the engine
#[derive(Default)]
pub struct FakeRecording {
    markers: Mutex<Vec<SourceMarker>>,
    removed: Mutex<Vec<String>>,
    descriptions: Mutex<Vec<(String, String)>>,
}

impl FakeRecording {
    pub fn set_markers(&self, markers: Vec<SourceMarker>) {
        *self.markers.lock().unwrap() = markers;
    }

    pub fn push(&self, marker: SourceMarker) {
        self.markers.lock().unwrap().push(marker);
    }

    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }

    pub fn descriptions(&self) -> Vec<(String, String)> {
        self.descriptions.lock().unwrap().clone()
    }
}

impl MarkerSource for FakeRecording {
    fn markers(&self) -> Vec<SourceMarker> {
        self.markers.lock().unwrap().clone()
    }

    fn remove_marker(&self, label: &str) {
        self.markers.lock().unwrap().retain(|m| m.label != label);
        self.removed.lock().unwrap().push(label.to_string());
    }

    fn set_description(&self, label: &str, description: &str) {
        self.descriptions
            .lock()
            .unwrap()
            .push((label.to_string(), description.to_string()));
    }
}

/// Sensor lines spaced 100 ms apart from the marker time
pub struct FakeLines {
    pub altitudes: Mutex<Vec<f64>>,
}

impl FakeLines {
    pub fn new(altitudes: Vec<f64>) -> Self {
        Self {
            altitudes: Mutex::new(altitudes),
        }
    }
}

impl SampleReader for FakeLines {
    fn subsystems(&self) -> Vec<u32> {
        SUBSYSTEMS.to_vec()
    }

    fn samples(&self, _subsystem: u32, window: &MarkerWindow) -> Vec<SensorSample> {
        self.altitudes
            .lock()
            .unwrap()
            .iter()
            .enumerate()
            .map(|(i, altitude)| SensorSample {
                timestamp_millis: window.center_millis + i as i64 * 100,
                altitude_m: *altitude,
            })
            .collect()
    }
}

pub struct FakeVehicle;

impl VehicleStateSource for FakeVehicle {
    fn depth_at(&self, _timestamp_millis: i64) -> f64 {
        DEPTH
    }
}

/// Renders a 4x4 image and counts calls; listed labels fail
#[derive(Default)]
pub struct CountingRenderer {
    calls: AtomicUsize,
    failing: Mutex<HashSet<String>>,
}

impl CountingRenderer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_for(&self, label: &str) {
        self.failing.lock().unwrap().insert(label.to_string());
    }
}

impl ArtifactRenderer for CountingRenderer {
    fn render(
        &self,
        marker: &SourceMarker,
        subsystem: u32,
        _config: &RenderConfig,
    ) -> Result<RgbaImage, RenderFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(&marker.label) {
            return Err(RenderFailure::NoImage {
                label: marker.label.clone(),
                subsystem,
            });
        }
        Ok(RgbaImage::from_pixel(4, 4, Rgba([20, 40, 80, 255])))
    }
}

/// Temporary recording directory with fake collaborators
pub struct Fixture {
    pub dir: TempDir,
    pub config: TomlConfig,
    pub recording: Arc<FakeRecording>,
    pub lines: Arc<FakeLines>,
    pub renderer: Arc<CountingRenderer>,
}

impl Fixture {
    pub fn new(markers: Vec<SourceMarker>) -> Self {
        let recording = Arc::new(FakeRecording::default());
        recording.set_markers(markers);
        Self {
            dir: TempDir::new().unwrap(),
            config: TomlConfig::default(),
            recording,
            lines: Arc::new(FakeLines::new(vec![4.0, 4.567, 5.0])),
            renderer: Arc::new(CountingRenderer::default()),
        }
    }

    pub fn with_labels(labels: &[&str]) -> Self {
        Self::new(
            labels
                .iter()
                .enumerate()
                .map(|(i, l)| marker(l, 1000 * (i as i64 + 1)))
                .collect(),
        )
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            source: self.recording.clone(),
            samples: self.lines.clone(),
            vehicle: Arc::new(FakeVehicle),
            renderer: self.renderer.clone(),
        }
    }

    pub fn layout(&self) -> RecordingLayout {
        RecordingLayout::new(self.dir.path(), &self.config.layout)
    }

    /// Store that has not been reconciled yet
    pub fn store(&self) -> MarkerStore {
        MarkerStore::new(self.dir.path(), self.collaborators(), &self.config)
    }

    /// Store after its opening reconciliation
    pub fn open(&self) -> MarkerStore {
        let mut store = self.store();
        store.reconcile();
        store
    }

    pub fn document_bytes(&self) -> Vec<u8> {
        fs::read(self.layout().document_path()).unwrap()
    }
}
