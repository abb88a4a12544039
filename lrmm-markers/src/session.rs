//! Async marker session
//!
//! Opening a session reconciles the recording on a blocking worker. Callers
//! await [`MarkerSession::ready`] instead of polling, and every mutation is
//! serialized through one lock around the [`MarkerStore`], which the opening
//! pass holds until it completes.

use crate::collaborators::Collaborators;
use crate::error::{Error, Result};
use crate::layout::RecordingLayout;
use crate::model::{MarkerRecord, MarkerUpdate, SourceMarker};
use crate::reconcile::SessionState;
use crate::store::{MarkerStore, Mutation};
use lrmm_common::config::TomlConfig;
use lrmm_common::events::{EventBus, MarkerEvent, SessionOutcome};
use lrmm_common::time;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{error, info};
use uuid::Uuid;

/// Progress of the opening pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Opening,
    Ready(SessionOutcome),
    /// The opening pass did not complete (worker panicked or was cancelled)
    Failed(String),
}

/// Marker engine of one open recording
pub struct MarkerSession {
    id: Uuid,
    recording_dir: PathBuf,
    document_path: PathBuf,
    store: Arc<Mutex<MarkerStore>>,
    status: watch::Receiver<SessionStatus>,
    events: EventBus,
}

impl MarkerSession {
    /// Open `recording_dir` and start reconciling it in the background
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(
        recording_dir: impl Into<PathBuf>,
        collaborators: Collaborators,
        config: &TomlConfig,
    ) -> Self {
        let id = Uuid::new_v4();
        let recording_dir = recording_dir.into();
        let document_path = RecordingLayout::new(&recording_dir, &config.layout).document_path();
        let events = EventBus::new(config.session.event_capacity);
        let store = Arc::new(Mutex::new(MarkerStore::new(
            recording_dir.clone(),
            collaborators,
            config,
        )));
        let (status_tx, status_rx) = watch::channel(SessionStatus::Opening);

        info!("Opening marker session {} - {}", id, recording_dir.display());

        let task_store = Arc::clone(&store);
        let bus = events.clone();
        tokio::spawn(async move {
            let mut guard = task_store.lock_owned().await;
            let pass = tokio::task::spawn_blocking(move || {
                let outcome = guard.reconcile();
                (outcome, guard.list_markers().len())
            })
            .await;

            let status = match pass {
                Ok((outcome, marker_count)) => {
                    info!(
                        "Marker session {} ready: {:?}, {} markers",
                        id, outcome, marker_count
                    );
                    bus.emit_lossy(MarkerEvent::SessionReady {
                        session_id: id,
                        outcome,
                        marker_count,
                        timestamp: time::now(),
                    });
                    SessionStatus::Ready(outcome)
                }
                Err(e) => {
                    error!("Marker session {} failed to open: {}", id, e);
                    SessionStatus::Failed(e.to_string())
                }
            };
            let _ = status_tx.send(status);
        });

        Self {
            id,
            recording_dir,
            document_path,
            store,
            status: status_rx,
            events,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn recording_dir(&self) -> &Path {
        &self.recording_dir
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MarkerEvent> {
        self.events.subscribe()
    }

    /// Current progress without waiting
    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// Wait for the opening pass to finish
    pub async fn ready(&self) -> Result<SessionOutcome> {
        let mut rx = self.status.clone();
        let status = rx
            .wait_for(|s| *s != SessionStatus::Opening)
            .await
            .map_err(|_| Error::Session("opening worker dropped".to_string()))?
            .clone();

        match status {
            SessionStatus::Ready(outcome) => Ok(outcome),
            SessionStatus::Failed(message) => Err(Error::Session(message)),
            SessionStatus::Opening => Err(Error::Session("session still opening".to_string())),
        }
    }

    /// Run `f` on the store on a blocking worker, after the session is ready
    async fn with_store<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut MarkerStore) -> T + Send + 'static,
        T: Send + 'static,
    {
        self.ready().await?;
        let mut guard = Arc::clone(&self.store).lock_owned().await;
        tokio::task::spawn_blocking(move || f(&mut *guard))
            .await
            .map_err(|e| Error::Session(format!("marker worker failed: {}", e)))
    }

    pub async fn state(&self) -> SessionState {
        self.store.lock().await.state()
    }

    pub async fn list_markers(&self) -> Result<Vec<MarkerRecord>> {
        self.ready().await?;
        Ok(self.store.lock().await.list_markers().to_vec())
    }

    pub async fn find_by_label(&self, label: &str) -> Result<Option<MarkerRecord>> {
        self.ready().await?;
        Ok(self.store.lock().await.find_by_label(label).cloned())
    }

    pub async fn find_by_index(&self, index: u32) -> Result<Option<MarkerRecord>> {
        self.ready().await?;
        Ok(self.store.lock().await.find_by_index(index).cloned())
    }

    pub async fn previous_marker(&self, label: &str) -> Result<Option<MarkerRecord>> {
        self.ready().await?;
        Ok(self.store.lock().await.previous_marker(label).cloned())
    }

    pub async fn next_marker(&self, label: &str) -> Result<Option<MarkerRecord>> {
        self.ready().await?;
        Ok(self.store.lock().await.next_marker(label).cloned())
    }

    /// Returns `None` when the marker is not a sidescan marker
    pub async fn add_marker(&self, marker: SourceMarker) -> Result<Option<Mutation>> {
        let mutation = self.with_store(move |store| store.add_marker(marker)).await?;
        if let Some(m) = &mutation {
            self.events.emit_lossy(MarkerEvent::MarkerAdded {
                session_id: self.id,
                index: m.index,
                label: m.label.clone(),
                timestamp: time::now(),
            });
            self.report_write(m);
        }
        Ok(mutation)
    }

    pub async fn update_marker(&self, label: &str, update: MarkerUpdate) -> Result<Mutation> {
        let owned = label.to_string();
        let mutation = self
            .with_store(move |store| store.update_marker(&owned, &update))
            .await??;

        self.events.emit_lossy(MarkerEvent::MarkerUpdated {
            session_id: self.id,
            index: mutation.index,
            label: mutation.label.clone(),
            timestamp: time::now(),
        });
        self.report_write(&mutation);
        Ok(mutation)
    }

    /// Delete a marker and pass the deletion on to the recording
    pub async fn remove_marker(&self, label: &str) -> Result<Mutation> {
        let owned = label.to_string();
        let mutation = self
            .with_store(move |store| store.remove_marker(&owned))
            .await??;
        self.report_removal(&mutation);
        Ok(mutation)
    }

    /// The recording deleted a marker
    pub async fn source_marker_removed(&self, label: &str) -> Result<Mutation> {
        let owned = label.to_string();
        let mutation = self
            .with_store(move |store| store.source_marker_removed(&owned))
            .await??;
        self.report_removal(&mutation);
        Ok(mutation)
    }

    fn report_removal(&self, mutation: &Mutation) {
        self.events.emit_lossy(MarkerEvent::MarkerRemoved {
            session_id: self.id,
            index: mutation.index,
            label: mutation.label.clone(),
            timestamp: time::now(),
        });
        if mutation.emptied {
            self.events.emit_lossy(MarkerEvent::SessionEmptied {
                session_id: self.id,
                timestamp: time::now(),
            });
        }
        self.report_write(mutation);
    }

    fn report_write(&self, mutation: &Mutation) {
        if !mutation.persisted {
            self.events.emit_lossy(MarkerEvent::DocumentWriteFailed {
                session_id: self.id,
                path: self.document_path.display().to_string(),
                timestamp: time::now(),
            });
        }
    }

    /// Drop the in-memory lists; waits for a running opening pass
    pub async fn close(&self) {
        self.store.lock().await.close();
        info!("Marker session {} closed", self.id);
    }
}
