//! Integration tests for the async marker session
//!
//! Ready signal, serialized mutations and session events.

mod helpers;

use helpers::{marker, Fixture};
use lrmm_common::{MarkerEvent, SessionOutcome};
use lrmm_markers::{
    Classification, Error, MarkerSession, MarkerUpdate, SessionState, SessionStatus,
};
use std::fs;
use tokio::sync::broadcast;

fn open(fx: &Fixture) -> MarkerSession {
    MarkerSession::open(fx.dir.path(), fx.collaborators(), &fx.config)
}

/// Events already delivered to `rx`
fn drain(rx: &mut broadcast::Receiver<MarkerEvent>) -> Vec<MarkerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_ready_signal() {
    let fx = Fixture::with_labels(&["M1", "M2"]);
    let session = open(&fx);
    let mut rx = session.subscribe();

    assert_eq!(session.status(), SessionStatus::Opening);
    assert_eq!(session.ready().await.unwrap(), SessionOutcome::Created);
    assert_eq!(
        session.status(),
        SessionStatus::Ready(SessionOutcome::Created)
    );
    assert_eq!(session.state().await, SessionState::Ready);

    match rx.recv().await.unwrap() {
        MarkerEvent::SessionReady {
            session_id,
            outcome,
            marker_count,
            ..
        } => {
            assert_eq!(session_id, session.id());
            assert_eq!(outcome, SessionOutcome::Created);
            assert_eq!(marker_count, 2);
        }
        other => panic!("unexpected event {:?}", other),
    }

    // Repeated waits return immediately with the same outcome
    assert_eq!(session.ready().await.unwrap(), SessionOutcome::Created);
}

#[tokio::test]
async fn test_second_session_loads_document() {
    let fx = Fixture::with_labels(&["M1"]);
    open(&fx).ready().await.unwrap();

    let session = open(&fx);

    assert_eq!(session.ready().await.unwrap(), SessionOutcome::Loaded);
    assert_eq!(session.list_markers().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_mutation_waits_for_opening_pass() {
    let fx = Fixture::with_labels(&["M1", "M2"]);
    let session = open(&fx);

    let added = session.add_marker(marker("M3", 3000)).await.unwrap().unwrap();

    assert_eq!(added.index, 3);
    let labels: Vec<String> = session
        .list_markers()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.label)
        .collect();
    assert_eq!(labels, vec!["M1", "M2", "M3"]);
}

#[tokio::test]
async fn test_mutations_emit_events() {
    let fx = Fixture::with_labels(&["M1", "M2"]);
    let session = open(&fx);
    session.ready().await.unwrap();
    let mut rx = session.subscribe();

    session.add_marker(marker("M3", 3000)).await.unwrap();
    let current = session.find_by_label("M1").await.unwrap().unwrap();
    session
        .update_marker(
            "M1",
            MarkerUpdate::from_record(&current).with_classification(Classification::Rock),
        )
        .await
        .unwrap();
    session.remove_marker("M2").await.unwrap();

    let events = drain(&mut rx);
    assert_eq!(events.len(), 3);
    assert!(matches!(&events[0], MarkerEvent::MarkerAdded { index: 3, label, .. } if label == "M3"));
    assert!(matches!(&events[1], MarkerEvent::MarkerUpdated { index: 1, label, .. } if label == "M1"));
    assert!(matches!(&events[2], MarkerEvent::MarkerRemoved { index: 2, label, .. } if label == "M2"));
    assert!(events.iter().all(|e| e.session_id() == session.id()));

    assert_eq!(
        session.find_by_index(1).await.unwrap().unwrap().classification,
        Classification::Rock
    );
    assert_eq!(session.next_marker("M1").await.unwrap().unwrap().label, "M3");
    assert_eq!(session.previous_marker("M3").await.unwrap().unwrap().label, "M1");
}

#[tokio::test]
async fn test_removing_last_marker_emits_emptied() {
    let fx = Fixture::with_labels(&["M1"]);
    let session = open(&fx);
    session.ready().await.unwrap();
    let mut rx = session.subscribe();

    let mutation = session.source_marker_removed("M1").await.unwrap();

    assert!(mutation.emptied);
    let events = drain(&mut rx);
    assert!(matches!(events[0], MarkerEvent::MarkerRemoved { .. }));
    assert!(matches!(events[1], MarkerEvent::SessionEmptied { .. }));
    assert_eq!(session.state().await, SessionState::Empty);
    assert!(fx.recording.removed().is_empty());
}

#[tokio::test]
async fn test_unknown_label_is_reported() {
    let fx = Fixture::with_labels(&["M1"]);
    let session = open(&fx);
    let mut rx = session.subscribe();
    session.ready().await.unwrap();
    drain(&mut rx);

    let result = session.remove_marker("M9").await;

    assert!(matches!(result, Err(Error::NotFound(label)) if label == "M9"));
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_write_failure_event() {
    let fx = Fixture::with_labels(&["M1", "M2"]);
    let session = open(&fx);
    session.ready().await.unwrap();
    let path = fx.layout().document_path();
    fs::remove_file(&path).unwrap();
    fs::create_dir(&path).unwrap();
    let mut rx = session.subscribe();

    let mutation = session.remove_marker("M1").await.unwrap();

    assert!(!mutation.persisted);
    let events = drain(&mut rx);
    assert!(matches!(
        events.last(),
        Some(MarkerEvent::DocumentWriteFailed { path: reported, .. })
            if *reported == path.display().to_string()
    ));
    assert_eq!(session.list_markers().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_empty_recording_session() {
    let fx = Fixture::new(Vec::new());
    let session = open(&fx);

    assert_eq!(session.ready().await.unwrap(), SessionOutcome::Empty);
    assert!(session.list_markers().await.unwrap().is_empty());
    assert_eq!(session.recording_dir(), fx.dir.path());
}

#[tokio::test]
async fn test_close_clears_session() {
    let fx = Fixture::with_labels(&["M1"]);
    let session = open(&fx);
    session.ready().await.unwrap();

    session.close().await;

    assert!(session.list_markers().await.unwrap().is_empty());
    assert_eq!(session.state().await, SessionState::Pending);
}
