//! Unit tests for the atomic write and quiet delete helpers

use lrmm_common::files::{remove_dir_quietly, remove_file_quietly, temp_path_for, write_atomic};
use tempfile::TempDir;

#[test]
fn test_temp_path_is_sibling() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("marks.xml");

    assert_eq!(temp_path_for(&target), temp_dir.path().join("marks.xml.tmp"));
}

#[test]
fn test_atomic_write_renames_to_target() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("marks.xml");

    write_atomic(&target, b"<markers/>").unwrap();

    assert_eq!(std::fs::read(&target).unwrap(), b"<markers/>");
    assert!(!temp_dir.path().join("marks.xml.tmp").exists());
}

#[test]
fn test_atomic_write_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("mra").join("marks.xml");

    write_atomic(&target, b"data").unwrap();

    assert!(target.exists());
}

#[test]
fn test_atomic_write_replaces_previous_content() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("marks.xml");

    write_atomic(&target, b"first").unwrap();
    write_atomic(&target, b"second").unwrap();

    assert_eq!(std::fs::read_to_string(&target).unwrap(), "second");
}

#[test]
fn test_failed_write_leaves_no_temp_file() {
    let temp_dir = TempDir::new().unwrap();
    // A directory in the way makes the final rename fail
    let target = temp_dir.path().join("marks.xml");
    std::fs::create_dir_all(target.join("occupied")).unwrap();

    assert!(write_atomic(&target, b"data").is_err());
    assert!(target.is_dir());
    assert!(!temp_dir.path().join("marks.xml.tmp").exists());
}

#[test]
fn test_remove_file_quietly() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("M1.png");
    std::fs::write(&file, b"png").unwrap();

    assert!(remove_file_quietly(&file));
    assert!(!file.exists());
    // Second delete is a no-op
    assert!(!remove_file_quietly(&file));
}

#[test]
fn test_remove_dir_quietly() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("markers");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("M1.png"), b"png").unwrap();

    assert!(remove_dir_quietly(&dir));
    assert!(!dir.exists());
    assert!(!remove_dir_quietly(&dir));
}

#[test]
fn test_remove_file_quietly_ignores_directories() {
    let temp_dir = TempDir::new().unwrap();

    assert!(!remove_file_quietly(temp_dir.path()));
    assert!(temp_dir.path().exists());
}
