//! Corrections of admin data from what the replicas report.

mod common;

use bitpres_core::{Checksum, ReplicaStoreState};
use bitpres_engine::{RepairOutcome, SkipReason};
use common::fixtures::{TestEngine, id};
use std::collections::BTreeSet;

fn skipped(reason: SkipReason) -> RepairOutcome {
    RepairOutcome::Skipped { reason }
}

#[tokio::test]
async fn test_missing_files_for_admin_data() {
    let t = TestEngine::new().await;
    t.admit("a.arc", b"alpha").await;
    t.put("ONE", "a.arc", b"alpha").await;
    t.put("ONE", "orphan.arc", b"orphan").await;
    t.put("CS", "orphan.arc", b"orphan").await;
    t.put("TWO", "late.arc", b"late").await;

    // Unscanned replicas contribute nothing.
    assert!(t.engine.get_missing_files_for_admin_data().await.unwrap().is_empty());

    t.engine.find_missing_files(&id("ONE")).await.unwrap();
    t.engine.find_changed_files(&id("CS")).await.unwrap();

    let unknown = t.engine.get_missing_files_for_admin_data().await.unwrap();
    assert_eq!(unknown.len(), 1);
    assert_eq!(
        unknown["orphan.arc"],
        BTreeSet::from([id("ONE"), id("CS")])
    );
}

#[tokio::test]
async fn test_add_missing_files_to_admin_data() {
    let t = TestEngine::new().await;
    t.put("ONE", "orphan.arc", b"orphan").await;
    t.put("TWO", "orphan.arc", b"orphan").await;
    t.scan_all().await;

    let report = t
        .engine
        .add_missing_files_to_admin_data(&["orphan.arc"])
        .await
        .unwrap();
    assert_eq!(report.replica, None);
    assert_eq!(report.outcome("orphan.arc"), Some(&RepairOutcome::Repaired));

    let record = t.record("orphan.arc").await.unwrap();
    assert_eq!(record.checksum, Checksum::compute(b"orphan"));
    assert_eq!(
        record.state_for(&id("ONE")),
        Some(ReplicaStoreState::UploadCompleted)
    );
    assert_eq!(
        record.state_for(&id("TWO")),
        Some(ReplicaStoreState::UploadCompleted)
    );
    assert_eq!(record.state_for(&id("CS")), None);

    // A second attempt never replaces the new record.
    let again = t
        .engine
        .add_missing_files_to_admin_data(&["orphan.arc"])
        .await
        .unwrap();
    assert_eq!(
        again.outcome("orphan.arc"),
        Some(&skipped(SkipReason::AlreadyInAdminData))
    );
}

#[tokio::test]
async fn test_add_skips_unusable_files() {
    let t = TestEngine::new().await;
    t.admit("known.arc", b"known").await;
    t.put("ONE", "split.arc", b"one version").await;
    t.put("TWO", "split.arc", b"another version").await;
    t.put("ONE", "listed-only.arc", b"listed").await;
    t.engine.find_missing_files(&id("ONE")).await.unwrap();
    t.engine.find_changed_files(&id("TWO")).await.unwrap();

    let report = t
        .engine
        .add_missing_files_to_admin_data(&[
            "bad/name",
            "known.arc",
            "nowhere.arc",
            "listed-only.arc",
        ])
        .await
        .unwrap();

    assert_eq!(
        report.outcome("bad/name"),
        Some(&skipped(SkipReason::InvalidFilename))
    );
    assert_eq!(
        report.outcome("known.arc"),
        Some(&skipped(SkipReason::AlreadyInAdminData))
    );
    assert_eq!(
        report.outcome("nowhere.arc"),
        Some(&skipped(SkipReason::NotOnAnyReplica))
    );
    assert_eq!(
        report.outcome("listed-only.arc"),
        Some(&skipped(SkipReason::NoChecksum))
    );
    assert_eq!(report.repaired_count(), 0);

    t.engine.find_changed_files(&id("ONE")).await.unwrap();
    let report = t
        .engine
        .add_missing_files_to_admin_data(&["split.arc"])
        .await
        .unwrap();
    assert_eq!(
        report.outcome("split.arc"),
        Some(&skipped(SkipReason::ConflictingChecksums))
    );
    assert!(t.record("split.arc").await.is_none());
}

#[tokio::test]
async fn test_changed_files_for_admin_data() {
    let t = TestEngine::new().await;
    // Admin data recorded the wrong content for a.arc.
    t.admit("a.arc", b"typo").await;
    t.admit("b.arc", b"beta").await;
    t.admit("c.arc", b"gamma").await;
    t.put("ONE", "a.arc", b"alpha").await;
    t.put("TWO", "a.arc", b"alpha").await;
    t.put("ONE", "b.arc", b"beta").await;
    t.put("ONE", "c.arc", b"gamma").await;
    t.put("TWO", "c.arc", b"gamma").await;
    t.corrupt("TWO", "c.arc", b"rot").await;
    t.scan_all().await;

    let changed = t.engine.get_changed_files_for_admin_data().await.unwrap();

    // c.arc has replicas disagreeing, so admin data keeps its value.
    assert_eq!(changed.len(), 1);
    assert_eq!(changed["a.arc"], Checksum::compute(b"alpha"));
}

#[tokio::test]
async fn test_change_state_for_admin_data() {
    let t = TestEngine::new().await;
    t.admit("a.arc", b"typo").await;
    t.put("ONE", "a.arc", b"alpha").await;
    t.put("TWO", "a.arc", b"alpha").await;
    for replica in ["ONE", "TWO", "CS"] {
        t.engine.find_missing_files(&id(replica)).await.unwrap();
    }
    t.engine.find_changed_files(&id("ONE")).await.unwrap();
    t.engine.find_changed_files(&id("TWO")).await.unwrap();

    let record = t
        .engine
        .change_state_for_admin_data("a.arc")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(record.checksum, Checksum::compute(b"alpha"));
    assert_eq!(
        record.state_for(&id("ONE")),
        Some(ReplicaStoreState::UploadCompleted)
    );
    assert_eq!(
        record.state_for(&id("TWO")),
        Some(ReplicaStoreState::UploadCompleted)
    );
    assert_eq!(
        record.state_for(&id("CS")),
        Some(ReplicaStoreState::UploadFailed)
    );
    assert_eq!(t.record("a.arc").await.unwrap(), record);
}

#[tokio::test]
async fn test_change_state_marks_corrupt_copies_failed() {
    let t = TestEngine::new().await;
    let admitted = t.admit("a.arc", b"alpha").await;
    t.put("ONE", "a.arc", b"alpha").await;
    t.put("TWO", "a.arc", b"alpha").await;
    t.corrupt("TWO", "a.arc", b"rot").await;
    t.scan_all().await;

    let record = t
        .engine
        .change_state_for_admin_data("a.arc")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(record.checksum, admitted.checksum);
    assert_eq!(
        record.state_for(&id("ONE")),
        Some(ReplicaStoreState::UploadCompleted)
    );
    assert_eq!(
        record.state_for(&id("TWO")),
        Some(ReplicaStoreState::UploadFailed)
    );
}

#[tokio::test]
async fn test_change_state_for_unknown_file() {
    let t = TestEngine::new().await;
    assert!(t.engine.change_state_for_admin_data("ghost.arc").await.unwrap().is_none());
    assert!(t.engine.change_state_for_admin_data("../x").await.unwrap().is_none());
}
