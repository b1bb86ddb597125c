//! Integration tests for reconciling the database with the archive tree.

mod common;

use common::{five_photos, TestEnv};
use photo_archiver::core::archive::ArchiveOrchestrator;
use photo_archiver::core::consistency::ConsistencyScanner;
use photo_archiver::core::repository::ContentRepository;
use std::collections::HashSet;
use std::fs;

#[test]
fn deleting_one_archived_file_removes_exactly_its_row() {
    let env = TestEnv::new();
    five_photos(&env);
    let repository = env.repository();
    ArchiveOrchestrator::new(&repository)
        .run(env.source.path())
        .unwrap();

    let before: HashSet<i64> = repository
        .iter_all_photos()
        .map(|e| e.unwrap().id)
        .collect();
    let victim = env.photos_dir().join("2003/03_March/594-9436_IMG.JPG");
    let victim_id = repository
        .iter_all_photos()
        .map(|e| e.unwrap())
        .find(|e| e.archive_path == victim)
        .unwrap()
        .id;
    fs::remove_file(&victim).unwrap();

    let report = ConsistencyScanner::new(&repository).scan_missing().unwrap();

    assert_eq!(report.checked, 5);
    assert_eq!(report.removed.len(), 1);
    assert_eq!(report.removed[0].id, victim_id);

    let after: HashSet<i64> = repository
        .iter_all_photos()
        .map(|e| e.unwrap().id)
        .collect();
    let expected: HashSet<i64> = before.into_iter().filter(|id| *id != victim_id).collect();
    assert_eq!(after, expected);
}

#[test]
fn repeated_scan_changes_nothing() {
    let env = TestEnv::new();
    five_photos(&env);
    let repository = env.repository();
    ArchiveOrchestrator::new(&repository)
        .run(env.source.path())
        .unwrap();
    fs::remove_file(env.photos_dir().join("2012/08_August/IMG_1427.JPG")).unwrap();

    let scanner = ConsistencyScanner::new(&repository);
    let first = scanner.scan_missing().unwrap();
    let second = scanner.scan_missing().unwrap();

    assert_eq!(first.removed.len(), 1);
    assert_eq!(second.checked, 4);
    assert!(second.removed.is_empty());
}

#[test]
fn pruned_content_is_archived_again_as_new() {
    let env = TestEnv::new();
    five_photos(&env);
    let repository = env.repository();
    ArchiveOrchestrator::new(&repository)
        .run(env.source.path())
        .unwrap();
    fs::remove_file(env.photos_dir().join("2012/08_August/IMG_1427.JPG")).unwrap();
    ConsistencyScanner::new(&repository).scan_missing().unwrap();

    let report = ArchiveOrchestrator::new(&repository)
        .run(env.source.path())
        .unwrap();

    assert_eq!(report.archived, 1);
    assert_eq!(repository.count().unwrap(), 5);
}

#[test]
fn scan_survives_reopening_the_database() {
    let env = TestEnv::new();
    five_photos(&env);
    {
        let repository = env.repository();
        ArchiveOrchestrator::new(&repository)
            .run(env.source.path())
            .unwrap();
        repository.close().unwrap();
    }
    fs::remove_dir_all(env.photos_dir().join("2012")).unwrap();

    let repository = ContentRepository::open(env.media.path()).unwrap();
    let report = ConsistencyScanner::new(&repository).scan_missing().unwrap();

    assert_eq!(report.removed.len(), 2);
    assert_eq!(repository.count().unwrap(), 3);
}
