use recipe_scribe::domain::ArtifactId;
use recipe_scribe::infrastructure::storage::WorkingStorage;
use tempfile::TempDir;

#[test]
fn given_missing_directory_when_creating_storage_then_creates_it() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("nested").join("downloads");

    let storage = WorkingStorage::new(root.clone()).unwrap();

    assert!(root.is_dir());
    assert_eq!(storage.root(), root.as_path());
}

#[test]
fn given_artifact_id_when_building_paths_then_uses_id_as_stem() {
    let dir = TempDir::new().unwrap();
    let storage = WorkingStorage::new(dir.path().to_path_buf()).unwrap();
    let id = ArtifactId::new();

    assert_eq!(
        storage.artifact_path(&id, "mp3"),
        dir.path().join(format!("{}.mp3", id))
    );
    assert_eq!(
        storage.output_template(&id),
        dir.path().join(format!("{}.%(ext)s", id))
    );
}

#[tokio::test]
async fn given_files_of_two_requests_when_purging_one_then_other_survives() {
    let dir = TempDir::new().unwrap();
    let storage = WorkingStorage::new(dir.path().to_path_buf()).unwrap();
    let mine = ArtifactId::new();
    let theirs = ArtifactId::new();
    std::fs::write(storage.artifact_path(&mine, "mp3"), b"a").unwrap();
    std::fs::write(storage.artifact_path(&mine, "webm.part"), b"b").unwrap();
    std::fs::write(storage.artifact_path(&theirs, "mp3"), b"c").unwrap();

    let removed = storage.purge(&mine).await.unwrap();

    assert_eq!(removed, 2);
    assert_eq!(storage.file_count().await.unwrap(), 1);
    assert!(storage.artifact_path(&theirs, "mp3").exists());
}

#[tokio::test]
async fn given_nothing_to_purge_when_purging_then_removes_nothing() {
    let dir = TempDir::new().unwrap();
    let storage = WorkingStorage::new(dir.path().to_path_buf()).unwrap();

    assert_eq!(storage.purge(&ArtifactId::new()).await.unwrap(), 0);
    assert_eq!(storage.file_count().await.unwrap(), 0);
}

#[test]
fn given_leftovers_of_abandoned_request_when_purging_blocking_then_removes_only_them() {
    let dir = TempDir::new().unwrap();
    let storage = WorkingStorage::new(dir.path().to_path_buf()).unwrap();
    let abandoned = ArtifactId::new();
    let running = ArtifactId::new();
    std::fs::write(storage.artifact_path(&abandoned, "webm.part"), b"a").unwrap();
    std::fs::write(storage.artifact_path(&running, "mp3"), b"b").unwrap();

    let removed = storage.purge_blocking(&abandoned).unwrap();

    assert_eq!(removed, 1);
    assert!(storage.artifact_path(&running, "mp3").exists());
}
