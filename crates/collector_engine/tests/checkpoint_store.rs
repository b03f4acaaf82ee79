use std::fs;

use collector_core::CheckpointSet;
use collector_engine::CheckpointStore;
use tempfile::TempDir;

fn ids(values: &[&str]) -> CheckpointSet {
    values.iter().copied().collect()
}

#[test]
fn missing_checkpoint_loads_empty() {
    collector_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp.path().join("never-created"));
    assert!(store.load("acme").is_empty());
}

#[test]
fn corrupt_checkpoint_loads_empty() {
    collector_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp.path());
    fs::write(store.path_for("acme"), "{\"not\": \"an array\"").unwrap();
    assert!(store.load("acme").is_empty());
}

#[test]
fn save_replaces_previous_content() {
    let temp = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp.path().join("cp"));

    let path = store.save("acme", &ids(&["1", "2", "3"])).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), r#"["1","2","3"]"#);

    store.save("acme", &ids(&["2"])).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), r#"["2"]"#);
    assert_eq!(store.load("acme"), ids(&["2"]));
}

#[test]
fn groups_never_share_a_file() {
    let temp = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp.path());

    store.save("acme", &ids(&["a"])).unwrap();
    store.save("globex", &ids(&["g"])).unwrap();
    store.save("acme/east", &ids(&["e"])).unwrap();

    assert_eq!(store.load("acme"), ids(&["a"]));
    assert_eq!(store.load("globex"), ids(&["g"]));
    assert_eq!(store.load("acme/east"), ids(&["e"]));
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 3);
}

#[test]
fn save_fails_when_directory_is_a_file() {
    let temp = TempDir::new().unwrap();
    let not_a_dir = temp.path().join("file");
    fs::write(&not_a_dir, "x").unwrap();

    let store = CheckpointStore::new(&not_a_dir);
    assert!(store.save("acme", &ids(&["1"])).is_err());
}
