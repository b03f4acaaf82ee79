use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use collector_core::CheckpointSet;
use collector_logging::{collector_debug, collector_warn};

use crate::filename::checkpoint_filename;
use crate::persist::{AtomicFileWriter, PersistError};

/// One JSON array of job ids per group, stored under a single directory.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    writer: AtomicFileWriter,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir.into()),
        }
    }

    pub fn dir(&self) -> &Path {
        self.writer.dir()
    }

    pub fn path_for(&self, group_key: &str) -> PathBuf {
        self.dir().join(checkpoint_filename(group_key))
    }

    /// Loads the stored set. Missing, unreadable or corrupt files yield an empty set:
    /// re-downloading is preferred over silently skipping work.
    pub fn load(&self, group_key: &str) -> CheckpointSet {
        let path = self.path_for(group_key);
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                collector_debug!("No checkpoint for group_name={} at {:?}", group_key, path);
                return CheckpointSet::new();
            }
            Err(err) => {
                collector_warn!(
                    "Failed to read checkpoint for group_name={} from {:?}: {}",
                    group_key,
                    path,
                    err
                );
                return CheckpointSet::new();
            }
        };

        match serde_json::from_str::<CheckpointSet>(&content) {
            Ok(set) => set,
            Err(err) => {
                collector_warn!(
                    "Ignoring corrupt checkpoint for group_name={} at {:?}: {}",
                    group_key,
                    path,
                    err
                );
                CheckpointSet::new()
            }
        }
    }

    /// Replaces the stored set for `group_key` with `set`.
    pub fn save(&self, group_key: &str, set: &CheckpointSet) -> Result<PathBuf, PersistError> {
        let content = serde_json::to_vec(set)?;
        self.writer.write(&checkpoint_filename(group_key), &content)
    }
}
