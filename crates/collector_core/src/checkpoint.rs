use serde::{Deserialize, Serialize};

use crate::JobId;

/// Ordered, duplicate-free set of job ids considered fully processed for a group.
///
/// Serialized as a plain JSON array of strings. Duplicates in stored data are
/// collapsed on load, keeping the first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<JobId>", into = "Vec<JobId>")]
pub struct CheckpointSet {
    ids: Vec<JobId>,
}

impl CheckpointSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `id` unless already present. Returns whether it was added.
    pub fn insert(&mut self, id: impl Into<JobId>) -> bool {
        let id = id.into();
        if self.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    /// Removes `id`. Returns whether it was present.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|existing| existing != id);
        self.ids.len() != before
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|existing| existing == id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[JobId] {
        &self.ids
    }
}

impl From<Vec<JobId>> for CheckpointSet {
    fn from(ids: Vec<JobId>) -> Self {
        ids.into_iter().collect()
    }
}

impl From<CheckpointSet> for Vec<JobId> {
    fn from(set: CheckpointSet) -> Self {
        set.ids
    }
}

impl<S: Into<JobId>> FromIterator<S> for CheckpointSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = CheckpointSet::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}
