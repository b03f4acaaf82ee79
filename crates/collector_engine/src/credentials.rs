use collector_core::Group;

/// Supplies the groups to poll for a realm.
pub trait CredentialSource: Send + Sync {
    fn groups(&self, realm: &str) -> Vec<Group>;
}

/// Fixed list of `(realm, group)` pairs.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    entries: Vec<(String, Group)>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(mut self, realm: impl Into<String>, group: Group) -> Self {
        self.entries.push((realm.into(), group));
        self
    }
}

impl CredentialSource for StaticCredentials {
    fn groups(&self, realm: &str) -> Vec<Group> {
        self.entries
            .iter()
            .filter(|(entry_realm, _)| entry_realm == realm)
            .map(|(_, group)| group.clone())
            .collect()
    }
}
