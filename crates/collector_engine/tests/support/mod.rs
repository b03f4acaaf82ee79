#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use collector_core::{AuthScheme, Group};
use collector_engine::{
    CheckpointStore, ClientSettings, EventSink, JobApi, JobResultStreamer, LookupLayout,
    ReqwestJobClient, ResultEvent, SyncOrchestrator,
};
use tempfile::TempDir;
use wiremock::MockServer;

pub const TOKEN: &str = "secret";

#[derive(Default)]
pub struct TestSink {
    events: Mutex<Vec<ResultEvent>>,
}

impl TestSink {
    pub fn take(&self) -> Vec<ResultEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl EventSink for TestSink {
    fn emit(&self, event: ResultEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn init_logging() {
    collector_logging::initialize_for_tests();
}

pub fn group_on(server: &MockServer, group_id: &str, name: &str) -> Group {
    Group::new(
        &format!("{}/api", server.uri()),
        group_id,
        name,
        TOKEN,
        AuthScheme::Token,
    )
    .unwrap()
}

pub fn reqwest_api() -> Arc<dyn JobApi> {
    Arc::new(ReqwestJobClient::new(ClientSettings::default()).unwrap())
}

/// Orchestrator wired to a temp directory and an in-memory sink.
pub struct Harness {
    pub dir: TempDir,
    pub sink: Arc<TestSink>,
    pub layout: LookupLayout,
    pub store: CheckpointStore,
    pub orchestrator: SyncOrchestrator,
}

impl Harness {
    pub fn new(api: Arc<dyn JobApi>) -> Self {
        init_logging();
        let dir = TempDir::new().unwrap();
        let sink = Arc::new(TestSink::default());
        let layout = LookupLayout::new(dir.path().join("home"), LookupLayout::DEFAULT_LOOKUP_DIR);
        let store = CheckpointStore::new(dir.path().join("checkpoints"));
        let orchestrator = SyncOrchestrator::new(
            api,
            sink.clone(),
            store.clone(),
            layout.clone(),
            JobResultStreamer::default(),
        );
        Self {
            dir,
            sink,
            layout,
            store,
            orchestrator,
        }
    }

    pub fn checkpoint_path(&self, group: &Group) -> PathBuf {
        self.store.path_for(group.name())
    }

    pub fn checkpoint_json(&self, group: &Group) -> Option<String> {
        fs::read_to_string(self.checkpoint_path(group)).ok()
    }

    pub fn seed_checkpoint(&self, group: &Group, json: &str) {
        let path = self.checkpoint_path(group);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, json).unwrap();
    }

    pub fn lookup_path(&self, group: &Group) -> PathBuf {
        self.layout.path_for(group.name())
    }

    pub fn lookup_content(&self, group: &Group) -> Option<String> {
        fs::read_to_string(self.lookup_path(group)).ok()
    }
}
