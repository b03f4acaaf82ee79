mod support;

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use collector_core::{Group, Job, JobPhase, JobStatus};
use collector_engine::{ByteStream, FailureKind, FetchError, JobApi, PassOutcome};
use futures_util::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use support::{group_on, reqwest_api, Harness};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SCAN_A_INPUT: &str = r#"{"queries":[{"any_ip_addr":"1.2.3.4,5.6.7.8/30"}]}"#;

async fn mount_listing(server: &MockServer, jobs: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/jobs"))
        .and(query_param("group_id", "g-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": jobs })))
        .mount(server)
        .await;
}

async fn mount_result(server: &MockServer, job_id: &str, body: &str, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/api/jobs/{job_id}")))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn completed_job_is_streamed_looked_up_and_checkpointed() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        json!([{ "id": "42", "status": "Completed", "name": "scanA", "input": SCAN_A_INPUT }]),
    )
    .await;
    mount_result(&server, "42", "r1\nr2\n", 1).await;

    let harness = Harness::new(reqwest_api());
    let group = group_on(&server, "g-1", "acme");
    let report = harness
        .orchestrator
        .run_pass(&group, &CancellationToken::new())
        .await;

    assert_eq!(report.outcome, PassOutcome::Completed);
    assert_eq!(report.summary.downloaded, 1);
    assert_eq!(report.summary.rows_written, 2);
    assert_eq!(report.summary.lines_emitted, 2);

    assert_eq!(
        harness.lookup_content(&group).unwrap(),
        "\"1.2.3.4/32\",\"scanA\",\"acme\",\"CIDR\",\"\",\"\"\n\
         \"5.6.7.8/30\",\"scanA\",\"acme\",\"CIDR\",\"\",\"\"\n"
    );

    let events = harness.sink.take();
    let data: Vec<_> = events.iter().map(|e| e.data.as_str()).collect();
    assert_eq!(data, vec!["r1", "r2"]);
    let source = format!("{}/api/jobs/42", server.address());
    for event in &events {
        assert_eq!(event.host, "scanA");
        assert_eq!(event.index, "acme");
        assert_eq!(event.source, source);
    }

    assert_eq!(harness.checkpoint_json(&group).as_deref(), Some(r#"["42"]"#));
}

#[tokio::test]
async fn second_pass_without_new_jobs_changes_nothing() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        json!([{ "id": "42", "status": "Completed", "name": "scanA", "input": SCAN_A_INPUT }]),
    )
    .await;
    mount_result(&server, "42", "r1\n", 1).await;

    let harness = Harness::new(reqwest_api());
    let group = group_on(&server, "g-1", "acme");
    let cancel = CancellationToken::new();

    harness.orchestrator.run_pass(&group, &cancel).await;
    let lookup_after_first = harness.lookup_content(&group);
    let checkpoint_after_first = harness.checkpoint_json(&group);
    harness.sink.take();

    let report = harness.orchestrator.run_pass(&group, &cancel).await;

    assert_eq!(report.summary.skipped_already_done, 1);
    assert_eq!(report.summary.downloaded, 0);
    assert!(harness.sink.take().is_empty());
    assert_eq!(harness.lookup_content(&group), lookup_after_first);
    assert_eq!(harness.checkpoint_json(&group), checkpoint_after_first);
}

#[tokio::test]
async fn empty_listing_touches_nothing() {
    let server = MockServer::start().await;
    mount_listing(&server, json!([])).await;

    let harness = Harness::new(reqwest_api());
    let group = group_on(&server, "g-1", "acme");
    let report = harness
        .orchestrator
        .run_pass(&group, &CancellationToken::new())
        .await;

    assert_eq!(report.outcome, PassOutcome::EmptyListing);
    assert!(harness.checkpoint_json(&group).is_none());
    assert!(harness.lookup_content(&group).is_none());
    assert!(harness.sink.take().is_empty());
}

#[tokio::test]
async fn listing_failure_aborts_without_touching_checkpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs"))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(reqwest_api());
    let group = group_on(&server, "g-1", "acme");
    harness.seed_checkpoint(&group, r#"["old"]"#);

    let report = harness
        .orchestrator
        .run_pass(&group, &CancellationToken::new())
        .await;

    match report.outcome {
        PassOutcome::ListingFailed(err) => assert_eq!(err.kind, FailureKind::HttpStatus(500)),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(harness.checkpoint_json(&group).as_deref(), Some(r#"["old"]"#));
    assert!(harness.sink.take().is_empty());
}

#[tokio::test]
async fn failed_download_is_retried_on_next_pass() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        json!([
            { "id": "1", "status": "Completed", "name": "one", "input": "{\"queries\":[]}" },
            { "id": "2", "status": "Completed", "name": "two", "input": "{\"queries\":[]}" }
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/1"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_result(&server, "1", "late\n", 1).await;
    mount_result(&server, "2", "ok\n", 1).await;

    let harness = Harness::new(reqwest_api());
    let group = group_on(&server, "g-1", "acme");
    let cancel = CancellationToken::new();

    let first = harness.orchestrator.run_pass(&group, &cancel).await;
    assert_eq!(first.summary.download_failed, 1);
    assert_eq!(first.jobs[0].phase, JobPhase::DownloadFailed);
    assert_eq!(harness.checkpoint_json(&group).as_deref(), Some(r#"["2"]"#));

    let second = harness.orchestrator.run_pass(&group, &cancel).await;
    assert_eq!(second.jobs[0].phase, JobPhase::Done);
    assert_eq!(second.jobs[1].phase, JobPhase::SkippedAlreadyDone);
    assert_eq!(harness.checkpoint_json(&group).as_deref(), Some(r#"["1","2"]"#));

    let data: Vec<_> = harness.sink.take().into_iter().map(|e| e.data).collect();
    assert_eq!(data, vec!["ok", "late"]);
}

#[tokio::test]
async fn stale_and_regressed_jobs_are_pruned() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        json!([
            { "id": "7", "status": "Completed", "name": "seven" },
            { "id": "8", "status": "Running", "name": "eight" },
            { "id": "9", "status": "Failed", "name": "nine" }
        ]),
    )
    .await;
    mount_result(&server, "7", "", 0).await;
    mount_result(&server, "9", "", 0).await;

    let harness = Harness::new(reqwest_api());
    let group = group_on(&server, "g-1", "acme");
    harness.seed_checkpoint(&group, r#"["gone","7","9"]"#);

    let report = harness
        .orchestrator
        .run_pass(&group, &CancellationToken::new())
        .await;

    assert_eq!(report.summary.skipped_already_done, 1);
    assert_eq!(report.summary.skipped_not_complete, 2);
    assert_eq!(harness.checkpoint_json(&group).as_deref(), Some(r#"["7"]"#));
}

#[tokio::test]
async fn broken_input_still_streams_results() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        json!([{ "id": "5", "status": "Completed", "name": "scanB", "input": "{not json" }]),
    )
    .await;
    mount_result(&server, "5", "line\n", 1).await;

    let harness = Harness::new(reqwest_api());
    let group = group_on(&server, "g-1", "acme");
    let report = harness
        .orchestrator
        .run_pass(&group, &CancellationToken::new())
        .await;

    assert_eq!(report.summary.lookup_failures, 1);
    assert_eq!(report.jobs[0].phase, JobPhase::PartialLookupFailureDone);
    assert_eq!(harness.sink.take().len(), 1);
    assert!(harness.lookup_content(&group).is_none());
    assert_eq!(harness.checkpoint_json(&group).as_deref(), Some(r#"["5"]"#));
}

#[tokio::test]
async fn cancelled_pass_stops_before_next_job() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        json!([{ "id": "1", "status": "Completed", "name": "one" }]),
    )
    .await;
    mount_result(&server, "1", "x\n", 0).await;

    let harness = Harness::new(reqwest_api());
    let group = group_on(&server, "g-1", "acme");
    harness.seed_checkpoint(&group, r#"["old"]"#);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = harness.orchestrator.run_pass(&group, &cancel).await;

    assert_eq!(report.outcome, PassOutcome::Cancelled);
    assert_eq!(harness.checkpoint_json(&group).as_deref(), Some(r#"["old"]"#));
}

/// Serves a fixed listing and a scripted result stream that fails midway.
struct InterruptingApi {
    jobs: Vec<Job>,
    opened: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl JobApi for InterruptingApi {
    async fn list_jobs(&self, _group: &Group) -> Result<Vec<Job>, FetchError> {
        Ok(self.jobs.clone())
    }

    async fn open_results(&self, _group: &Group, job_id: &str) -> Result<ByteStream, FetchError> {
        self.opened.lock().unwrap().push(job_id.to_string());
        let chunks = vec![
            Ok(Bytes::from_static(b"r1\nr2\npart")),
            Err(FetchError {
                kind: FailureKind::Network,
                message: "connection reset".into(),
            }),
        ];
        Ok(futures_util::stream::iter(chunks).boxed())
    }
}

#[tokio::test]
async fn interrupted_stream_counts_as_downloaded() {
    let api = Arc::new(InterruptingApi {
        jobs: vec![Job {
            id: "11".into(),
            status: JobStatus::Completed,
            name: "scanC".into(),
            input: None,
        }],
        opened: Mutex::new(Vec::new()),
    });
    let harness = Harness::new(api.clone());
    let group = Group::new(
        "https://acme.example.com/api",
        "g-1",
        "acme",
        "t",
        Default::default(),
    )
    .unwrap();

    let report = harness
        .orchestrator
        .run_pass(&group, &CancellationToken::new())
        .await;

    assert_eq!(report.summary.interrupted_streams, 1);
    assert_eq!(report.summary.lines_emitted, 2);
    let data: Vec<_> = harness.sink.take().into_iter().map(|e| e.data).collect();
    assert_eq!(data, vec!["r1", "r2"]);
    assert_eq!(harness.checkpoint_json(&group).as_deref(), Some(r#"["11"]"#));
    assert_eq!(api.opened.lock().unwrap().as_slice(), ["11"]);
}

/// Streams one line per job and cancels the pass as soon as a job is opened.
struct CancellingApi {
    jobs: Vec<Job>,
    opened: Mutex<Vec<String>>,
    cancel: CancellationToken,
}

#[async_trait::async_trait]
impl JobApi for CancellingApi {
    async fn list_jobs(&self, _group: &Group) -> Result<Vec<Job>, FetchError> {
        Ok(self.jobs.clone())
    }

    async fn open_results(&self, _group: &Group, job_id: &str) -> Result<ByteStream, FetchError> {
        self.opened.lock().unwrap().push(job_id.to_string());
        self.cancel.cancel();
        let chunks = vec![Ok(Bytes::from(format!("from-{job_id}\n")))];
        Ok(futures_util::stream::iter(chunks).boxed())
    }
}

fn completed(id: &str) -> Job {
    Job {
        id: id.into(),
        status: JobStatus::Completed,
        name: format!("scan-{id}"),
        input: None,
    }
}

#[tokio::test]
async fn cancellation_mid_pass_keeps_jobs_streamed_so_far() {
    let cancel = CancellationToken::new();
    let api = Arc::new(CancellingApi {
        jobs: vec![completed("1"), completed("2")],
        opened: Mutex::new(Vec::new()),
        cancel: cancel.clone(),
    });
    let harness = Harness::new(api.clone());
    let group = Group::new(
        "https://acme.example.com/api",
        "g-1",
        "acme",
        "t",
        Default::default(),
    )
    .unwrap();
    harness.seed_checkpoint(&group, r#"["old"]"#);

    let report = harness.orchestrator.run_pass(&group, &cancel).await;

    assert_eq!(report.outcome, PassOutcome::Cancelled);
    assert_eq!(api.opened.lock().unwrap().as_slice(), ["1"]);
    let data: Vec<_> = harness.sink.take().into_iter().map(|e| e.data).collect();
    assert_eq!(data, vec!["from-1"]);
    assert_eq!(harness.checkpoint_json(&group).as_deref(), Some(r#"["old","1"]"#));
}

#[tokio::test]
async fn unwritable_checkpoint_dir_still_emits_and_counts_every_failed_save() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        json!([{ "id": "3", "status": "Completed", "name": "scanD" }]),
    )
    .await;
    mount_result(&server, "3", "r1\n", 1).await;

    let harness = Harness::new(reqwest_api());
    std::fs::write(harness.dir.path().join("checkpoints"), "not a directory").unwrap();
    let group = group_on(&server, "g-1", "acme");

    let report = harness
        .orchestrator
        .run_pass(&group, &CancellationToken::new())
        .await;

    assert_eq!(report.outcome, PassOutcome::Completed);
    assert_eq!(report.summary.downloaded, 1);
    assert_eq!(report.summary.checkpoint_save_failures, 2);
    assert_eq!(harness.sink.take().len(), 1);
}
