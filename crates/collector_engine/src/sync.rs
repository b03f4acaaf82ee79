use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use collector_core::{
    update, CheckpointKind, Effect, Group, Job, JobPhase, LookupResultKind, Msg, PassState,
    StreamResultKind,
};
use collector_logging::{collector_debug, collector_error, collector_info, collector_warn};
use tokio_util::sync::CancellationToken;

use crate::{
    CheckpointStore, EventSink, JobApi, JobResultStreamer, LookupLayout, LookupTable, PassOutcome,
    PassReport,
};

/// Runs passes for single groups: list, filter, update lookups, stream results, checkpoint.
///
/// Jobs of one group are handled strictly one after another. Separate groups
/// may run concurrently on the same orchestrator.
#[derive(Clone)]
pub struct SyncOrchestrator {
    api: Arc<dyn JobApi>,
    sink: Arc<dyn EventSink>,
    checkpoints: CheckpointStore,
    lookups: LookupTable,
    layout: LookupLayout,
    streamer: JobResultStreamer,
}

impl SyncOrchestrator {
    pub fn new(
        api: Arc<dyn JobApi>,
        sink: Arc<dyn EventSink>,
        checkpoints: CheckpointStore,
        layout: LookupLayout,
        streamer: JobResultStreamer,
    ) -> Self {
        Self {
            api,
            sink,
            checkpoints,
            lookups: LookupTable::new(),
            layout,
            streamer,
        }
    }

    /// One pass over `group`. Never fails: every problem is logged and reflected in the report.
    pub async fn run_pass(&self, group: &Group, cancel: &CancellationToken) -> PassReport {
        let started_at = Utc::now();
        let finish = |outcome: PassOutcome, state: &PassState| PassReport {
            group: group.name().to_string(),
            outcome,
            summary: state.summary(),
            jobs: state.jobs().to_vec(),
            started_at,
            finished_at: Utc::now(),
        };

        let jobs = match self.api.list_jobs(group).await {
            Ok(jobs) => jobs,
            Err(err) => {
                collector_error!(
                    "Failed to get jobs from group_id={} group_name={} error=\"{}\"",
                    group.group_id(),
                    group.name(),
                    err
                );
                return finish(PassOutcome::ListingFailed(err), &PassState::default());
            }
        };
        if jobs.is_empty() {
            collector_info!(
                "No jobs found in group_id={} group_name={}",
                group.group_id(),
                group.name()
            );
            return finish(PassOutcome::EmptyListing, &PassState::default());
        }

        let mut state = PassState::new(self.checkpoints.load(group.name()));
        for job in jobs {
            if cancel.is_cancelled() {
                collector_warn!(
                    "Pass for group_name={} cancelled before job={}",
                    group.name(),
                    job.id
                );
                return finish(PassOutcome::Cancelled, &state);
            }
            state = self.dispatch(group, state, Msg::JobListed(job)).await;
            if let Some(record) = state.jobs().last() {
                log_job_phase(group, &record.job_id, record.phase, record.lines);
            }
        }
        state = self.dispatch(group, state, Msg::ListingExhausted).await;

        let report = finish(PassOutcome::Completed, &state);
        collector_info!(
            "Finished pass for group_name={} listed={} downloaded={} failed={} lines={} rows={}",
            group.name(),
            report.summary.listed,
            report.summary.downloaded,
            report.summary.download_failed,
            report.summary.lines_emitted,
            report.summary.rows_written
        );
        report
    }

    /// Applies `msg`, runs the resulting effects in order and feeds their outcomes back.
    async fn dispatch(&self, group: &Group, state: PassState, msg: Msg) -> PassState {
        let mut state = state;
        let mut inbox = VecDeque::from([msg]);
        while let Some(msg) = inbox.pop_front() {
            let (next, effects) = update(state, msg);
            state = next;
            for effect in effects {
                if let Some(reply) = self.execute(group, effect).await {
                    inbox.push_back(reply);
                }
            }
        }
        state
    }

    async fn execute(&self, group: &Group, effect: Effect) -> Option<Msg> {
        match effect {
            Effect::UpdateLookup { job } => Some(self.update_lookup(group, &job)),
            Effect::StreamResults { job } => Some(self.stream_results(group, &job).await),
            Effect::SaveCheckpoint { ids, kind } => {
                match self.checkpoints.save(group.name(), &ids) {
                    Ok(path) => {
                        collector_debug!(
                            "Saved {} checkpoint for group_name={} jobs={} at {:?}",
                            checkpoint_label(kind),
                            group.name(),
                            ids.len(),
                            path
                        );
                        None
                    }
                    Err(err) => {
                        collector_error!(
                            "Failed to save {} checkpoint for group_name={} path={:?} error=\"{}\"",
                            checkpoint_label(kind),
                            group.name(),
                            self.checkpoints.path_for(group.name()),
                            err
                        );
                        Some(Msg::CheckpointSaveFailed)
                    }
                }
            }
        }
    }

    fn update_lookup(&self, group: &Group, job: &Job) -> Msg {
        let path = self.layout.path_for(group.name());
        let result = match self.lookups.append_rows(&path, group, job) {
            Ok(appended) => {
                collector_debug!(
                    "Appended {} lookup rows for job={} group_name={} to {:?}",
                    appended.rows_written,
                    job.id,
                    group.name(),
                    appended.path
                );
                LookupResultKind::Written {
                    rows: appended.rows_written,
                }
            }
            Err(err) => {
                collector_error!(
                    "Failed to update lookup={:?} for job={} group_name={} error=\"{}\"",
                    path,
                    job.id,
                    group.name(),
                    err
                );
                LookupResultKind::Failed
            }
        };
        Msg::LookupFinished {
            job_id: job.id.clone(),
            result,
        }
    }

    async fn stream_results(&self, group: &Group, job: &Job) -> Msg {
        let result = match self
            .streamer
            .stream(self.api.as_ref(), group, job, self.sink.as_ref())
            .await
        {
            Ok(report) => match report.interrupted {
                None => StreamResultKind::Completed {
                    lines: report.lines,
                },
                Some(err) => {
                    collector_warn!(
                        "Stream for job={} group_name={} ended early after {} lines error=\"{}\"",
                        job.id,
                        group.name(),
                        report.lines,
                        err
                    );
                    StreamResultKind::Interrupted {
                        lines: report.lines,
                    }
                }
            },
            Err(err) => {
                collector_error!(
                    "Failed to get job={} group_id={} group_name={} error=\"{}\"",
                    job.id,
                    group.group_id(),
                    group.name(),
                    err
                );
                StreamResultKind::Failed
            }
        };
        Msg::StreamFinished {
            job_id: job.id.clone(),
            result,
        }
    }
}

fn log_job_phase(group: &Group, job_id: &str, phase: JobPhase, lines: u64) {
    match phase {
        JobPhase::SkippedNotComplete => collector_info!(
            "Skipping job={} in group_id={} group_name={} because it hasn't finished",
            job_id,
            group.group_id(),
            group.name()
        ),
        JobPhase::SkippedAlreadyDone => collector_info!(
            "Skipping job={} in group_id={} group_name={} since it was downloaded already",
            job_id,
            group.group_id(),
            group.name()
        ),
        JobPhase::Done | JobPhase::PartialLookupFailureDone => collector_info!(
            "Downloaded job={} group_name={} lines={}",
            job_id,
            group.name(),
            lines
        ),
        JobPhase::DownloadFailed => collector_info!(
            "Job={} group_name={} stays pending for the next pass",
            job_id,
            group.name()
        ),
        JobPhase::Processing => {}
    }
}

fn checkpoint_label(kind: CheckpointKind) -> &'static str {
    match kind {
        CheckpointKind::Progress => "progress",
        CheckpointKind::Prune => "final",
    }
}
